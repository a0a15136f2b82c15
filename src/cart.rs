//! Client-owned shopping cart.
//!
//! The server never stores a cart: each browser session owns its own and
//! submits a denormalized snapshot at checkout. This model backs that client
//! state and produces the snapshot the order endpoint expects.

use uuid::Uuid;

use crate::models::{OrderItem, Product};

#[derive(Debug, Clone)]
pub struct CartLine {
    pub product_id: Uuid,
    pub name: String,
    pub price: i64,
    pub quantity: i32,
}

#[derive(Debug, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Add a product, merging into an existing line by product id.
    pub fn add_item(&mut self, product: &Product, quantity: i32) {
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            line.quantity += quantity;
        } else {
            self.lines.push(CartLine {
                product_id: product.id,
                name: product.name.clone(),
                price: product.price,
                quantity,
            });
        }
    }

    /// Set the quantity of a line. Quantities below 1 are ignored; callers
    /// remove the line instead.
    pub fn update_quantity(&mut self, product_id: Uuid, quantity: i32) {
        if quantity < 1 {
            return;
        }
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = quantity;
        }
    }

    pub fn remove_item(&mut self, product_id: Uuid) {
        self.lines.retain(|l| l.product_id != product_id);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Recomputed on every read; lines hold the price seen when added.
    pub fn total(&self) -> i64 {
        self.lines
            .iter()
            .map(|l| l.price * i64::from(l.quantity))
            .sum()
    }

    /// Freeze the cart into the order-item snapshot sent at checkout.
    pub fn snapshot(&self) -> Vec<OrderItem> {
        self.lines
            .iter()
            .map(|l| OrderItem {
                product_id: l.product_id,
                name: l.name.clone(),
                price: l.price,
                quantity: l.quantity,
            })
            .collect()
    }
}
