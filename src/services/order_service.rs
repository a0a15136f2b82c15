use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::{
        orders::{CheckoutRequest, OrderList, OrderListParams},
        users::SaveAddressRequest,
    },
    entity::{
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress},
    response::{ApiResponse, Meta},
    services::user_service,
    state::AppState,
};

/// Orders at or above this subtotal ship free; below it a flat fee applies.
pub const FREE_SHIPPING_THRESHOLD: i64 = 500;
pub const SHIPPING_FEE: i64 = 50;

pub fn shipping_fee(subtotal: i64) -> i64 {
    if subtotal >= FREE_SHIPPING_THRESHOLD {
        0
    } else {
        SHIPPING_FEE
    }
}

/// Validate a checkout payload, collecting every problem before rejecting.
/// Returns the expected order total (item snapshot subtotal + shipping fee).
fn validate_checkout(payload: &CheckoutRequest) -> Result<i64, Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    if payload.items.is_empty() {
        errors.push("invalid or missing items".into());
    }
    if payload.items.iter().any(|item| item.quantity < 1) {
        errors.push("item quantity must be at least 1".into());
    }
    if payload.total_amount < 0 {
        errors.push("invalid total_amount".into());
    }

    let addr = &payload.shipping_address;
    let required = [
        &addr.full_name,
        &addr.email,
        &addr.phone,
        &addr.address,
        &addr.city,
        &addr.state,
        &addr.pincode,
    ];
    // One aggregate error for the whole address, not one per field.
    if required.iter().any(|field| field.trim().is_empty()) {
        errors.push("incomplete shipping address".into());
    } else {
        if !all_digits(&addr.phone, 10) {
            errors.push("phone must be exactly 10 digits".into());
        }
        if !all_digits(&addr.pincode, 6) {
            errors.push("pincode must be exactly 6 digits".into());
        }
    }

    if payload.payment_method == PaymentMethod::Card {
        let card_ok = payload.card.as_ref().is_some_and(|card| {
            !card.number.trim().is_empty()
                && !card.name.trim().is_empty()
                && !card.expiry.trim().is_empty()
                && !card.cvv.trim().is_empty()
        });
        if !card_ok {
            errors.push("missing card details".into());
        }
    }

    let subtotal: i64 = payload
        .items
        .iter()
        .map(|item| item.price * i64::from(item.quantity))
        .sum();
    let expected = subtotal + shipping_fee(subtotal);

    // The snapshot prices are trusted as submitted; only the arithmetic over
    // them is verified, never the live catalog.
    if !payload.items.is_empty() && payload.total_amount != expected {
        errors.push("total_amount does not match order items".into());
    }

    if errors.is_empty() {
        Ok(expected)
    } else {
        Err(errors)
    }
}

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<Order>> {
    let total_amount = validate_checkout(&payload).map_err(AppError::Validation)?;

    let payment_status = match payload.payment_method {
        PaymentMethod::Card => PaymentStatus::Completed,
        PaymentMethod::Cod => PaymentStatus::Pending,
    };

    let addr = payload.shipping_address.clone();
    let txn = state.orm.begin().await?;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        total_amount: Set(total_amount),
        payment_method: Set(payload.payment_method.as_str().to_string()),
        payment_status: Set(payment_status.as_str().to_string()),
        order_status: Set(OrderStatus::Processing.as_str().to_string()),
        ship_full_name: Set(addr.full_name.clone()),
        ship_email: Set(addr.email.clone()),
        ship_phone: Set(addr.phone.clone()),
        ship_address: Set(addr.address.clone()),
        ship_city: Set(addr.city.clone()),
        ship_state: Set(addr.state.clone()),
        ship_pincode: Set(addr.pincode.clone()),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items: Vec<OrderItemModel> = Vec::with_capacity(payload.items.len());
    for item in &payload.items {
        let inserted = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(item.product_id),
            name: Set(item.name.clone()),
            price: Set(item.price),
            quantity: Set(item.quantity),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        items.push(inserted);
    }

    txn.commit().await?;

    // Best effort: remember the address on the profile for the next checkout.
    // Failure here must never unwind a placed order.
    let save = SaveAddressRequest {
        full_name: addr.full_name,
        phone: addr.phone,
        address: addr.address,
        city: addr.city,
        state: addr.state,
        pincode: addr.pincode,
    };
    if let Err(err) = user_service::save_address(state, user.user_id, save).await {
        tracing::warn!(error = %err, user_id = %user.user_id, "saving shipping address failed");
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_create",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "total_amount": total_amount })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order placed",
        order_from_entity(order, items)?,
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    params: OrderListParams,
) -> AppResult<ApiResponse<OrderList>> {
    // Callers see their own orders; only admins may ask for another user's.
    let target = match params.user_id {
        Some(user_id) if user_id != user.user_id => {
            if !user.is_admin {
                return Err(AppError::Forbidden);
            }
            user_id
        }
        _ => user.user_id,
    };

    let orders = Orders::find()
        .filter(OrderCol::UserId.eq(target))
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let items = load_items(state, &orders).await?;
    let total = orders.len() as i64;
    let orders = assemble(orders, items)?;

    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn get_order(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<Order>> {
    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        // Foreign orders 404 rather than 403: no existence leak across users.
        Some(o) if o.user_id == user.user_id || user.is_admin => o,
        _ => return Err(AppError::NotFound),
    };

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "Ok",
        order_from_entity(order, items)?,
        Some(Meta::empty()),
    ))
}

pub(crate) async fn load_items(
    state: &AppState,
    orders: &[OrderModel],
) -> AppResult<HashMap<Uuid, Vec<OrderItemModel>>> {
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut grouped: HashMap<Uuid, Vec<OrderItemModel>> = HashMap::new();
    if ids.is_empty() {
        return Ok(grouped);
    }
    let rows = OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(ids))
        .all(&state.orm)
        .await?;
    for row in rows {
        grouped.entry(row.order_id).or_default().push(row);
    }
    Ok(grouped)
}

pub(crate) fn assemble(
    orders: Vec<OrderModel>,
    mut items: HashMap<Uuid, Vec<OrderItemModel>>,
) -> AppResult<Vec<Order>> {
    orders
        .into_iter()
        .map(|order| {
            let rows = items.remove(&order.id).unwrap_or_default();
            order_from_entity(order, rows)
        })
        .collect()
}

pub(crate) fn order_from_entity(
    model: OrderModel,
    items: Vec<OrderItemModel>,
) -> AppResult<Order> {
    let payment_method = match model.payment_method.as_str() {
        "cod" => PaymentMethod::Cod,
        "card" => PaymentMethod::Card,
        other => {
            return Err(AppError::Internal(anyhow::anyhow!(
                "unknown payment method {other:?} on order {}",
                model.id
            )));
        }
    };
    let payment_status = PaymentStatus::parse(&model.payment_status).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "unknown payment status {:?} on order {}",
            model.payment_status,
            model.id
        ))
    })?;
    let order_status = OrderStatus::parse(&model.order_status).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "unknown order status {:?} on order {}",
            model.order_status,
            model.id
        ))
    })?;

    Ok(Order {
        id: model.id,
        user_id: model.user_id,
        items: items
            .into_iter()
            .map(|row| OrderItem {
                product_id: row.product_id,
                name: row.name,
                price: row.price,
                quantity: row.quantity,
            })
            .collect(),
        total_amount: model.total_amount,
        shipping_address: ShippingAddress {
            full_name: model.ship_full_name,
            email: model.ship_email,
            phone: model.ship_phone,
            address: model.ship_address,
            city: model.ship_city,
            state: model.ship_state,
            pincode: model.ship_pincode,
        },
        payment_method,
        payment_status,
        order_status,
        created_at: model.created_at.with_timezone(&Utc),
    })
}

fn all_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::orders::CardDetails;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Asha Rao".into(),
            email: "asha@example.com".into(),
            phone: "9876543210".into(),
            address: "12 MG Road".into(),
            city: "Pune".into(),
            state: "Maharashtra".into(),
            pincode: "411001".into(),
        }
    }

    fn item(price: i64, quantity: i32) -> OrderItem {
        OrderItem {
            product_id: Uuid::new_v4(),
            name: "Training Shoes".into(),
            price,
            quantity,
        }
    }

    fn request(items: Vec<OrderItem>, total: i64) -> CheckoutRequest {
        CheckoutRequest {
            items,
            shipping_address: address(),
            payment_method: PaymentMethod::Cod,
            total_amount: total,
            card: None,
        }
    }

    #[test]
    fn subtotal_below_threshold_pays_shipping() {
        // 450 subtotal + 50 fee
        let payload = request(vec![item(450, 1)], 500);
        assert_eq!(validate_checkout(&payload), Ok(500));
    }

    #[test]
    fn subtotal_at_threshold_ships_free() {
        let payload = request(vec![item(300, 2)], 600);
        assert_eq!(validate_checkout(&payload), Ok(600));
        let exactly = request(vec![item(500, 1)], 500);
        assert_eq!(validate_checkout(&exactly), Ok(500));
    }

    #[test]
    fn mismatched_total_is_rejected() {
        let payload = request(vec![item(450, 1)], 450);
        let errors = validate_checkout(&payload).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("total_amount")));
    }

    #[test]
    fn empty_items_rejected() {
        let payload = request(vec![], 0);
        let errors = validate_checkout(&payload).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("items")));
    }

    #[test]
    fn five_digit_pincode_rejected() {
        let mut payload = request(vec![item(600, 1)], 600);
        payload.shipping_address.pincode = "12345".into();
        let errors = validate_checkout(&payload).unwrap_err();
        assert_eq!(errors, vec!["pincode must be exactly 6 digits".to_string()]);
    }

    #[test]
    fn short_phone_rejected() {
        let mut payload = request(vec![item(600, 1)], 600);
        payload.shipping_address.phone = "12345".into();
        assert!(validate_checkout(&payload).is_err());
        payload.shipping_address.phone = "98765432A0".into();
        assert!(validate_checkout(&payload).is_err());
    }

    #[test]
    fn blank_address_fields_collapse_to_one_error() {
        let mut payload = request(vec![item(600, 1)], 600);
        payload.shipping_address.city = "  ".into();
        payload.shipping_address.state = String::new();
        let errors = validate_checkout(&payload).unwrap_err();
        assert_eq!(errors, vec!["incomplete shipping address".to_string()]);
    }

    #[test]
    fn card_payment_requires_card_details() {
        let mut payload = request(vec![item(600, 1)], 600);
        payload.payment_method = PaymentMethod::Card;
        let errors = validate_checkout(&payload).unwrap_err();
        assert_eq!(errors, vec!["missing card details".to_string()]);

        payload.card = Some(CardDetails {
            number: "4111111111111111".into(),
            name: "Asha Rao".into(),
            expiry: "12/27".into(),
            cvv: "123".into(),
        });
        assert_eq!(validate_checkout(&payload), Ok(600));
    }

    #[test]
    fn errors_are_collected_not_fail_fast() {
        let mut payload = request(vec![], 0);
        payload.shipping_address.pincode = String::new();
        let errors = validate_checkout(&payload).unwrap_err();
        assert!(errors.len() >= 2);
    }
}
