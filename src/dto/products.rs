use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Category, Product};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub long_description: Option<String>,
    pub price: i64,
    pub category: Category,
    pub image_url: String,
    pub stock: i32,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub reviews: i32,
    #[serde(default)]
    pub discount: i32,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub price: Option<i64>,
    pub category: Option<Category>,
    pub image_url: Option<String>,
    pub stock: Option<i32>,
    pub rating: Option<f64>,
    pub reviews: Option<i32>,
    pub discount: Option<i32>,
    pub featured: Option<bool>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}
