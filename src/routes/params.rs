use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{Category, OrderStatus},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ProductSortBy {
    PriceAsc,
    PriceDesc,
    Newest,
    Featured,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProductQuery {
    pub search: Option<String>,
    /// Comma-separated category names; empty means no filter.
    pub categories: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub featured: Option<bool>,
    pub limit: Option<u64>,
    pub sort_by: Option<ProductSortBy>,
}

impl ProductQuery {
    pub fn category_set(&self) -> AppResult<Vec<Category>> {
        let Some(raw) = self.categories.as_deref() else {
            return Ok(Vec::new());
        };
        raw.split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| {
                Category::parse(token)
                    .ok_or_else(|| AppError::BadRequest(format!("unknown category: {token}")))
            })
            .collect()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrderListQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub status: Option<OrderStatus>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserListQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(categories: Option<&str>) -> ProductQuery {
        ProductQuery {
            search: None,
            categories: categories.map(str::to_string),
            min_price: None,
            max_price: None,
            featured: None,
            limit: None,
            sort_by: None,
        }
    }

    #[test]
    fn category_set_parses_comma_separated_names() {
        let set = query(Some("Footwear,Gym")).category_set().unwrap();
        assert_eq!(set, vec![Category::Footwear, Category::Gym]);
    }

    #[test]
    fn category_set_rejects_unknown_tokens() {
        assert!(query(Some("Footwear,Toys")).category_set().is_err());
    }

    #[test]
    fn category_set_ignores_empty_tokens() {
        assert!(query(Some("")).category_set().unwrap().is_empty());
        assert!(query(None).category_set().unwrap().is_empty());
    }
}
