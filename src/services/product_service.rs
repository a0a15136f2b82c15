use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    entity::products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Category, Product},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy},
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let categories = query.category_set()?;

    let mut condition = Condition::all().add(Column::Price.gte(query.min_price.unwrap_or(0)));

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    if let Some(search) = query.search.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if !categories.is_empty() {
        condition = condition.add(Column::Category.is_in(categories.iter().map(Category::as_str)));
    }

    if query.featured == Some(true) {
        condition = condition.add(Column::Featured.eq(true));
    }

    let mut finder = Products::find().filter(condition);
    finder = match query.sort_by.unwrap_or(ProductSortBy::Featured) {
        ProductSortBy::PriceAsc => finder.order_by_asc(Column::Price),
        ProductSortBy::PriceDesc => finder.order_by_desc(Column::Price),
        ProductSortBy::Newest => finder.order_by_desc(Column::CreatedAt),
        ProductSortBy::Featured => finder
            .order_by_desc(Column::Featured)
            .order_by_desc(Column::CreatedAt),
    };

    // limit 0 or absent means unbounded; the catalog has no pagination cursor.
    if let Some(limit) = query.limit.filter(|l| *l > 0) {
        finder = finder.limit(limit);
    }

    let items = finder
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let data = ProductList { items };
    Ok(ApiResponse::success("Products", data, Some(Meta::empty())))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let result = Products::find_by_id(id).one(&state.orm).await?;
    let result = match result {
        Some(p) => product_from_entity(p)?,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Product", result, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    validate_numeric_ranges(
        payload.price,
        payload.stock,
        payload.rating,
        payload.discount,
    )?;

    let id = Uuid::new_v4();
    let active = ActiveModel {
        id: Set(id),
        name: Set(payload.name),
        description: Set(payload.description),
        long_description: Set(payload.long_description),
        price: Set(payload.price),
        category: Set(payload.category.as_str().to_string()),
        image_url: Set(payload.image_url),
        stock: Set(payload.stock),
        rating: Set(payload.rating),
        reviews: Set(payload.reviews),
        discount: Set(payload.discount),
        featured: Set(payload.featured),
        created_at: NotSet,
    };
    let product = active.insert(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product)?,
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    validate_numeric_ranges(
        payload.price.unwrap_or(existing.price),
        payload.stock.unwrap_or(existing.stock),
        payload.rating.unwrap_or(existing.rating),
        payload.discount.unwrap_or(existing.discount),
    )?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(long_description) = payload.long_description {
        active.long_description = Set(Some(long_description));
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(category) = payload.category {
        active.category = Set(category.as_str().to_string());
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(image_url);
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if let Some(rating) = payload.rating {
        active.rating = Set(rating);
    }
    if let Some(reviews) = payload.reviews {
        active.reviews = Set(reviews);
    }
    if let Some(discount) = payload.discount {
        active.discount = Set(discount);
    }
    if let Some(featured) = payload.featured {
        active.featured = Set(featured);
    }

    let product = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Updated",
        product_from_entity(product)?,
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Products::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn validate_numeric_ranges(price: i64, stock: i32, rating: f64, discount: i32) -> AppResult<()> {
    if price < 0 {
        return Err(AppError::BadRequest("price must be non-negative".into()));
    }
    if stock < 0 {
        return Err(AppError::BadRequest("stock must be non-negative".into()));
    }
    if !(0.0..=5.0).contains(&rating) {
        return Err(AppError::BadRequest("rating must be between 0 and 5".into()));
    }
    if !(0..=100).contains(&discount) {
        return Err(AppError::BadRequest(
            "discount must be between 0 and 100".into(),
        ));
    }
    Ok(())
}

pub(crate) fn product_from_entity(model: ProductModel) -> AppResult<Product> {
    let category = Category::parse(&model.category).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "unknown category {:?} on product {}",
            model.category,
            model.id
        ))
    })?;
    Ok(Product {
        id: model.id,
        name: model.name,
        description: model.description,
        long_description: model.long_description,
        price: model.price,
        category,
        image_url: model.image_url,
        stock: model.stock,
        rating: model.rating,
        reviews: model.reviews,
        discount: model.discount,
        featured: model.featured,
        created_at: model.created_at.with_timezone(&Utc),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ranges() {
        assert!(validate_numeric_ranges(0, 0, 0.0, 0).is_ok());
        assert!(validate_numeric_ranges(100, 5, 4.5, 30).is_ok());
        assert!(validate_numeric_ranges(-1, 0, 0.0, 0).is_err());
        assert!(validate_numeric_ranges(0, -1, 0.0, 0).is_err());
        assert!(validate_numeric_ranges(0, 0, 5.1, 0).is_err());
        assert!(validate_numeric_ranges(0, 0, 0.0, 101).is_err());
    }
}
