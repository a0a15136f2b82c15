use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use uuid::Uuid;

use crate::{
    dto::users::SaveAddressRequest,
    entity::users::{ActiveModel as UserActive, Entity as Users},
    error::{AppError, AppResult},
    models::User,
    services::auth_service::user_from_entity,
    state::AppState,
};

/// Write a shipping address onto the user profile for reuse at the next
/// checkout. Called directly by the profile endpoint and best-effort after
/// order placement.
pub async fn save_address(
    state: &AppState,
    user_id: Uuid,
    payload: SaveAddressRequest,
) -> AppResult<User> {
    let required = [
        &payload.full_name,
        &payload.phone,
        &payload.address,
        &payload.city,
        &payload.state,
        &payload.pincode,
    ];
    if required.iter().any(|field| field.trim().is_empty()) {
        return Err(AppError::BadRequest("Missing required fields".into()));
    }

    let existing = Users::find_by_id(user_id).one(&state.orm).await?;
    let existing = match existing {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };

    let mut active: UserActive = existing.into();
    active.phone = Set(payload.phone);
    active.address_line1 = Set(payload.address);
    active.address_city = Set(payload.city);
    active.address_state = Set(payload.state);
    active.address_pincode = Set(payload.pincode);
    let user = active.update(&state.orm).await?;

    Ok(user_from_entity(user))
}
