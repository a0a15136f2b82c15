use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::users::SaveAddressRequest,
    error::AppResult,
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
    services::user_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/address", post(save_address))
}

#[utoipa::path(
    post,
    path = "/api/users/address",
    request_body = SaveAddressRequest,
    responses(
        (status = 200, description = "Shipping address saved to profile", body = ApiResponse<User>),
        (status = 400, description = "Missing required fields"),
        (status = 401, description = "Not authenticated"),
    ),
    tag = "Users"
)]
pub async fn save_address(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SaveAddressRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let updated = user_service::save_address(&state, user.user_id, payload).await?;
    Ok(Json(ApiResponse::success(
        "Shipping address saved",
        updated,
        Some(Meta::empty()),
    )))
}
