use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::contact::ContactRequest,
    error::AppResult,
    response::ApiResponse,
    services::contact_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(send_message))
}

#[utoipa::path(
    post,
    path = "/api/contact",
    request_body = ContactRequest,
    responses(
        (status = 200, description = "Message handed to the notification sink"),
        (status = 400, description = "Name, email or message missing"),
        (status = 500, description = "Sink failure"),
    ),
    tag = "Contact"
)]
pub async fn send_message(
    State(state): State<AppState>,
    Json(payload): Json<ContactRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = contact_service::send_contact_message(&state, payload).await?;
    Ok(Json(resp))
}
