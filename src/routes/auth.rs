use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::{
    dto::auth::{LoginRequest, RegisterRequest},
    error::AppResult,
    middleware::auth::{AuthUser, LEGACY_SESSION_COOKIE, SESSION_COOKIE},
    models::User,
    response::{ApiResponse, Meta},
    services::auth_service::{current_user, login_user, register_user},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/logout", post(logout))
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::days(7))
        .build()
}

fn expired_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, ""))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::ZERO)
        .build()
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Register user and start a session", body = ApiResponse<User>),
        (status = 400, description = "Invalid input or email already in use"),
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, CookieJar, Json<ApiResponse<User>>)> {
    let (user, token) = register_user(&state, payload).await?;
    let jar = jar.add(session_cookie(token));
    Ok((
        StatusCode::CREATED,
        jar,
        Json(ApiResponse::success(
            "User registered",
            user,
            Some(Meta::empty()),
        )),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login user", body = ApiResponse<User>),
        (status = 401, description = "Invalid credentials"),
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<ApiResponse<User>>)> {
    let (user, token) = login_user(&state, payload).await?;
    let jar = jar.add(session_cookie(token));
    Ok((
        jar,
        Json(ApiResponse::success("Logged in", user, Some(Meta::empty()))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<User>),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "User no longer exists"),
    ),
    tag = "Auth"
)]
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<User>>> {
    let current = current_user(&state, user.user_id).await?;
    Ok(Json(ApiResponse::success("Ok", current, None)))
}

// Clearing cookies needs no valid session; stale and legacy cookies go too.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session cleared", body = ApiResponse<serde_json::Value>),
    ),
    tag = "Auth"
)]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<ApiResponse<serde_json::Value>>) {
    let jar = jar
        .add(expired_cookie(SESSION_COOKIE))
        .add(expired_cookie(LEGACY_SESSION_COOKIE));
    (
        jar,
        Json(ApiResponse::success(
            "Logged out",
            serde_json::json!({}),
            Some(Meta::empty()),
        )),
    )
}
