use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::auth::{Claims, LoginRequest, RegisterRequest},
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    error::{AppError, AppResult},
    models::{Address, User},
    state::AppState,
};

const SESSION_TTL_DAYS: i64 = 7;

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<(User, String)> {
    let name = payload.name.trim().to_string();
    let email = normalize_email(&payload.email);
    let password = payload.password;

    if name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest(
            "Name, email, and password are required".into(),
        ));
    }
    if !email_is_valid(&email) {
        return Err(AppError::BadRequest(
            "Please provide a valid email address".into(),
        ));
    }
    if password.len() < 6 {
        return Err(AppError::BadRequest(
            "Password must be at least 6 characters".into(),
        ));
    }

    let exists = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;
    if exists.is_some() {
        return Err(AppError::BadRequest("Email already in use".into()));
    }

    let password_hash = hash_password(&password)?;

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        email: Set(email),
        password_hash: Set(password_hash),
        phone: Set(String::new()),
        address_line1: Set(String::new()),
        address_city: Set(String::new()),
        address_state: Set(String::new()),
        address_pincode: Set(String::new()),
        is_admin: Set(false),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let token = issue_token(state, user.id, user.is_admin)?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.id),
        "user_register",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok((user_from_entity(user), token))
}

pub async fn login_user(state: &AppState, payload: LoginRequest) -> AppResult<(User, String)> {
    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest("Email and password are required".into()));
    }

    let user = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;

    // Unknown email and wrong password are indistinguishable on purpose.
    let user = match user {
        Some(u) => u,
        None => return Err(AppError::Unauthorized("Invalid email or password".into())),
    };

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    if Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::Unauthorized("Invalid email or password".into()));
    }

    let token = issue_token(state, user.id, user.is_admin)?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.id),
        "user_login",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok((user_from_entity(user), token))
}

/// Session check backing `GET /auth/me`: the cookie was already verified by
/// the extractor; 404 if the user row vanished since the token was issued.
pub async fn current_user(state: &AppState, user_id: Uuid) -> AppResult<User> {
    let user = Users::find_by_id(user_id).one(&state.orm).await?;
    match user {
        Some(u) => Ok(user_from_entity(u)),
        None => Err(AppError::NotFound),
    }
}

pub fn issue_token(state: &AppState, user_id: Uuid, is_admin: bool) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::days(SESSION_TTL_DAYS))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        is_admin,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// Shape check only: something@something.something, no whitespace.
fn email_is_valid(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain
                    .split_once('.')
                    .is_some_and(|(head, tail)| !head.is_empty() && !tail.is_empty())
        }
        _ => false,
    }
}

pub(crate) fn user_from_entity(model: UserModel) -> User {
    User {
        id: model.id,
        name: model.name,
        email: model.email,
        phone: model.phone,
        address: Address {
            line1: model.address_line1,
            city: model.address_city,
            state: model.address_state,
            pincode: model.address_pincode,
        },
        is_admin: model.is_admin,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_check() {
        assert!(email_is_valid("a@x.com"));
        assert!(email_is_valid("first.last@shop.example.in"));
        assert!(!email_is_valid("not-an-email"));
        assert!(!email_is_valid("@x.com"));
        assert!(!email_is_valid("a@nodot"));
        assert!(!email_is_valid("a@.com"));
        assert!(!email_is_valid("a b@x.com"));
        assert!(!email_is_valid("a@x@y.com"));
    }

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_email("  A@X.Com "), "a@x.com");
    }
}
