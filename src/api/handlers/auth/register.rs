//! User registration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::{
    password::hash_password,
    rate_limit::Endpoint,
    state::AuthState,
    types::{RegisterRequest, RegisterResponse},
    utils::extract_client_ip,
    validation::{validate_email, validate_password, validate_username},
};
use crate::{
    api::error::ApiError,
    store::{AccountStatus, UserCredential},
};

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered.", body = RegisterResponse),
        (status = 400, description = "Invalid username, password, or email."),
        (status = 409, description = "Username already exists."),
        (status = 429, description = "Rate limited."),
        (status = 503, description = "Store unavailable."),
    ),
    tag = "auth"
)]
pub async fn register(
    headers: HeaderMap,
    Extension(state): Extension<Arc<AuthState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let client_ip = extract_client_ip(&headers);
    if !state.limiter.allow(&client_ip, Endpoint::Credentials) {
        return Err(ApiError::RateLimited);
    }

    let username = validate_username(&request.username)?;
    validate_password(&request.password)?;
    let email = validate_email(request.email.as_deref())?;

    let user = UserCredential {
        uid: Uuid::new_v4(),
        username_lower: username.to_lowercase(),
        // Original casing is cosmetic only.
        display_name: username.clone(),
        email,
        password_hash: hash_password(&request.password)?,
        created_at: Utc::now(),
        last_login_at: None,
        last_login_ip: None,
        account_status: AccountStatus::Active,
    };
    // Conflict maps to 409 without a pre-read, so two racing registrations
    // cannot both win.
    state.users.create(user).await?;

    info!(target: "security", username, client_ip, "New user registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "User registered successfully".to_string(),
        }),
    ))
}
