//! Login: credential verification, legacy hash migration, session issue.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use tracing::{error, info, warn};

use super::{
    password::{migrate_legacy_password, verify_password},
    rate_limit::Endpoint,
    session::session_cookie,
    state::AuthState,
    types::{LoginRequest, LoginResponse, UserBody},
    utils::extract_client_ip,
};
use crate::{api::error::ApiError, store::AccountStatus};

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login succeeded; session cookie set.", body = LoginResponse),
        (status = 400, description = "Missing username or password."),
        (status = 401, description = "Invalid credentials."),
        (status = 403, description = "Account is blocked."),
        (status = 423, description = "Too many failed attempts."),
        (status = 429, description = "Rate limited."),
        (status = 503, description = "Store unavailable."),
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    Extension(state): Extension<Arc<AuthState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let client_ip = extract_client_ip(&headers);
    if !state.limiter.allow(&client_ip, Endpoint::Credentials) {
        return Err(ApiError::RateLimited);
    }
    if let Err((attempts, remaining_seconds)) = state.guard.check(&client_ip) {
        return Err(ApiError::Locked {
            attempts,
            remaining_seconds,
        });
    }

    let username = request.username.trim().to_lowercase();
    if username.is_empty() || request.password.is_empty() {
        state.guard.record_failure(&client_ip);
        return Err(ApiError::Validation(
            "Username and password are required".to_string(),
        ));
    }

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let Some(user) = state.users.get_by_username(&username).await? else {
        state.guard.record_failure(&client_ip);
        warn!(target: "security", username, client_ip, "Login failed: unknown user");
        return Err(ApiError::InvalidCredentials);
    };

    if user.account_status == AccountStatus::Blocked {
        warn!(target: "security", username, client_ip, "Blocked account login attempt");
        return Err(ApiError::AccountBlocked);
    }

    let mut password_valid = verify_password(&request.password, &user.password_hash);

    // Legacy salted-SHA-256 hashes are upgraded in place on first
    // successful login.
    if !password_valid && user.password_hash.contains(':') {
        if let Some(migrated) = migrate_legacy_password(&request.password, &user.password_hash) {
            password_valid = true;
            if let Err(err) = state.users.update_password_hash(user.uid, &migrated).await {
                // The login still succeeds; migration retries next time.
                error!("Password hash migration persist failed: {err}");
            } else {
                info!(target: "security", username, "Password migrated to bcrypt");
            }
        }
    }

    if !password_valid {
        state.guard.record_failure(&client_ip);
        warn!(target: "security", username, client_ip, "Login failed: bad password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = state
        .sessions
        .create(user.uid, &user.display_name, &client_ip, user_agent)
        .await?;

    if let Err(err) = state
        .users
        .update_last_login(user.uid, &client_ip, Utc::now())
        .await
    {
        error!("Last-login update failed: {err}");
    }
    state.guard.record_success(&client_ip);

    info!(target: "security", username, client_ip, "Successful login");

    let cookie = session_cookie(
        &token,
        state.sessions.ttl_seconds(),
        state.config.cookie_secure(),
    );
    let body = LoginResponse {
        success: true,
        message: "Login successful".to_string(),
        user: UserBody {
            username: user.username_lower,
            display_name: user.display_name,
        },
    };
    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}
