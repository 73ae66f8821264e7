//! Admin status and role management endpoints. Every mutation lands in
//! the audit trail via the RBAC engine.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::HeaderMap,
    Json,
};
use uuid::Uuid;

use super::{
    principal::verify_token,
    rate_limit::Endpoint,
    state::AuthState,
    types::{AdminStatusResponse, GrantRoleRequest, RoleChangeResponse},
    utils::extract_client_ip,
};
use crate::{api::error::ApiError, store::Session};

/// Admin-class rate limit, then session verification.
async fn require_admin_session(
    headers: &HeaderMap,
    state: &AuthState,
) -> Result<Session, ApiError> {
    let client_ip = extract_client_ip(headers);
    if !state.limiter.allow(&client_ip, Endpoint::Admin) {
        return Err(ApiError::RateLimited);
    }
    verify_token(headers, state).await
}

#[utoipa::path(
    get,
    path = "/v1/auth/admin/status",
    responses(
        (status = 200, description = "Admin status for the current session.", body = AdminStatusResponse),
        (status = 401, description = "Invalid or expired session."),
        (status = 429, description = "Rate limited."),
        (status = 503, description = "Store unavailable."),
    ),
    tag = "admin"
)]
pub async fn admin_status(
    headers: HeaderMap,
    Extension(state): Extension<Arc<AuthState>>,
) -> Result<Json<AdminStatusResponse>, ApiError> {
    let session = require_admin_session(&headers, &state).await?;
    let is_admin = state.rbac.is_admin(session.uid).await?;
    Ok(Json(AdminStatusResponse { is_admin }))
}

#[utoipa::path(
    post,
    path = "/v1/auth/admin/roles",
    request_body = GrantRoleRequest,
    responses(
        (status = 200, description = "Roles granted.", body = RoleChangeResponse),
        (status = 401, description = "Invalid or expired session."),
        (status = 403, description = "Admin access required."),
        (status = 429, description = "Rate limited."),
        (status = 503, description = "Store unavailable."),
    ),
    tag = "admin"
)]
pub async fn grant_role(
    headers: HeaderMap,
    Extension(state): Extension<Arc<AuthState>>,
    Json(request): Json<GrantRoleRequest>,
) -> Result<Json<RoleChangeResponse>, ApiError> {
    let session = require_admin_session(&headers, &state).await?;
    state.rbac.require_admin(session.uid).await?;

    let client_ip = extract_client_ip(&headers);
    state
        .rbac
        .grant_role(
            request.uid,
            request.roles,
            request.permissions,
            session.uid,
            Some(&client_ip),
        )
        .await?;
    Ok(Json(RoleChangeResponse {
        success: true,
        uid: request.uid,
    }))
}

#[utoipa::path(
    delete,
    path = "/v1/auth/admin/roles/{uid}",
    params(("uid" = Uuid, Path, description = "User whose roles are revoked.")),
    responses(
        (status = 200, description = "Roles revoked.", body = RoleChangeResponse),
        (status = 401, description = "Invalid or expired session."),
        (status = 403, description = "Admin access required."),
        (status = 429, description = "Rate limited."),
        (status = 503, description = "Store unavailable."),
    ),
    tag = "admin"
)]
pub async fn revoke_role(
    headers: HeaderMap,
    Path(uid): Path<Uuid>,
    Extension(state): Extension<Arc<AuthState>>,
) -> Result<Json<RoleChangeResponse>, ApiError> {
    let session = require_admin_session(&headers, &state).await?;
    state.rbac.require_admin(session.uid).await?;

    let client_ip = extract_client_ip(&headers);
    state
        .rbac
        .revoke_role(uid, session.uid, Some(&client_ip))
        .await?;
    Ok(Json(RoleChangeResponse { success: true, uid }))
}
