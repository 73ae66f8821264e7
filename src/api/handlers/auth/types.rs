//! Request and response bodies for the auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Public view of a user, safe to embed in any response.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserBody {
    pub username: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub user: UserBody,
}

/// Identity attached to a live session.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionUserBody {
    pub uid: Uuid,
    #[serde(rename = "displayName")]
    pub display_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub success: bool,
    pub valid: bool,
    pub user: SessionUserBody,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutAllResponse {
    pub success: bool,
    pub revoked: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminStatusResponse {
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GrantRoleRequest {
    pub uid: Uuid,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleChangeResponse {
    pub success: bool,
    pub uid: Uuid,
}
