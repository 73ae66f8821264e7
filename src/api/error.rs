//! Error taxonomy for the auth API.
//!
//! Every handler returns `Result<_, ApiError>`; the `IntoResponse` impl is
//! the single place that maps failures onto HTTP statuses and `{"error": ..}`
//! bodies. Messages are safe to expose: store and internal failures are
//! logged with full detail where they happen and reach the client only as a
//! generic line; engine names, file paths, and stack context stay out of
//! responses. Unknown-user and wrong-password failures share one message so
//! responses never reveal whether a username exists.

use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use serde_json::json;

use crate::rbac::RbacError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid or expired session")]
    InvalidSession,
    #[error("Account is blocked")]
    AccountBlocked,
    #[error("Admin access required")]
    AdminRequired,
    #[error("Permission '{0}' required")]
    PermissionRequired(String),
    #[error("Username already exists")]
    UsernameTaken,
    #[error("Too many failed attempts ({attempts}). Try again in {remaining_seconds} seconds")]
    Locked {
        attempts: u32,
        remaining_seconds: u64,
    },
    #[error("Too many requests. Please slow down.")]
    RateLimited,
    #[error("Service temporarily unavailable. Please try again.")]
    ServiceUnavailable,
    #[error("An unexpected error occurred. Please try again.")]
    Internal,
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::InvalidSession => StatusCode::UNAUTHORIZED,
            Self::AccountBlocked | Self::AdminRequired | Self::PermissionRequired(_) => {
                StatusCode::FORBIDDEN
            }
            Self::UsernameTaken => StatusCode::CONFLICT,
            Self::Locked { .. } => StatusCode::LOCKED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            // The only conflict a handler lets bubble up is a duplicate
            // username on registration.
            StoreError::Conflict => Self::UsernameTaken,
            StoreError::Unavailable(_) | StoreError::Timeout => Self::ServiceUnavailable,
        }
    }
}

impl From<RbacError> for ApiError {
    fn from(err: RbacError) -> Self {
        match err {
            RbacError::AdminRequired => Self::AdminRequired,
            RbacError::PermissionRequired(permission) => Self::PermissionRequired(permission),
            RbacError::Unavailable(_) => Self::ServiceUnavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            ApiError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::AdminRequired.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::Locked {
                attempts: 5,
                remaining_seconds: 300
            }
            .status(),
            StatusCode::LOCKED
        );
        assert_eq!(
            ApiError::RateLimited.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::ServiceUnavailable.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn store_outage_maps_to_503_not_404_or_401() {
        let err: ApiError = StoreError::Timeout.into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        let err: ApiError = StoreError::Unavailable("users.get".into()).into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn lockout_message_discloses_only_the_wait() {
        let err = ApiError::Locked {
            attempts: 6,
            remaining_seconds: 600,
        };
        assert_eq!(
            err.to_string(),
            "Too many failed attempts (6). Try again in 600 seconds"
        );
    }

    #[test]
    fn messages_do_not_leak_store_details() {
        let err: ApiError = StoreError::Unavailable("sessions.get: pg pool exhausted".into()).into();
        let message = err.to_string();
        assert!(!message.contains("pg"));
        assert!(!message.contains("sessions.get"));
    }
}
