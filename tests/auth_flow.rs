//! End-to-end flows through the public router: registration, login with
//! legacy hash migration, and session verification.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Extension, Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tower::ServiceExt;
use url::Url;
use uuid::Uuid;

use kitchenchat_auth::{
    api::{self, AuthConfig, AuthState, BruteForceGuard, Endpoint, RateLimiter, SessionManager},
    store::{AccountStatus, MemoryStore, UserCredential, UserStore},
};

fn build_state(store: Arc<MemoryStore>) -> Arc<AuthState> {
    let config = AuthConfig::new(Url::parse("http://localhost:5173").unwrap());
    Arc::new(AuthState::new(
        config,
        store.clone(),
        store.clone(),
        store.clone(),
        store,
    ))
}

fn build_app(state: Arc<AuthState>) -> Router {
    let (router, _openapi) = api::router().split_for_parts();
    router.layer(Extension(state))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(path: &str, ip: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", ip)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn full_register_login_session_cycle() {
    let app = build_app(build_state(Arc::new(MemoryStore::default())));

    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/auth/register",
            "192.0.2.1",
            json!({
                "username": "Walter",
                "password": "K1tchen!Chat",
                "email": "walter@example.com"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);

    // Login is case-insensitive on username; display name keeps its case.
    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/auth/login",
            "192.0.2.1",
            json!({"username": "walter", "password": "K1tchen!Chat"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Max-Age=28800"));
    // Frontend origin is plain http, so no Secure flag.
    assert!(!cookie.contains("Secure"));
    let body = body_json(response).await;
    assert_eq!(body["user"]["displayName"], "Walter");

    let (pair, _) = cookie.split_once(';').unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/v1/auth/session")
                .header(header::COOKIE, pair)
                .header("x-forwarded-for", "192.0.2.1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["valid"], true);
}

#[tokio::test]
async fn legacy_sha256_hash_migrates_on_login() {
    let store = Arc::new(MemoryStore::default());
    let app = build_app(build_state(store.clone()));

    // Seed an account carried over from the legacy deployment.
    let salt = "f00dcafe";
    let digest = {
        let mut hasher = Sha256::new();
        hasher.update("0ldP@ssword".as_bytes());
        hasher.update(salt.as_bytes());
        hex::encode(hasher.finalize())
    };
    let uid = Uuid::new_v4();
    store
        .create(UserCredential {
            uid,
            username_lower: "legacy".to_string(),
            display_name: "Legacy".to_string(),
            email: None,
            password_hash: format!("{salt}:{digest}"),
            created_at: Utc::now(),
            last_login_at: None,
            last_login_ip: None,
            account_status: AccountStatus::Active,
        })
        .await
        .unwrap();

    // Wrong password against a legacy hash stays a plain 401.
    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/auth/login",
            "192.0.2.2",
            json!({"username": "legacy", "password": "N0tThePassword"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/auth/login",
            "192.0.2.2",
            json!({"username": "legacy", "password": "0ldP@ssword"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The stored hash is now bcrypt and the old one verifies never again.
    let migrated = store.get_by_username("legacy").await.unwrap().unwrap();
    assert!(migrated.password_hash.starts_with("$2"));

    let response = app
        .clone()
        .oneshot(post_json(
            "/v1/auth/login",
            "192.0.2.2",
            json!({"username": "legacy", "password": "0ldP@ssword"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn blocked_account_cannot_login() {
    let store = Arc::new(MemoryStore::default());
    let app = build_app(build_state(store.clone()));

    store
        .create(UserCredential {
            uid: Uuid::new_v4(),
            username_lower: "banned".to_string(),
            display_name: "Banned".to_string(),
            email: None,
            password_hash: bcrypt::hash("S0meSecret!", 4).unwrap(),
            created_at: Utc::now(),
            last_login_at: None,
            last_login_ip: None,
            account_status: AccountStatus::Blocked,
        })
        .await
        .unwrap();

    let response = app
        .oneshot(post_json(
            "/v1/auth/login",
            "192.0.2.3",
            json!({"username": "banned", "password": "S0meSecret!"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Account is blocked");
}

// The building blocks are exported for embedding without the HTTP surface.
#[tokio::test]
async fn components_are_usable_standalone() {
    let manager = SessionManager::new(Arc::new(MemoryStore::default()), 60, true);
    let token = manager
        .create(Uuid::new_v4(), "alice", "192.0.2.4", "embedded")
        .await
        .unwrap();
    assert!(manager.verify(&token).await.is_ok());

    let limiter = RateLimiter::new();
    assert!(limiter.allow("192.0.2.4", Endpoint::Credentials));

    let guard = BruteForceGuard::new();
    assert_eq!(guard.record_failure("192.0.2.4"), (1, None));
    guard.record_success("192.0.2.4");
    assert_eq!(guard.check("192.0.2.4"), Ok(0));
}

#[tokio::test]
async fn health_reports_identity() {
    let app = build_app(build_state(Arc::new(MemoryStore::default())));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("X-App"));
    let body = body_json(response).await;
    assert_eq!(body["name"], "kitchenchat-auth");
    assert_eq!(body["status"], "healthy");
}
