#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use marketplace_gateway::{
    AppConfig, AppState, InMemoryProfileRepository, MockUploadService, auth::Claims,
    config::Env, create_router, models::Profile, repository::RepositoryState,
    storage::UploadState,
};
use std::{sync::Arc, time::SystemTime};
use tower::util::ServiceExt;

pub const TEST_JWT_SECRET: &str = "router-test-secret-0123456789";

/// Router over an arbitrary profile store and configuration.
pub fn app_from(repo: RepositoryState, uploads: MockUploadService, config: AppConfig) -> Router {
    create_router(AppState {
        repo,
        uploads: Arc::new(uploads) as UploadState,
        config,
    })
}

/// Router in local mode (x-user-id bypass enabled) over an in-memory profile store.
pub fn app_with(profiles: Vec<Profile>, uploads: MockUploadService) -> Router {
    let repo = Arc::new(InMemoryProfileRepository::with_profiles(profiles)) as RepositoryState;
    app_from(repo, uploads, AppConfig::default())
}

/// Router in production mode: only bearer tokens signed with `TEST_JWT_SECRET` count.
pub fn production_app(profiles: Vec<Profile>) -> Router {
    let mut config = AppConfig::default();
    config.env = Env::Production;
    config.jwt_secret = TEST_JWT_SECRET.to_string();

    let repo = Arc::new(InMemoryProfileRepository::with_profiles(profiles)) as RepositoryState;
    app_from(repo, MockUploadService::new(), config)
}

fn now() -> usize {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

/// ID token for `uid` expiring `ttl_secs` from now (negative for already expired).
pub fn token_for(uid: &str, ttl_secs: i64, secret: &str) -> String {
    let claims = Claims {
        sub: uid.to_string(),
        iat: now(),
        exp: (now() as i64 + ttl_secs) as usize,
        email: Some(format!("{uid}@example.com")),
        name: None,
        email_verified: true,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
}

pub async fn get_with_bearer(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub fn app(profiles: Vec<Profile>) -> Router {
    app_with(profiles, MockUploadService::new())
}

pub async fn get_as(app: Router, uri: &str, uid: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(uid) = uid {
        builder = builder.header("x-user-id", uid);
    }
    app.oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_json<T: serde::de::DeserializeOwned>(response: Response<Body>) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
}
