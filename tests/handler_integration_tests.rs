mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use async_trait::async_trait;
use common::{app, app_from, app_with, body_json, get_as};
use marketplace_gateway::{
    AppConfig, MockUploadService,
    repository::{ProfileRepository, RepoError, RepositoryState},
    models::{AdminType, DashboardRouteResponse, MeResponse, Profile, Role, UploadResponse, WorkerService},
    routing::{NavAction, NavMenu},
};
use serde_json::json;
use std::sync::Arc;
use tower::util::ServiceExt;

/// Store whose writes always fail, as with an unreachable database.
struct UnavailableRepository;

#[async_trait]
impl ProfileRepository for UnavailableRepository {
    async fn get_profile(&self, _uid: &str) -> Option<Profile> {
        None
    }

    async fn create_profile(&self, _profile: Profile) -> Result<Option<Profile>, RepoError> {
        Err(RepoError::Database(sqlx::Error::PoolTimedOut))
    }
}

const BOUNDARY: &str = "gateway-test-boundary";

fn multipart_body(field: &str, filename: &str, content_type: &str, data: &str) -> Body {
    Body::from(format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: {content_type}\r\n\r\n\
         {data}\r\n\
         --{BOUNDARY}--\r\n"
    ))
}

fn upload_request(uid: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header("x-user-id", uid)
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(body)
        .unwrap()
}

fn register_request(uid: &str, payload: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/profiles")
        .header("x-user-id", uid)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let response = get_as(app(vec![]), "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_me_requires_principal() {
    let response = get_as(app(vec![]), "/me", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_reports_resolved_dashboard() {
    let mut admin = Profile::new("a1", Role::Admin).with_admin_type(AdminType::Logistics);
    admin.email = "ops@example.com".to_string();

    let response = get_as(app(vec![admin]), "/me", Some("a1")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let me: MeResponse = body_json(response).await;
    assert_eq!(me.principal.uid, "a1");
    assert_eq!(me.principal.email, "ops@example.com");
    assert_eq!(me.dashboard, "/admin/logistics");
    assert!(me.profile.is_some());
}

#[tokio::test]
async fn test_me_without_profile_falls_back_to_customer() {
    let response = get_as(app(vec![]), "/me", Some("new-user")).await;
    let me: MeResponse = body_json(response).await;

    assert!(me.profile.is_none());
    assert_eq!(me.dashboard, "/customer/dashboard");
}

#[tokio::test]
async fn test_strict_dashboard_route() {
    let worker = Profile::new("w1", Role::Worker);

    let found = get_as(app(vec![worker.clone()]), "/me/dashboard", Some("w1")).await;
    assert_eq!(found.status(), StatusCode::OK);
    let body: DashboardRouteResponse = body_json(found).await;
    assert_eq!(body.route, "/worker/cab");

    let missing = get_as(app(vec![worker]), "/me/dashboard", Some("nobody")).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_nav_menu_for_anonymous_and_signed_in() {
    let anonymous = get_as(app(vec![]), "/nav", None).await;
    assert_eq!(anonymous.status(), StatusCode::OK);
    let menu: NavMenu = body_json(anonymous).await;
    assert!(!menu.signed_in);

    let mut homeowner = Profile::new("h1", Role::Homeowner);
    homeowner.name = "Hana".to_string();
    let signed_in = get_as(app(vec![homeowner]), "/nav", Some("h1")).await;
    let menu: NavMenu = body_json(signed_in).await;
    assert!(menu.signed_in);
    assert_eq!(menu.display_name.as_deref(), Some("Hana"));
    assert_eq!(menu.links[0].href.as_deref(), Some("/homeowner/properties"));
    assert_eq!(menu.links[1].action, NavAction::SignOut);
}

#[tokio::test]
async fn test_register_profile_then_reach_dashboard() {
    let app = app(vec![]);

    let response = app
        .clone()
        .oneshot(register_request(
            "w9",
            json!({ "name": "Wanda", "phone": "555-0101", "role": "worker", "workerService": "delivery" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Profile = body_json(response).await;
    assert_eq!(created.id, "w9");
    assert_eq!(created.worker_service, Some(WorkerService::Delivery));

    let dashboard = get_as(app.clone(), "/worker/delivery", Some("w9")).await;
    assert_eq!(dashboard.status(), StatusCode::OK);

    let again = app
        .oneshot(register_request("w9", json!({ "name": "Wanda", "role": "customer" })))
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_drops_subtype_for_other_roles() {
    let response = app(vec![])
        .oneshot(register_request(
            "c1",
            json!({ "name": "Cora", "role": "customer", "workerService": "cab" }),
        ))
        .await
        .unwrap();

    let created: Profile = body_json(response).await;
    assert_eq!(created.role, Role::Customer);
    assert_eq!(created.worker_service, None);
}

#[tokio::test]
async fn test_register_storage_failure_is_not_a_conflict() {
    let repo = Arc::new(UnavailableRepository) as RepositoryState;
    let app = app_from(repo, MockUploadService::new(), AppConfig::default());

    let response = app
        .oneshot(register_request(
            "brand-new",
            json!({ "name": "Nadia", "role": "homeowner" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"Internal server error");
}

#[tokio::test]
async fn test_register_refuses_admin() {
    let response = app(vec![])
        .oneshot(register_request("x1", json!({ "name": "Eve", "role": "admin" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_upload_success() {
    let response = app(vec![])
        .oneshot(upload_request(
            "u1",
            multipart_body("file", "avatar.png", "image/png", "PNGDATA"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: UploadResponse = body_json(response).await;
    assert_eq!(body.secure_url, "https://images.test/marketplace_uploads/avatar.png");
}

#[tokio::test]
async fn test_upload_rejects_non_image() {
    let response = app(vec![])
        .oneshot(upload_request(
            "u1",
            multipart_body("file", "notes.txt", "text/plain", "hello"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_requires_file_field() {
    let response = app(vec![])
        .oneshot(upload_request(
            "u1",
            multipart_body("avatar", "avatar.png", "image/png", "PNGDATA"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_failure_is_generic() {
    let response = app_with(vec![], MockUploadService::new_failing())
        .oneshot(upload_request(
            "u1",
            multipart_body("file", "avatar.png", "image/png", "PNGDATA"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"Failed to upload image");
}

#[tokio::test]
async fn test_upload_requires_principal() {
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(multipart_body("file", "avatar.png", "image/png", "PNGDATA"))
        .unwrap();

    let response = app(vec![]).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
