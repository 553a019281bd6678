use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Routes for any caller with a verified principal. A profile is not required
/// here; handlers cope with its absence (or report it, for the strict resolver).
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        // Principal, optional profile and the dashboard link built from it.
        .route("/me", get(handlers::get_me))
        // GET /me/dashboard
        // Strict dashboard resolution; 404 until the profile exists.
        .route("/me/dashboard", get(handlers::get_dashboard_route))
        // POST /profiles
        // Self-registration after sign-up. Admin is not self-assignable.
        .route("/profiles", post(handlers::register_profile))
        // POST /upload
        // Multipart image upload through the configured image host.
        .route("/upload", post(handlers::upload_image))
}
