use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints that need no principal. `/nav` still personalises itself when the
/// caller happens to be signed in.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /nav
        // Account menu: login/sign-up links, or dashboard + sign-out.
        .route("/nav", get(handlers::get_nav))
        // GET /login, GET /unauthorized
        // Landing targets of the access guard's redirects.
        .route("/login", get(handlers::login_page))
        .route("/unauthorized", get(handlers::unauthorized_page))
}
