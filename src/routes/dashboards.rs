use crate::{
    AppState, ProtectedView, access_guard, handlers,
    guard::AccessPolicy,
    models::{AdminType, Role, WorkerService},
    routing::{self, Route},
};
use axum::{Router, middleware, routing::get};

/// protected
///
/// A single dashboard route wrapped in the access guard for `policy`.
fn protected(state: &AppState, route: Route, policy: AccessPolicy) -> Router<AppState> {
    Router::new()
        .route(route.as_str(), get(handlers::dashboard))
        .route_layer(middleware::from_fn_with_state(
            ProtectedView {
                state: state.clone(),
                policy,
            },
            access_guard,
        ))
}

/// Dashboard Router Module
///
/// Serves every destination the role resolver can produce. Policies:
/// - `/admin/{type}`: admins of exactly that admin type.
/// - `/worker/{service}`: workers.
/// - `/restaurant/dashboard`, `/homeowner/properties`: that role only.
/// - `/customer/dashboard`: any signed-in principal with a profile.
pub fn dashboard_routes(state: &AppState) -> Router<AppState> {
    let mut router = Router::new();

    for admin_type in AdminType::ALL {
        router = router.merge(protected(
            state,
            Route::admin(admin_type),
            AccessPolicy::admin().with_admin_type(admin_type),
        ));
    }

    for service in WorkerService::ALL {
        router = router.merge(protected(
            state,
            Route::worker(service),
            AccessPolicy::roles([Role::Worker]),
        ));
    }

    router
        .merge(protected(
            state,
            Route::new(routing::RESTAURANT_DASHBOARD_PATH),
            AccessPolicy::roles([Role::Restaurant]),
        ))
        .merge(protected(
            state,
            Route::new(routing::HOMEOWNER_DASHBOARD_PATH),
            AccessPolicy::roles([Role::Homeowner]),
        ))
        .merge(protected(
            state,
            Route::customer_dashboard(),
            AccessPolicy::authenticated(),
        ))
}
