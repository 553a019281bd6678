use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    error::AccessError,
    models::{AdminType, Principal, Profile, Role, WorkerService},
};

/// Sign-in destination used by the access guard.
pub const LOGIN_PATH: &str = "/login";
/// Destination for principals whose profile fails a view's access policy.
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";
/// Generic fallback dashboard.
pub const CUSTOMER_DASHBOARD_PATH: &str = "/customer/dashboard";
pub const RESTAURANT_DASHBOARD_PATH: &str = "/restaurant/dashboard";
pub const HOMEOWNER_DASHBOARD_PATH: &str = "/homeowner/properties";
pub const SIGNUP_PATH: &str = "/signup";

/// Route
///
/// An opaque destination path. Produced by the resolver and the guard, consumed
/// by whatever router performs the navigation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Route(String);

impl Route {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn login() -> Self {
        Self::new(LOGIN_PATH)
    }

    pub fn unauthorized() -> Self {
        Self::new(UNAUTHORIZED_PATH)
    }

    pub fn customer_dashboard() -> Self {
        Self::new(CUSTOMER_DASHBOARD_PATH)
    }

    pub fn admin(admin_type: AdminType) -> Self {
        Self(format!("/admin/{}", admin_type))
    }

    pub fn worker(service: WorkerService) -> Self {
        Self(format!("/worker/{}", service))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Route {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// resolve_dashboard_route
///
/// Maps a profile to its canonical dashboard. First match wins; every role not
/// listed explicitly lands on the customer dashboard. Pure and total.
pub fn resolve_dashboard_route(profile: &Profile) -> Route {
    match profile.role {
        Role::Admin => Route::admin(profile.admin_type.unwrap_or(AdminType::Super)),
        Role::Worker => Route::worker(profile.worker_service.unwrap_or(WorkerService::Cab)),
        Role::Restaurant => Route::new(RESTAURANT_DASHBOARD_PATH),
        Role::Homeowner => Route::new(HOMEOWNER_DASHBOARD_PATH),
        Role::Customer => Route::customer_dashboard(),
    }
}

/// Strict variant for callers that must not guess when the profile is missing.
pub fn try_dashboard_route(profile: Option<&Profile>) -> Result<Route, AccessError> {
    profile
        .map(resolve_dashboard_route)
        .ok_or(AccessError::MissingProfile)
}

/// Dashboard link for menus: same mapping, customer fallback while no profile is loaded.
pub fn dashboard_link(profile: Option<&Profile>) -> Route {
    profile
        .map(resolve_dashboard_route)
        .unwrap_or_else(Route::customer_dashboard)
}

/// Every destination `resolve_dashboard_route` can produce.
pub fn all_dashboard_routes() -> Vec<Route> {
    AdminType::ALL
        .into_iter()
        .map(Route::admin)
        .chain(WorkerService::ALL.into_iter().map(Route::worker))
        .chain([
            Route::new(RESTAURANT_DASHBOARD_PATH),
            Route::new(HOMEOWNER_DASHBOARD_PATH),
            Route::customer_dashboard(),
        ])
        .collect()
}

// --- Navigation menu ---

/// NavAction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum NavAction {
    Link,
    SignOut,
}

/// NavLink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NavLink {
    pub label: String,
    pub href: Option<String>,
    pub action: NavAction,
}

impl NavLink {
    fn link(label: &str, href: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            href: Some(href.into()),
            action: NavAction::Link,
        }
    }

    fn sign_out() -> Self {
        Self {
            label: "Sign out".to_string(),
            href: None,
            action: NavAction::SignOut,
        }
    }
}

/// NavMenu
///
/// The account section of the navigation bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NavMenu {
    pub signed_in: bool,
    pub display_name: Option<String>,
    pub links: Vec<NavLink>,
}

impl NavMenu {
    /// Builds the menu for the current session. The dashboard entry goes through
    /// `dashboard_link`, so it can never drift from the resolver.
    pub fn build(principal: Option<&Principal>, profile: Option<&Profile>) -> Self {
        let Some(principal) = principal else {
            return Self {
                signed_in: false,
                display_name: None,
                links: vec![
                    NavLink::link("Log in", LOGIN_PATH),
                    NavLink::link("Sign up", SIGNUP_PATH),
                ],
            };
        };

        let display_name = profile
            .map(|p| p.name.clone())
            .filter(|name| !name.is_empty())
            .or_else(|| principal.display_name.clone())
            .unwrap_or_else(|| principal.email.clone());

        Self {
            signed_in: true,
            display_name: Some(display_name),
            links: vec![
                NavLink::link("Dashboard", dashboard_link(profile).into_string()),
                NavLink::sign_out(),
            ],
        }
    }
}
