use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    models::{AdminType, Profile, Role},
    routing::Route,
    session::AuthSnapshot,
};

/// AccessPolicy
///
/// What a protected view demands of the caller's profile. Every part is optional
/// and the parts combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AccessPolicy {
    pub allowed_roles: Option<Vec<Role>>,
    pub require_admin: bool,
    pub admin_type: Option<AdminType>,
}

/// Denial
///
/// The first predicate that failed. Only used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    RoleNotAllowed,
    AdminRequired,
    AdminTypeMismatch,
}

impl AccessPolicy {
    /// Any signed-in principal with a loaded profile.
    pub fn authenticated() -> Self {
        Self::default()
    }

    pub fn roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed_roles: Some(roles.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn admin() -> Self {
        Self {
            require_admin: true,
            ..Self::default()
        }
    }

    pub fn with_admin_type(mut self, admin_type: AdminType) -> Self {
        self.admin_type = Some(admin_type);
        self
    }

    /// Checks every predicate in order and returns the first failure.
    ///
    /// The subtype predicate only bites when the profile is an admin; pair it
    /// with `require_admin` to keep other roles out as well.
    pub fn check(&self, profile: &Profile) -> Result<(), Denial> {
        if let Some(allowed) = &self.allowed_roles {
            if !allowed.contains(&profile.role) {
                return Err(Denial::RoleNotAllowed);
            }
        }

        if self.require_admin && profile.role != Role::Admin {
            return Err(Denial::AdminRequired);
        }

        if let Some(required) = self.admin_type {
            if profile.role == Role::Admin && profile.admin_type != Some(required) {
                return Err(Denial::AdminTypeMismatch);
            }
        }

        Ok(())
    }

    pub fn permits(&self, profile: &Profile) -> bool {
        self.check(profile).is_ok()
    }
}

/// GuardState
///
/// Outcome of one evaluation of the access guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum GuardState {
    /// The auth provider has not settled yet.
    Loading,
    /// No principal. Redirects to the login page.
    Unauthenticated,
    /// Profile failed the policy. Redirects to the unauthorized page.
    PolicyDenied,
    /// Signed in, profile fetch still pending.
    Resolving,
    /// Render the protected content.
    Granted,
}

impl GuardState {
    /// Where this state sends the user, if anywhere.
    pub fn redirect(&self) -> Option<Route> {
        match self {
            GuardState::Unauthenticated => Some(Route::login()),
            GuardState::PolicyDenied => Some(Route::unauthorized()),
            GuardState::Loading | GuardState::Resolving | GuardState::Granted => None,
        }
    }

    /// Everything except `Granted` renders the loading placeholder.
    pub fn renders_content(&self) -> bool {
        matches!(self, GuardState::Granted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GuardState::Loading => "loading",
            GuardState::Unauthenticated => "unauthenticated",
            GuardState::PolicyDenied => "policy_denied",
            GuardState::Resolving => "resolving",
            GuardState::Granted => "granted",
        }
    }
}

/// evaluate
///
/// Pure decision function. Always computed from the snapshot it is handed;
/// nothing carries over between calls.
pub fn evaluate(snapshot: &AuthSnapshot, policy: &AccessPolicy) -> GuardState {
    if snapshot.loading {
        return GuardState::Loading;
    }

    let Some(principal) = &snapshot.principal else {
        return GuardState::Unauthenticated;
    };

    let Some(profile) = &snapshot.profile else {
        return GuardState::Resolving;
    };

    match policy.check(profile) {
        Ok(()) => GuardState::Granted,
        Err(denial) => {
            tracing::info!(
                uid = %principal.uid,
                role = %profile.role,
                ?denial,
                "access denied by policy"
            );
            GuardState::PolicyDenied
        }
    }
}

/// Navigator
///
/// The external router. Navigation is fire-and-forget.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &Route);
}

/// AccessGuard
///
/// Stateful wrapper that turns evaluations into navigation side effects for
/// one protected view.
///
/// At most one redirect is issued per evaluation. A redirect identical to the
/// one issued by the immediately preceding evaluation is not re-issued; any
/// non-redirecting evaluation clears that memory, and a different target is
/// always issued.
pub struct AccessGuard<N> {
    policy: AccessPolicy,
    navigator: N,
    last_redirect: Option<Route>,
}

impl<N: Navigator> AccessGuard<N> {
    pub fn new(policy: AccessPolicy, navigator: N) -> Self {
        Self {
            policy,
            navigator,
            last_redirect: None,
        }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Re-evaluates against the latest inputs and performs the redirect, if any.
    pub fn on_change(&mut self, snapshot: &AuthSnapshot) -> GuardState {
        let state = evaluate(snapshot, &self.policy);
        tracing::debug!(state = state.as_str(), "access guard evaluated");

        match state.redirect() {
            Some(target) => {
                if self.last_redirect.as_ref() != Some(&target) {
                    self.navigator.navigate(&target);
                    self.last_redirect = Some(target);
                }
            }
            None => self.last_redirect = None,
        }

        state
    }
}
