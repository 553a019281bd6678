use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

use crate::{
    guard::{AccessGuard, GuardState, Navigator},
    models::{Principal, Profile},
    repository::ProfileRepository,
    routing::Route,
};

/// AuthSnapshot
///
/// Everything the access guard observes: who is signed in, their profile, and
/// whether the identity provider is still settling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthSnapshot {
    pub principal: Option<Principal>,
    pub profile: Option<Profile>,
    pub loading: bool,
}

impl AuthSnapshot {
    /// The initial state before the identity provider has reported anything.
    pub fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }
}

/// AuthProvider
///
/// Contract for the identity provider integration. Consumers read the current
/// snapshot or subscribe to be woken on every change.
pub trait AuthProvider: Send + Sync {
    fn snapshot(&self) -> AuthSnapshot;
    fn subscribe(&self) -> watch::Receiver<AuthSnapshot>;
    fn sign_out(&self);
}

/// WatchAuthProvider
///
/// `AuthProvider` backed by a `tokio::sync::watch` channel. Every mutation
/// notifies subscribers, even when the new value equals the old one.
#[derive(Clone)]
pub struct WatchAuthProvider {
    tx: watch::Sender<AuthSnapshot>,
}

impl Default for WatchAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchAuthProvider {
    /// Starts in the loading state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AuthSnapshot::loading());
        Self { tx }
    }

    pub fn set_loading(&self, loading: bool) {
        self.tx.send_modify(|s| s.loading = loading);
    }

    /// Records a freshly signed-in principal. Its profile is unknown until
    /// `set_profile` is called.
    pub fn sign_in(&self, principal: Principal) {
        tracing::debug!(uid = %principal.uid, "principal signed in");
        self.tx.send_modify(|s| {
            s.principal = Some(principal);
            s.profile = None;
            s.loading = false;
        });
    }

    pub fn set_profile(&self, profile: Option<Profile>) {
        self.tx.send_modify(|s| s.profile = profile);
    }

    /// Signs the principal in and then fetches its profile from the document
    /// store. A missing record leaves the session resolving.
    pub async fn sign_in_with(&self, repo: &dyn ProfileRepository, principal: Principal) {
        let uid = principal.uid.clone();
        self.sign_in(principal);

        let profile = repo.get_profile(&uid).await;
        if profile.is_none() {
            tracing::warn!(%uid, "no profile on record for signed-in principal");
        }

        // The principal may have changed while the fetch was in flight.
        self.tx.send_if_modified(|s| {
            let still_current = s.principal.as_ref().is_some_and(|p| p.uid == uid);
            if still_current {
                s.profile = profile;
            }
            still_current
        });
    }
}

impl AuthProvider for WatchAuthProvider {
    fn snapshot(&self) -> AuthSnapshot {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.tx.subscribe()
    }

    fn sign_out(&self) {
        tracing::debug!("principal signed out");
        self.tx.send_modify(|s| *s = AuthSnapshot::signed_out());
    }
}

/// ChannelNavigator
///
/// Forwards navigation requests to a router task over an unbounded channel.
/// Never blocks; a closed channel drops the request.
#[derive(Clone)]
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<Route>,
}

impl ChannelNavigator {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Route>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, route: &Route) {
        if self.tx.send(route.clone()).is_err() {
            tracing::warn!(%route, "router gone, navigation dropped");
        }
    }
}

/// GuardHandle
///
/// Live view of a spawned guard. Dropping it stops the guard task at the next
/// change notification.
pub struct GuardHandle {
    state: watch::Receiver<GuardState>,
    task: JoinHandle<()>,
}

impl GuardHandle {
    pub fn current(&self) -> GuardState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<GuardState> {
        self.state.clone()
    }

    /// Waits until the guard reaches a state matching `predicate`.
    pub async fn wait_for(&mut self, predicate: impl FnMut(&GuardState) -> bool) -> Option<GuardState> {
        self.state.wait_for(predicate).await.ok().map(|s| *s)
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}

/// spawn_guard
///
/// Evaluates `guard` once against the current snapshot and then again after
/// every change published on `updates`. Rapid changes coalesce to the latest
/// snapshot. The task ends when the provider goes away or the handle is dropped.
pub fn spawn_guard<N>(mut updates: watch::Receiver<AuthSnapshot>, mut guard: AccessGuard<N>) -> GuardHandle
where
    N: Navigator + 'static,
{
    let initial = updates.borrow_and_update().clone();
    let (tx, rx) = watch::channel(guard.on_change(&initial));

    let task = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            let state = guard.on_change(&snapshot);
            if tx.send(state).is_err() {
                break;
            }
        }
        tracing::debug!("access guard stopped");
    });

    GuardHandle { state: rx, task }
}
