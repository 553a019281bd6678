use marketplace_gateway::{
    AccessGuard, InMemoryProfileRepository,
    guard::{AccessPolicy, GuardState},
    models::{AdminType, Principal, Profile, Role},
    session::{AuthProvider, ChannelNavigator, WatchAuthProvider, spawn_guard},
};
use std::time::Duration;
use tokio::time::timeout;

fn principal(uid: &str) -> Principal {
    Principal {
        uid: uid.to_string(),
        email: format!("{uid}@example.com"),
        display_name: None,
        email_verified: true,
    }
}

#[tokio::test]
async fn starts_loading_without_redirect() {
    let provider = WatchAuthProvider::new();
    let (navigator, mut routes) = ChannelNavigator::new();

    let handle = spawn_guard(
        provider.subscribe(),
        AccessGuard::new(AccessPolicy::authenticated(), navigator),
    );

    assert_eq!(handle.current(), GuardState::Loading);
    assert!(routes.try_recv().is_err());
}

#[tokio::test]
async fn sign_in_then_profile_grants_access() {
    let provider = WatchAuthProvider::new();
    let (navigator, mut routes) = ChannelNavigator::new();
    let policy = AccessPolicy::admin().with_admin_type(AdminType::Commerce);
    let mut handle = spawn_guard(provider.subscribe(), AccessGuard::new(policy, navigator));

    provider.sign_in(principal("a1"));
    let state = handle
        .wait_for(|s| *s == GuardState::Resolving)
        .await
        .unwrap();
    assert_eq!(state, GuardState::Resolving);

    provider.set_profile(Some(
        Profile::new("a1", Role::Admin).with_admin_type(AdminType::Commerce),
    ));
    let state = handle.wait_for(|s| *s == GuardState::Granted).await.unwrap();
    assert_eq!(state, GuardState::Granted);

    assert!(routes.try_recv().is_err());
}

#[tokio::test]
async fn signed_out_session_redirects_once_to_login() {
    let provider = WatchAuthProvider::new();
    let (navigator, mut routes) = ChannelNavigator::new();
    let mut handle = spawn_guard(
        provider.subscribe(),
        AccessGuard::new(AccessPolicy::authenticated(), navigator),
    );

    provider.set_loading(false);
    let state = handle
        .wait_for(|s| *s == GuardState::Unauthenticated)
        .await
        .unwrap();
    assert_eq!(state, GuardState::Unauthenticated);

    let first = timeout(Duration::from_secs(1), routes.recv()).await.unwrap().unwrap();
    assert_eq!(first.as_str(), "/login");

    // Same inputs again: no second navigation.
    provider.sign_out();
    tokio::task::yield_now().await;
    assert!(timeout(Duration::from_millis(50), routes.recv()).await.is_err());
}

#[tokio::test]
async fn sign_out_after_grant_revokes_access() {
    let provider = WatchAuthProvider::new();
    let (navigator, mut routes) = ChannelNavigator::new();
    let mut handle = spawn_guard(
        provider.subscribe(),
        AccessGuard::new(AccessPolicy::roles([Role::Restaurant]), navigator),
    );

    provider.sign_in(principal("r1"));
    provider.set_profile(Some(Profile::new("r1", Role::Restaurant)));
    handle.wait_for(|s| *s == GuardState::Granted).await.unwrap();

    provider.sign_out();
    handle
        .wait_for(|s| *s == GuardState::Unauthenticated)
        .await
        .unwrap();

    let route = timeout(Duration::from_secs(1), routes.recv()).await.unwrap().unwrap();
    assert_eq!(route.as_str(), "/login");
}

#[tokio::test]
async fn denied_profile_redirects_to_unauthorized() {
    let provider = WatchAuthProvider::new();
    let repo = InMemoryProfileRepository::with_profiles([Profile::new("w1", Role::Worker)]);
    let (navigator, mut routes) = ChannelNavigator::new();
    let mut handle = spawn_guard(
        provider.subscribe(),
        AccessGuard::new(AccessPolicy::roles([Role::Admin]), navigator),
    );

    provider.sign_in_with(&repo, principal("w1")).await;
    handle
        .wait_for(|s| *s == GuardState::PolicyDenied)
        .await
        .unwrap();

    let route = timeout(Duration::from_secs(1), routes.recv()).await.unwrap().unwrap();
    assert_eq!(route.as_str(), "/unauthorized");
}

#[tokio::test]
async fn missing_record_keeps_session_resolving() {
    let provider = WatchAuthProvider::new();
    let repo = InMemoryProfileRepository::new();

    provider.sign_in_with(&repo, principal("ghost")).await;

    let snapshot = provider.snapshot();
    assert!(!snapshot.loading);
    assert!(snapshot.principal.is_some());
    assert!(snapshot.profile.is_none());
    assert_eq!(
        marketplace_gateway::evaluate(&snapshot, &AccessPolicy::authenticated()),
        GuardState::Resolving
    );
}

#[tokio::test]
async fn guard_stops_when_provider_dropped() {
    let provider = WatchAuthProvider::new();
    let (navigator, _routes) = ChannelNavigator::new();
    let handle = spawn_guard(
        provider.subscribe(),
        AccessGuard::new(AccessPolicy::authenticated(), navigator),
    );
    let mut states = handle.subscribe();

    drop(provider);

    // The state sender lives in the task; its end closes the channel.
    let closed = timeout(Duration::from_secs(1), states.changed()).await.unwrap();
    assert!(closed.is_err());
}
