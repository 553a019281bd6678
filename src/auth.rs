use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

use crate::{
    config::{AppConfig, Env},
    models::{Principal, Profile},
    repository::RepositoryState,
};

/// Header accepted in `Env::Local` in place of a bearer token.
pub const LOCAL_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// The identity provider's ID token payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Identity provider uid.
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Principal {
            uid: claims.sub,
            email: claims.email.unwrap_or_default(),
            display_name: claims.name,
            email_verified: claims.email_verified,
        }
    }
}

/// decode_principal
///
/// Verifies the token signature and expiry and lifts the claims into a `Principal`.
pub fn decode_principal(token: &str, secret: &str) -> Result<Principal, StatusCode> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => Ok(data.claims.into()),
        Err(e) => {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
                kind => tracing::debug!(?kind, "rejected invalid token"),
            }
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// ResolvedProfile
///
/// Profile lookup already made while extracting the principal, left in the
/// request extensions so later stages of the same request can reuse it.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedProfile(pub Option<Profile>);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// AuthPrincipal
///
/// Extractor yielding the verified principal of the request.
///
/// Resolution order:
/// 1. `Env::Local` only: an `x-user-id` header names the principal directly. Contact
///    details are filled from the stored profile when one exists.
/// 2. A `Bearer` ID token, verified against the configured secret.
///
/// Rejects with 401 when neither yields a principal.
#[derive(Debug, Clone)]
pub struct AuthPrincipal(pub Principal);

impl<S> FromRequestParts<S> for AuthPrincipal
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let local_uid = parts
                .headers
                .get(LOCAL_USER_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|uid| !uid.is_empty());

            if let Some(uid) = local_uid {
                let repo = RepositoryState::from_ref(state);
                let profile = repo.get_profile(uid).await;
                let principal = Principal {
                    uid: uid.to_string(),
                    email: profile.as_ref().map(|p| p.email.clone()).unwrap_or_default(),
                    display_name: profile
                        .as_ref()
                        .map(|p| p.name.clone())
                        .filter(|name| !name.is_empty()),
                    email_verified: false,
                };
                parts.extensions.insert(ResolvedProfile(profile));
                return Ok(AuthPrincipal(principal));
            }
        }

        let token = bearer_token(parts).ok_or(StatusCode::UNAUTHORIZED)?;
        decode_principal(token, &config.jwt_secret).map(AuthPrincipal)
    }
}

/// MaybePrincipal
///
/// Like `AuthPrincipal`, but never rejects: anonymous requests yield `None`.
#[derive(Debug, Clone)]
pub struct MaybePrincipal(pub Option<Principal>);

impl<S> FromRequestParts<S> for MaybePrincipal
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let principal = AuthPrincipal::from_request_parts(parts, state)
            .await
            .ok()
            .map(|AuthPrincipal(p)| p);
        Ok(MaybePrincipal(principal))
    }
}
