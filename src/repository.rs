use crate::models::{Profile, ProfileRow};
use async_trait::async_trait;
use sqlx::PgPool;
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::sync::RwLock;

/// RepoError
///
/// A write that could not be completed by the store. An existing row is not an
/// error: `create_profile` reports that as `Ok(None)`.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("profile store unavailable: {0}")]
    Database(#[from] sqlx::Error),
}

/// ProfileRepository
///
/// Read side of the document store as the gateway sees it: one profile per
/// principal, keyed by the identity provider uid. Lookup errors are logged and
/// reported as absence, which the access guard treats as "still resolving".
/// Writes report storage failures separately from conflicts.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get_profile(&self, uid: &str) -> Option<Profile>;

    /// Inserts a new profile. Returns `Ok(None)` if one already exists for the id.
    async fn create_profile(&self, profile: Profile) -> Result<Option<Profile>, RepoError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn ProfileRepository>;

const PROFILE_COLUMNS: &str =
    "id, name, email, phone, role, admin_type, worker_service, is_active, created_at";

/// PostgresProfileRepository
///
/// `ProfileRepository` over the `profiles` table.
pub struct PostgresProfileRepository {
    pool: PgPool,
}

impl PostgresProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileRepository for PostgresProfileRepository {
    async fn get_profile(&self, uid: &str) -> Option<Profile> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1");
        sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(uid)
            .fetch_optional(&self.pool)
            .await
            .unwrap_or_else(|e| {
                tracing::error!("get_profile error: {:?}", e);
                None
            })
            .map(Profile::from)
    }

    async fn create_profile(&self, profile: Profile) -> Result<Option<Profile>, RepoError> {
        let sql = format!(
            "INSERT INTO profiles ({PROFILE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (id) DO NOTHING \
             RETURNING {PROFILE_COLUMNS}"
        );
        sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(&profile.id)
            .bind(&profile.name)
            .bind(&profile.email)
            .bind(&profile.phone)
            .bind(profile.role.as_str())
            .bind(profile.admin_type.map(|t| t.as_str()))
            .bind(profile.worker_service.map(|s| s.as_str()))
            .bind(profile.is_active)
            .bind(profile.created_at)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.map(Profile::from))
            .map_err(|e| {
                tracing::error!("create_profile error: {:?}", e);
                RepoError::from(e)
            })
    }
}

/// InMemoryProfileRepository
///
/// Process-local store used in local mode without a database, and in tests.
#[derive(Default)]
pub struct InMemoryProfileRepository {
    profiles: RwLock<HashMap<String, Profile>>,
}

impl InMemoryProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: impl IntoIterator<Item = Profile>) -> Self {
        let map = profiles.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            profiles: RwLock::new(map),
        }
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn get_profile(&self, uid: &str) -> Option<Profile> {
        self.profiles.read().await.get(uid).cloned()
    }

    async fn create_profile(&self, profile: Profile) -> Result<Option<Profile>, RepoError> {
        let mut profiles = self.profiles.write().await;
        if profiles.contains_key(&profile.id) {
            return Ok(None);
        }
        profiles.insert(profile.id.clone(), profile.clone());
        Ok(Some(profile))
    }
}
