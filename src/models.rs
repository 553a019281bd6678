use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;

// --- Identity ---

/// Principal
///
/// The signed-in actor as reported by the identity provider. This crate never
/// mutates it; a signed-out session simply has no principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Principal {
    /// Identity provider user id. Also the key of the matching `Profile`.
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
    pub email_verified: bool,
}

// --- Closed role sets ---

/// Role
///
/// The closed set of marketplace roles. Anything that is not one of the first
/// four decodes to `Customer`, whether it comes from the database or from JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    Worker,
    Restaurant,
    Homeowner,
    #[default]
    Customer,
}

impl Role {
    /// Case-insensitive decode. Never fails.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "worker" => Role::Worker,
            "restaurant" => Role::Restaurant,
            "homeowner" => Role::Homeowner,
            _ => Role::Customer,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Worker => "worker",
            Role::Restaurant => "restaurant",
            Role::Homeowner => "homeowner",
            Role::Customer => "customer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Role::parse(&String::deserialize(deserializer)?))
    }
}

/// AdminType
///
/// Which admin console an administrator operates. Only meaningful for `Role::Admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum AdminType {
    Super,
    Cab,
    Commerce,
    Service,
    Logistics,
}

impl AdminType {
    pub const ALL: [AdminType; 5] = [
        AdminType::Super,
        AdminType::Cab,
        AdminType::Commerce,
        AdminType::Service,
        AdminType::Logistics,
    ];

    /// Case-insensitive decode; `None` for values outside the set.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(value))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdminType::Super => "super",
            AdminType::Cab => "cab",
            AdminType::Commerce => "commerce",
            AdminType::Service => "service",
            AdminType::Logistics => "logistics",
        }
    }
}

impl fmt::Display for AdminType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| format!("unknown AdminType: {value}"))
    }
}

impl<'de> Deserialize<'de> for AdminType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(de::Error::custom)
    }
}

/// WorkerService
///
/// The marketplace vertical a worker serves. Only meaningful for `Role::Worker`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum WorkerService {
    Cab,
    Delivery,
    Service,
    Logistics,
}

impl WorkerService {
    pub const ALL: [WorkerService; 4] = [
        WorkerService::Cab,
        WorkerService::Delivery,
        WorkerService::Service,
        WorkerService::Logistics,
    ];

    /// Case-insensitive decode; `None` for values outside the set.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(value))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerService::Cab => "cab",
            WorkerService::Delivery => "delivery",
            WorkerService::Service => "service",
            WorkerService::Logistics => "logistics",
        }
    }
}

impl fmt::Display for WorkerService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkerService {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| format!("unknown WorkerService: {value}"))
    }
}

impl<'de> Deserialize<'de> for WorkerService {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(de::Error::custom)
    }
}

/// Optional subtype field: unknown values decode to `None` instead of failing
/// the whole record, matching how stored rows are read.
fn lenient_subtype<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    Ok(Option::<String>::deserialize(deserializer)?.and_then(|raw| raw.parse().ok()))
}

// --- Profile ---

/// Profile
///
/// The domain record stored 1:1 with a `Principal` in the document store.
/// Read-only from the gateway's point of view, apart from self-registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    #[serde(default, deserialize_with = "lenient_subtype")]
    pub admin_type: Option<AdminType>,
    #[serde(default, deserialize_with = "lenient_subtype")]
    pub worker_service: Option<WorkerService>,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl Profile {
    /// Minimal active profile with the given role. Subtypes start empty.
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            email: String::new(),
            phone: None,
            role,
            admin_type: None,
            worker_service: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_admin_type(mut self, admin_type: AdminType) -> Self {
        self.admin_type = Some(admin_type);
        self
    }

    pub fn with_worker_service(mut self, service: WorkerService) -> Self {
        self.worker_service = Some(service);
        self
    }
}

/// ProfileRow
///
/// Raw `profiles` table row. Enum columns are stored as text and decoded leniently
/// when converted into a `Profile`.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub admin_type: Option<String>,
    pub worker_service: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            role: Role::parse(&row.role),
            admin_type: row.admin_type.as_deref().and_then(AdminType::parse),
            worker_service: row.worker_service.as_deref().and_then(WorkerService::parse),
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

// --- Request Payloads ---

/// RegisterProfileRequest
///
/// Input payload for self-registration (POST /profiles). The id and email come
/// from the authenticated principal, never from the body.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RegisterProfileRequest {
    pub name: String,
    pub phone: Option<String>,
    pub role: Role,
    #[serde(default, deserialize_with = "lenient_subtype")]
    pub worker_service: Option<WorkerService>,
}

// --- Response Schemas ---

/// MeResponse
///
/// Output schema for GET /me. `profile` is absent while the record is still
/// being created; `dashboard` then carries the customer fallback.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MeResponse {
    pub principal: Principal,
    pub profile: Option<Profile>,
    pub dashboard: String,
}

/// DashboardRouteResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DashboardRouteResponse {
    pub route: String,
}

/// DashboardView
///
/// Payload rendered by a protected dashboard once the access guard grants entry.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DashboardView {
    pub route: String,
    pub title: String,
    pub greeting: String,
    pub role: Role,
}

/// PlaceholderResponse
///
/// The neutral "still loading" body served while a decision cannot be made yet.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PlaceholderResponse {
    pub state: String,
}

/// UploadResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UploadResponse {
    pub secure_url: String,
}
