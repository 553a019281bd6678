use crate::{
    AppState,
    auth::{AuthPrincipal, MaybePrincipal},
    error::AppError,
    models::{
        DashboardRouteResponse, DashboardView, MeResponse, PlaceholderResponse, Profile,
        RegisterProfileRequest, Role, UploadResponse,
    },
    routing::{self, NavMenu},
    storage::UploadFile,
};
use axum::{
    Extension, Json,
    extract::{Multipart, OriginalUri, State},
    http::StatusCode,
};

// --- Public ---

/// get_nav
///
/// [Public Route] Account section of the navigation bar for the caller, signed in or not.
/// The dashboard link falls back to the customer dashboard while no profile exists.
#[utoipa::path(
    get,
    path = "/nav",
    responses((status = 200, description = "Navigation menu", body = NavMenu))
)]
pub async fn get_nav(
    MaybePrincipal(principal): MaybePrincipal,
    State(state): State<AppState>,
) -> Json<NavMenu> {
    let profile = match &principal {
        Some(p) => state.repo.get_profile(&p.uid).await,
        None => None,
    };
    Json(NavMenu::build(principal.as_ref(), profile.as_ref()))
}

/// login_page
///
/// [Public Route] Redirect target for unauthenticated access to a protected view.
#[utoipa::path(
    get,
    path = "/login",
    responses((status = 200, description = "Sign-in required", body = PlaceholderResponse))
)]
pub async fn login_page() -> Json<PlaceholderResponse> {
    Json(PlaceholderResponse {
        state: "sign_in_required".to_string(),
    })
}

/// unauthorized_page
///
/// [Public Route] Redirect target when a profile fails a view's access policy.
#[utoipa::path(
    get,
    path = "/unauthorized",
    responses((status = 403, description = "Not allowed", body = PlaceholderResponse))
)]
pub async fn unauthorized_page() -> (StatusCode, Json<PlaceholderResponse>) {
    (
        StatusCode::FORBIDDEN,
        Json(PlaceholderResponse {
            state: "unauthorized".to_string(),
        }),
    )
}

// --- Authenticated ---

/// get_me
///
/// [Authenticated Route] The caller's principal, profile (if any) and dashboard link.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Session", body = MeResponse))
)]
pub async fn get_me(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
) -> Json<MeResponse> {
    let profile = state.repo.get_profile(&principal.uid).await;
    let dashboard = routing::dashboard_link(profile.as_ref()).into_string();
    Json(MeResponse {
        principal,
        profile,
        dashboard,
    })
}

/// get_dashboard_route
///
/// [Authenticated Route] Strict resolver: 404 while the caller has no profile.
#[utoipa::path(
    get,
    path = "/me/dashboard",
    responses(
        (status = 200, description = "Dashboard route", body = DashboardRouteResponse),
        (status = 404, description = "Profile not loaded")
    )
)]
pub async fn get_dashboard_route(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
) -> Result<Json<DashboardRouteResponse>, AppError> {
    let profile = state.repo.get_profile(&principal.uid).await;
    let route = routing::try_dashboard_route(profile.as_ref())?;
    Ok(Json(DashboardRouteResponse {
        route: route.into_string(),
    }))
}

/// register_profile
///
/// [Authenticated Route] Creates the caller's profile after sign-up.
///
/// Identity fields come from the principal. Admin profiles are provisioned out of
/// band and cannot be self-registered.
#[utoipa::path(
    post,
    path = "/profiles",
    request_body = RegisterProfileRequest,
    responses(
        (status = 201, description = "Created", body = Profile),
        (status = 403, description = "Role not self-assignable"),
        (status = 409, description = "Profile already exists"),
        (status = 500, description = "Profile store unavailable")
    )
)]
pub async fn register_profile(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Json(payload): Json<RegisterProfileRequest>,
) -> Result<(StatusCode, Json<Profile>), AppError> {
    if payload.role == Role::Admin {
        return Err(AppError::Forbidden("admin profiles cannot be self-registered".to_string()));
    }

    let name = match payload.name.trim() {
        "" => principal.display_name.clone().unwrap_or_default(),
        name => name.to_string(),
    };

    let mut profile = Profile::new(principal.uid.clone(), payload.role);
    profile.name = name;
    profile.email = principal.email.clone();
    profile.phone = payload.phone;
    if payload.role == Role::Worker {
        profile.worker_service = payload.worker_service;
    }

    match state.repo.create_profile(profile).await? {
        Some(created) => {
            tracing::info!(uid = %created.id, role = %created.role, "profile registered");
            Ok((StatusCode::CREATED, Json(created)))
        }
        None => Err(AppError::Conflict(format!("profile {} already exists", principal.uid))),
    }
}

/// upload_image
///
/// [Authenticated Route] Accepts a multipart `file` field and hands it to the
/// configured image host. Any backend failure surfaces as a generic upload error.
#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = String, content_type = "multipart/form-data", description = "Image in a `file` field"),
    responses(
        (status = 200, description = "Uploaded", body = UploadResponse),
        (status = 400, description = "Missing or non-image file"),
        (status = 502, description = "Upload failed")
    )
)]
pub async fn upload_image(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        file = Some(UploadFile {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let file = file.ok_or_else(|| AppError::BadRequest("missing `file` field".to_string()))?;
    file.ensure_image()?;

    tracing::debug!(uid = %principal.uid, filename = %file.filename, "uploading image");
    let secure_url = state
        .uploads
        .upload_image(file, &state.config.upload.preset)
        .await?;

    Ok(Json(UploadResponse { secure_url }))
}

// --- Protected views ---

fn dashboard_title(path: &str) -> String {
    let mut segments = path.trim_matches('/').split('/');
    match (segments.next(), segments.next()) {
        (Some("admin"), Some(kind)) => format!("{} admin console", capitalize(kind)),
        (Some("worker"), Some(service)) => format!("{} worker dashboard", capitalize(service)),
        (Some("restaurant"), _) => "Restaurant dashboard".to_string(),
        (Some("homeowner"), _) => "My properties".to_string(),
        _ => "My bookings".to_string(),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// dashboard
///
/// [Protected View] Rendered only after the access guard granted the request; the
/// guard hands over the loaded profile as a request extension.
#[utoipa::path(
    get,
    path = "/customer/dashboard",
    responses(
        (status = 200, description = "Dashboard", body = DashboardView),
        (status = 202, description = "Profile still resolving", body = PlaceholderResponse),
        (status = 303, description = "Redirect to /login or /unauthorized")
    )
)]
pub async fn dashboard(
    OriginalUri(uri): OriginalUri,
    Extension(profile): Extension<Profile>,
) -> Json<DashboardView> {
    let name = if profile.name.is_empty() {
        profile.email.as_str()
    } else {
        profile.name.as_str()
    };

    Json(DashboardView {
        route: uri.path().to_string(),
        title: dashboard_title(uri.path()),
        greeting: format!("Welcome back, {}", name),
        role: profile.role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_follow_route_surface() {
        assert_eq!(dashboard_title("/admin/commerce"), "Commerce admin console");
        assert_eq!(dashboard_title("/worker/cab"), "Cab worker dashboard");
        assert_eq!(dashboard_title("/restaurant/dashboard"), "Restaurant dashboard");
        assert_eq!(dashboard_title("/homeowner/properties"), "My properties");
        assert_eq!(dashboard_title("/customer/dashboard"), "My bookings");
    }
}
