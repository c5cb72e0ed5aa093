use crate::circuit_breaker::IdentityCircuitBreaker;
use crate::config::Config;
use crate::errors::AppError;
use crate::help::{HelpDocument, HelpService};
use crate::models::{CompletionResponse, ProfileSchema};
use crate::profile;
use crate::scim_client::ScimClient;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use moka::future::Cache;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Shared application state injected into handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Client for the identity server's SCIM endpoints.
    pub scim: ScimClient,
    /// Serialized, checksum-guarded profile schema document.
    pub schema_cache: Cache<String, String>,
    /// Transformed help documents keyed by locale.
    pub help_cache: Cache<String, HelpDocument>,
    /// Circuit breaker for identity server schema fetches.
    pub identity_breaker: IdentityCircuitBreaker,
}

/// Health check endpoint.
///
/// Returns the service status, version, and health information.
///
/// # Returns
///
/// * `(StatusCode, Json<serde_json::Value>)` - HTTP 200 OK with health status JSON.
pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-myaccount-api",
            "version": "0.1.0"
        })),
    )
}

/// GET /api/v1/me/profile
///
/// Returns the authenticated user's profile, normalized into the portal
/// shape (defaults applied, organisation lifted out of the enterprise
/// extension).
pub async fn get_profile(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    tracing::info!("GET /me/profile");

    let raw = state.scim.get_me().await?;
    let normalized = profile::normalize_profile(&raw, 200);

    let primary = profile::extract_primary_email(&normalized);
    tracing::debug!(
        "Profile fetched (primary email present: {}, type: '{}')",
        !primary.email.is_empty(),
        primary.type_
    );

    Ok(Json(normalized))
}

/// PATCH /api/v1/me/profile
///
/// Forwards a SCIM PatchOp to the identity server after validating the
/// contact attributes it carries.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `patch` - The SCIM PatchOp message.
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, AppError> {
    tracing::info!("PATCH /me/profile");

    profile::validate_patch(&patch)?;

    let updated = state.scim.update_me(&patch).await?;

    tracing::info!("Profile update forwarded successfully");
    Ok(Json(profile::normalize_profile(&updated, 200)))
}

/// Request payload for the profile image endpoint.
#[derive(Debug, Deserialize)]
pub struct ProfileImageRequest {
    /// Absolute URL of the new profile image.
    pub url: String,
}

/// PUT /api/v1/me/profile/image
///
/// Replaces the user's profile image URL.
pub async fn update_profile_image(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProfileImageRequest>,
) -> Result<Json<Value>, AppError> {
    tracing::info!("PUT /me/profile/image");

    if !request.url.starts_with("http://") && !request.url.starts_with("https://") {
        return Err(AppError::BadRequest(
            "Image URL must be an absolute http(s) URL".to_string(),
        ));
    }

    let updated = state.scim.update_profile_image(&request.url).await?;

    Ok(Json(profile::normalize_profile(&updated, 200)))
}

/// GET /api/v1/me/profile/completion
///
/// Computes the profile completion summary for the authenticated user.
///
/// # Returns
///
/// * `Result<Json<CompletionResponse>, AppError>` - The completion aggregate
///   with response metadata.
pub async fn get_completion(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CompletionResponse>, AppError> {
    tracing::info!("GET /me/profile/completion");

    let response = profile::fetch_profile_completion(&state).await?;

    Ok(Json(response))
}

/// GET /api/v1/schemas
///
/// Returns the identity server's profile attribute schemas (cached).
pub async fn get_schemas(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ProfileSchema>>, AppError> {
    let (schemas, from_cache) = profile::fetch_schemas_cached(&state).await?;

    tracing::info!(
        "Returning {} profile schemas (cached: {})",
        schemas.len(),
        from_cache
    );
    Ok(Json(schemas))
}

/// GET /api/v1/help/:locale
///
/// Returns the transformed help document for a locale, falling back to
/// en-US when the locale has none.
pub async fn get_help(
    State(state): State<Arc<AppState>>,
    Path(locale): Path<String>,
) -> Result<Json<HelpDocument>, AppError> {
    tracing::info!("GET /help/{}", locale);

    if locale.is_empty()
        || !locale
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::BadRequest(format!("Invalid locale '{}'", locale)));
    }

    if let Some(document) = state.help_cache.get(&locale).await {
        tracing::debug!("Using cached help document for {}", locale);
        return Ok(Json(document));
    }

    let help = HelpService::new(&state.config)?;
    let document = help.fetch_document(&locale).await?;
    state.help_cache.insert(locale, document.clone()).await;

    Ok(Json(document))
}
