use crate::errors::AppError;
use crate::models::ProfileSchema;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tracing;

/// SCIM2 media type used by the identity server.
const SCIM_CONTENT_TYPE: &str = "application/scim+json";

const SCIM_ME_PATH: &str = "/scim2/Me";
const SCIM_SCHEMAS_PATH: &str = "/scim2/Schemas";

/// Schema URN carried by SCIM PatchOp messages.
pub const PATCH_OP_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

/// Client for the identity server's SCIM2 endpoints.
#[derive(Clone)]
pub struct ScimClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl ScimClient {
    /// Creates a new `ScimClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the identity server.
    /// * `token` - The bearer token for authentication.
    pub fn new(base_url: String, token: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create SCIM client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// Retrieves the profile of the currently authenticated user.
    ///
    /// # Returns
    ///
    /// * `Result<Value, AppError>` - The raw SCIM user resource.
    pub async fn get_me(&self) -> Result<Value, AppError> {
        let url = format!("{}{}", self.base_url, SCIM_ME_PATH);
        tracing::info!("Fetching user profile from {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", SCIM_CONTENT_TYPE)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("SCIM request failed: {}", e)))?;

        let response = self.ensure_success(response, "profile fetch").await?;

        let profile = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse SCIM profile response: {}", e))
        })?;

        Ok(profile)
    }

    /// Applies a SCIM PatchOp to the authenticated user's profile.
    ///
    /// # Arguments
    ///
    /// * `patch` - A SCIM PatchOp message with an `Operations` array.
    ///
    /// # Returns
    ///
    /// * `Result<Value, AppError>` - The updated SCIM user resource.
    pub async fn update_me(&self, patch: &Value) -> Result<Value, AppError> {
        let url = format!("{}{}", self.base_url, SCIM_ME_PATH);
        tracing::info!("Updating user profile at {}", url);

        let response = self
            .client
            .patch(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", SCIM_CONTENT_TYPE)
            .json(patch)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("SCIM request failed: {}", e)))?;

        let response = self.ensure_success(response, "profile update").await?;

        let updated = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse SCIM update response: {}", e))
        })?;

        tracing::info!("Profile updated successfully");
        Ok(updated)
    }

    /// Replaces the authenticated user's profile image URL.
    ///
    /// # Arguments
    ///
    /// * `image_url` - The new image URL.
    pub async fn update_profile_image(&self, image_url: &str) -> Result<Value, AppError> {
        let patch = json!({
            "Operations": [
                {
                    "op": "replace",
                    "value": {
                        "profileUrl": image_url
                    }
                }
            ],
            "schemas": [PATCH_OP_SCHEMA]
        });

        self.update_me(&patch).await
    }

    /// Retrieves the profile attribute schemas.
    ///
    /// The identity server answers with a list of schema resources; the
    /// first resource's `attributes` array describes the user profile.
    ///
    /// # Returns
    ///
    /// * `Result<Vec<ProfileSchema>, AppError>` - The top-level attribute schemas.
    pub async fn get_profile_schemas(&self) -> Result<Vec<ProfileSchema>, AppError> {
        let url = format!("{}{}", self.base_url, SCIM_SCHEMAS_PATH);
        tracing::info!("Fetching profile schemas from {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", SCIM_CONTENT_TYPE)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("SCIM request failed: {}", e)))?;

        let response = self.ensure_success(response, "schema fetch").await?;

        let body: Value = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse SCIM schema response: {}", e))
        })?;

        let attributes = body
            .get(0)
            .and_then(|resource| resource.get("attributes"))
            .cloned()
            .ok_or_else(|| {
                AppError::ExternalApiError(
                    "Schema response missing an 'attributes' array".to_string(),
                )
            })?;

        let schemas: Vec<ProfileSchema> = serde_json::from_value(attributes).map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse schema attributes: {}", e))
        })?;

        tracing::info!("Fetched {} top-level profile schemas", schemas.len());
        Ok(schemas)
    }

    /// Maps non-success statuses to the appropriate `AppError`.
    async fn ensure_success(
        &self,
        response: reqwest::Response,
        operation: &str,
    ) -> Result<reqwest::Response, AppError> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AppError::Unauthorized(format!(
                "Identity server rejected the {} request",
                operation
            )));
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            // The identity server answers 500 when SCIM is disabled for the
            // user store.
            if status == StatusCode::INTERNAL_SERVER_ERROR {
                return Err(AppError::ExternalApiError(format!(
                    "{} failed with 500 (SCIM may be disabled for the user store): {}",
                    operation, error_text
                )));
            }

            return Err(AppError::ExternalApiError(format!(
                "{} returned {}: {}",
                operation, status, error_text
            )));
        }

        Ok(response)
    }
}
