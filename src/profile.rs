/// Profile workflow shared by the HTTP handlers
///
/// This module provides the reusable pieces around the completion pipeline:
/// 1. Normalize the raw SCIM `/Me` resource into the portal profile shape
/// 2. Fetch schemas (cache-first, checksum-validated, breaker-guarded)
/// 3. Score the profile and wrap the result for the completion endpoint
/// 4. Validate contact attributes in update requests before they go upstream
use crate::cache_validator::ValidatedCacheEntry;
use crate::completion::compute_completion;
use crate::errors::{AppError, ResultExt};
use crate::handlers::AppState;
use crate::models::{
    CompletionResponse, MultiValue, Name, PrimaryEmail, ProfileSchema, ResponseMetadata,
};
use chrono::Utc;
use failsafe::futures::CircuitBreaker;
use phonenumber::Mode;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// SCIM enterprise user extension holding the organisation claim.
pub const ENTERPRISE_USER_SCHEMA: &str =
    "urn:ietf:params:scim:schemas:extension:enterprise:2.0:User";

/// Cache key under which the serialized schema document is stored.
const SCHEMA_CACHE_KEY: &str = "profile-schemas";

/// Applies portal defaults to a raw SCIM `/Me` resource.
///
/// Missing attributes get empty defaults so downstream consumers can rely
/// on the keys existing. `organisation` is lifted out of the enterprise
/// extension and `userImage` falls back to the profile URL. Fields present
/// in the raw resource always win over computed defaults.
pub fn normalize_profile(raw: &Value, response_status: u16) -> Value {
    let empty = Map::new();
    let raw_map = raw.as_object().unwrap_or(&empty);

    let organisation = raw_map
        .get(ENTERPRISE_USER_SCHEMA)
        .and_then(|extension| extension.get("organization"))
        .cloned()
        .unwrap_or_else(|| json!(""));

    let user_image = raw_map
        .get("userImage")
        .or_else(|| raw_map.get("profileUrl"))
        .cloned()
        .unwrap_or_else(|| json!(""));

    let mut profile = Map::new();
    profile.insert("emails".to_string(), json!(""));
    profile.insert("name".to_string(), json!(Name::default()));
    profile.insert("organisation".to_string(), organisation);
    profile.insert("phoneNumbers".to_string(), json!([]));
    profile.insert("profileUrl".to_string(), json!(""));
    profile.insert("responseStatus".to_string(), json!(response_status));
    profile.insert("roles".to_string(), json!([]));
    profile.insert("userImage".to_string(), user_image);
    profile.insert("userName".to_string(), json!(""));

    for (key, value) in raw_map {
        profile.insert(key.clone(), value.clone());
    }

    Value::Object(profile)
}

/// Returns the first entry of the `emails` attribute, handling both the
/// multi-value record and the plain string form.
pub fn extract_primary_email(profile: &Value) -> PrimaryEmail {
    let mut email = String::new();
    let mut type_ = String::new();

    if let Some(first) = profile.get("emails").and_then(|emails| emails.get(0)) {
        match first {
            Value::Object(record) => {
                email = record
                    .get("value")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                type_ = record
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
            }
            Value::String(address) => email = address.clone(),
            _ => {}
        }
    }

    PrimaryEmail { email, type_ }
}

/// Validate an email address
///
/// Checks for:
/// - Basic email format (contains @ and .)
/// - Minimum length requirements
/// - Valid domain structure
pub fn is_valid_email(email: &str) -> bool {
    // Basic checks
    if email.len() < 5 || !email.contains('@') || !email.contains('.') {
        return false;
    }

    // RFC 5322 simplified email regex
    // Matches: local@domain.tld
    let email_regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    if !email_regex.is_match(email) {
        tracing::warn!("Invalid email format: {}", email);
        return false;
    }

    true
}

/// Validate and normalize a phone number
///
/// Uses the phonenumber library (port of Google's libphonenumber) to:
/// - Parse the number; the identity server stores numbers in international
///   format, so the input must carry its country code
/// - Return the normalized E.164 form (+14155552671)
///
/// Returns: (is_valid, normalized_phone_or_error_msg)
pub fn validate_phone(raw: &str) -> (bool, String) {
    // Skip empty or very short strings
    if raw.trim().is_empty() || raw.len() < 8 {
        return (false, "Phone number too short".to_string());
    }

    match phonenumber::parse(None, raw) {
        Ok(number) => {
            if phonenumber::is_valid(&number) {
                let formatted = number.format().mode(Mode::E164).to_string();
                tracing::debug!("Valid phone number: {} -> {}", raw, formatted);
                (true, formatted)
            } else {
                tracing::warn!("Invalid phone number: {}", raw);
                (false, "Invalid phone number".to_string())
            }
        }
        Err(e) => {
            tracing::warn!("Failed to parse phone number '{}': {:?}", raw, e);
            (false, format!("Parse error: {:?}", e))
        }
    }
}

/// Rejects SCIM PatchOp requests carrying malformed contact attributes.
///
/// Walks every operation value and checks `emails` entries and
/// `phoneNumbers` values before the request is forwarded upstream.
pub fn validate_patch(patch: &Value) -> Result<(), AppError> {
    let operations = patch
        .get("Operations")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            AppError::BadRequest("Patch request must carry an 'Operations' array".to_string())
        })?;

    for operation in operations {
        if let Some(value) = operation.get("value") {
            validate_contact_attributes(value)?;
        }
    }

    Ok(())
}

fn validate_contact_attributes(value: &Value) -> Result<(), AppError> {
    if let Some(emails) = value.get("emails").and_then(Value::as_array) {
        for entry in emails {
            let address = match entry {
                Value::String(address) => Some(address.as_str()),
                Value::Object(record) => record.get("value").and_then(Value::as_str),
                _ => None,
            };

            if let Some(address) = address {
                if !address.is_empty() && !is_valid_email(address) {
                    return Err(AppError::BadRequest(format!(
                        "Invalid email address: {}",
                        address
                    )));
                }
            }
        }
    }

    if let Some(phones) = value.get("phoneNumbers").and_then(Value::as_array) {
        for entry in phones {
            let record: Option<MultiValue> = serde_json::from_value(entry.clone()).ok();
            if let Some(record) = record {
                if !record.value.is_empty() {
                    let (valid, detail) = validate_phone(&record.value);
                    if !valid {
                        return Err(AppError::BadRequest(format!(
                            "Invalid phone number '{}': {}",
                            record.value, detail
                        )));
                    }
                }
            }
        }
    }

    Ok(())
}

/// Returns the profile schemas, from cache when a valid entry exists.
///
/// Cached entries carry a checksum; corrupted entries are dropped and the
/// schemas fetched again. Upstream fetches go through the identity circuit
/// breaker. The second element of the pair reports whether the cache was
/// hit.
pub async fn fetch_schemas_cached(
    state: &Arc<AppState>,
) -> Result<(Vec<ProfileSchema>, bool), AppError> {
    if let Some(serialized) = state.schema_cache.get(SCHEMA_CACHE_KEY).await {
        match ValidatedCacheEntry::deserialize_and_validate(&serialized) {
            Some(document) => match serde_json::from_str::<Vec<ProfileSchema>>(&document) {
                Ok(schemas) => {
                    tracing::debug!("Using cached profile schemas");
                    return Ok((schemas, true));
                }
                Err(e) => {
                    tracing::warn!("Cached schema document no longer parses: {}", e);
                }
            },
            None => {
                tracing::warn!("Cached schema document failed checksum validation, refetching");
            }
        }
        state.schema_cache.invalidate(SCHEMA_CACHE_KEY).await;
    }

    let schemas = match state
        .identity_breaker
        .call(state.scim.get_profile_schemas())
        .await
    {
        Ok(schemas) => schemas,
        Err(failsafe::Error::Inner(e)) => return Err(e),
        Err(failsafe::Error::Rejected) => {
            return Err(AppError::ExternalApiError(
                "Identity server circuit is open, schema fetch rejected".to_string(),
            ))
        }
    };

    match serde_json::to_string(&schemas) {
        Ok(document) => {
            let entry = ValidatedCacheEntry::new(document);
            state
                .schema_cache
                .insert(SCHEMA_CACHE_KEY.to_string(), entry.serialize())
                .await;
        }
        Err(e) => {
            tracing::warn!("Failed to serialize schema document for caching: {}", e);
        }
    }

    Ok((schemas, false))
}

/// Fetches everything the completion widget needs and scores the profile.
///
/// The completion aggregate is returned to the caller; nothing is published
/// into shared state from here.
pub async fn fetch_profile_completion(
    state: &Arc<AppState>,
) -> Result<CompletionResponse, AppError> {
    let (schemas, schemas_from_cache) = fetch_schemas_cached(state).await?;

    let raw = state
        .scim
        .get_me()
        .await
        .context("Fetching profile for completion scoring")?;
    let profile = normalize_profile(&raw, 200);

    let completion = compute_completion(&profile, &schemas);

    tracing::info!(
        "Profile completion computed: {}% ({} of {} attributes)",
        completion.percentage,
        completion.required.completed_count + completion.optional.completed_count,
        completion.required.total_count + completion.optional.total_count
    );

    Ok(CompletionResponse {
        completion,
        metadata: ResponseMetadata {
            timestamp: Utc::now(),
            schema_count: schemas.len(),
            schemas_from_cache,
        },
    })
}
