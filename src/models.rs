use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============ SCIM Wire Models ============

/// One instance of a repeatable attribute, e.g. a phone number with a label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MultiValue {
    /// Label of the instance (e.g. "mobile", "home").
    #[serde(rename = "type")]
    pub type_: String,
    /// The attribute value itself.
    pub value: String,
}

/// Name component of a user profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Name {
    /// Given (first) name.
    #[serde(default)]
    pub given_name: String,
    /// Family (last) name.
    #[serde(default)]
    pub family_name: String,
}

/// One declarable profile attribute, as served by the identity server's
/// schema endpoint. Unknown SCIM fields are ignored on deserialize.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSchema {
    /// Attribute identifier, unique among siblings.
    pub name: String,
    /// Human-readable label.
    #[serde(default)]
    pub display_name: String,
    /// Description of the attribute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Display ordering hint for UIs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<String>,
    /// SCIM mutability (e.g. "readWrite", "readOnly").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutability: Option<String>,
    /// SCIM attribute type (e.g. "string", "complex").
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    /// Whether the attribute holds multiple values.
    #[serde(default)]
    pub multi_valued: bool,
    /// Whether the attribute must be present for a complete profile.
    #[serde(default)]
    pub required: bool,
    /// Sub attributes; presence means this schema is a container, not a leaf.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_attributes: Option<Vec<ProfileSchema>>,
}

/// Primary email address extracted from the profile's `emails` attribute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrimaryEmail {
    /// The email address; empty when the profile carries none.
    pub email: String,
    /// Label of the address, when the entry was a multi-value record.
    #[serde(rename = "type")]
    pub type_: String,
}

// ============ Completion Models ============

/// Attribute entry recorded as completed or incomplete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileAttribute {
    /// Human-readable label.
    pub display_name: String,
    /// Flattened (qualified) attribute name.
    pub name: String,
}

/// Completion tally for one partition (required or optional attributes).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileCompletionResult {
    /// Attributes with a non-empty value.
    pub completed_attributes: Vec<ProfileAttribute>,
    /// Number of completed attributes.
    pub completed_count: usize,
    /// Attributes still missing a value.
    pub incomplete_attributes: Vec<ProfileAttribute>,
    /// Number of schema leaves counted in this partition.
    pub total_count: usize,
}

/// Profile completion aggregate handed to UI widgets.
///
/// `Default` yields the empty aggregate: zero counts, empty lists, 0%.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileCompletion {
    /// Tally over optional schema attributes.
    pub optional: ProfileCompletionResult,
    /// Tally over required schema attributes.
    pub required: ProfileCompletionResult,
    /// Decile-rounded overall completion percentage.
    pub percentage: u32,
}

// ============ API Response Models ============

/// Response payload for the completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The computed completion aggregate.
    pub completion: ProfileCompletion,
    /// Metadata about the response.
    pub metadata: ResponseMetadata,
}

/// Metadata describing how a completion response was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    /// Time the completion was computed.
    pub timestamp: DateTime<Utc>,
    /// Number of top-level schemas consulted.
    pub schema_count: usize,
    /// Whether the schema list came from the cache.
    pub schemas_from_cache: bool,
}
