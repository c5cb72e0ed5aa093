/// Profile completion pipeline
///
/// Three pure passes over data fetched from the identity server:
/// 1. Flatten the nested attribute schemas into qualified leaves
/// 2. Flatten the user's profile value tree into qualified name/value pairs
/// 3. Join the two by qualified name and derive the completion summary
///
/// Nothing here performs I/O or touches shared state; callers decide where
/// the resulting aggregate goes.
use std::collections::HashMap;

use serde_json::Value;

use crate::models::{ProfileAttribute, ProfileCompletion, ProfileSchema};

/// Profile keys that are response metadata, not schema-backed attributes.
const EXCLUDED_PROFILE_KEYS: [&str; 2] = ["associations", "responseStatus"];

/// The attribute holding the profile image URL. Completion-wise it is also
/// satisfied by a non-empty `userImage` on the profile root.
const PROFILE_URL_ATTRIBUTE: &str = "profileUrl";

/// Label shown for the profile image attribute in completion lists.
const PROFILE_IMAGE_DISPLAY_NAME: &str = "Profile Image";

/// Schema leaves with this display name are excluded from scoring.
const ROLE_DISPLAY_NAME: &str = "Role";

/// One flattened profile entry: a qualified attribute name and its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenedAttribute {
    /// Qualified name, e.g. `phoneNumbers.mobile` or `name.givenName`.
    pub name: String,
    /// The scalar value found at that position.
    pub value: Value,
}

/// Shape of one profile value, decided once per entry before flattening.
#[derive(Debug)]
enum ValueShape<'a> {
    /// Sequence whose first element is a plain string; joined into one value.
    ScalarList(&'a [Value]),
    /// Sequence of records or objects; recursed element by element.
    RecordList,
    /// `{type, value}` record; keyed by its `type` under a parent.
    MultiValue {
        type_: &'a str,
        value: Option<&'a Value>,
    },
    /// Plain nested object; recursed with a qualified parent name.
    Nested,
    /// Scalar (string, number, bool or null); emitted as-is.
    Scalar(&'a Value),
}

fn classify(value: &Value) -> ValueShape<'_> {
    match value {
        Value::Array(items) => match items.first() {
            Some(Value::String(_)) => ValueShape::ScalarList(items),
            _ => ValueShape::RecordList,
        },
        Value::Object(record) => match record.get("type").and_then(Value::as_str) {
            Some(type_) => ValueShape::MultiValue {
                type_,
                value: record.get("value"),
            },
            None => ValueShape::Nested,
        },
        scalar => ValueShape::Scalar(scalar),
    }
}

/// Extracts the sub attributes from the schemas and appends them to the
/// returned list, so that callers can iterate a single flat structure.
///
/// Container schemas themselves are never emitted; each leaf under a
/// container is renamed to `parent.leaf`. Display names are untouched and
/// the output follows the input's depth-first order.
///
/// # Arguments
///
/// * `schemas` - Attribute schemas as served by the identity server.
/// * `parent_name` - Name of the parent attribute, for recursive calls.
pub fn flatten_schemas(schemas: &[ProfileSchema], parent_name: Option<&str>) -> Vec<ProfileSchema> {
    let mut flattened = Vec::new();

    for schema in schemas {
        match schema.sub_attributes.as_deref() {
            Some(sub_attributes) if !sub_attributes.is_empty() => {
                flattened.extend(flatten_schemas(sub_attributes, Some(&schema.name)));
            }
            _ => {
                let mut leaf = schema.clone();
                if let Some(parent) = parent_name {
                    leaf.name = format!("{}.{}", parent, leaf.name);
                }
                flattened.push(leaf);
            }
        }
    }

    flattened
}

/// Flattens a profile value tree into qualified name/value pairs.
///
/// String sequences are joined with `,` into a single entry; `{type, value}`
/// records key themselves by `type` under their parent attribute; nested
/// objects and record sequences are recursed. The `associations` and
/// `responseStatus` keys are metadata and never emitted. Absent or null
/// fields degrade to entries with a falsy value; no input shape is an error.
///
/// # Arguments
///
/// * `profile` - The profile value tree (or a subtree during recursion).
/// * `parent_name` - Qualified name of the enclosing attribute.
pub fn flatten_profile(profile: &Value, parent_name: Option<&str>) -> Vec<FlattenedAttribute> {
    let mut flattened = Vec::new();

    match profile {
        Value::Object(map) => {
            for (key, value) in map {
                flatten_entry(key, value, parent_name, &mut flattened);
            }
        }
        // Recursing into a record sequence keys elements by index, the same
        // way object entries are keyed by name.
        Value::Array(items) => {
            for (index, value) in items.iter().enumerate() {
                flatten_entry(&index.to_string(), value, parent_name, &mut flattened);
            }
        }
        _ => {}
    }

    flattened
}

fn flatten_entry(
    key: &str,
    value: &Value,
    parent_name: Option<&str>,
    out: &mut Vec<FlattenedAttribute>,
) {
    if EXCLUDED_PROFILE_KEYS.contains(&key) {
        return;
    }

    let qualified = match parent_name {
        Some(parent) => format!("{}.{}", parent, key),
        None => key.to_string(),
    };

    match classify(value) {
        ValueShape::ScalarList(items) => {
            let joined = items.iter().map(scalar_text).collect::<Vec<_>>().join(",");
            out.push(FlattenedAttribute {
                name: qualified,
                value: Value::String(joined),
            });
        }
        ValueShape::RecordList | ValueShape::Nested => {
            out.extend(flatten_profile(value, Some(&qualified)));
        }
        ValueShape::MultiValue {
            type_,
            value: record_value,
        } => {
            let name = match parent_name {
                Some(parent) => format!("{}.{}", parent, type_),
                None => key.to_string(),
            };
            out.push(FlattenedAttribute {
                name,
                value: record_value.cloned().unwrap_or(Value::Null),
            });
        }
        ValueShape::Scalar(scalar) => {
            out.push(FlattenedAttribute {
                name: qualified,
                value: scalar.clone(),
            });
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Whether a flattened value counts as filled in.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(filled) => *filled,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(true),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Whether the profile carries an image, either as a profile URL or an
/// inline `userImage` value.
fn has_profile_image(profile: &Value) -> bool {
    let non_empty = |key: &str| {
        profile
            .get(key)
            .and_then(Value::as_str)
            .map(|text| !text.is_empty())
            .unwrap_or(false)
    };

    non_empty(PROFILE_URL_ATTRIBUTE) || non_empty("userImage")
}

/// Raw completion ratio rounded up to the nearest decile, with an explicit
/// guard for an empty schema set.
fn completion_percentage(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }

    let raw = (completed as f64 / total as f64) * 100.0;
    ((raw.ceil() / 10.0).ceil() * 10.0) as u32
}

/// Calculates the profile completion summary.
///
/// Each schema leaf is classified as required or optional and as completed
/// or incomplete by looking its qualified name up in the flattened profile.
/// Leaves labelled `Role` are excluded from scoring entirely. The
/// `profileUrl` leaf is additionally considered complete whenever the
/// profile carries an image, whether or not a flattened entry matched.
///
/// Malformed or partially absent profile data classifies as incomplete;
/// this function never fails. The result is returned to the caller, which
/// decides whether and where to publish it.
///
/// # Arguments
///
/// * `profile` - The user's profile value tree.
/// * `schemas` - Attribute schemas as served by the identity server.
pub fn compute_completion(profile: &Value, schemas: &[ProfileSchema]) -> ProfileCompletion {
    let mut completion = ProfileCompletion::default();

    let entries = flatten_profile(profile, None);
    // One lookup table instead of rescanning the entries per leaf; the first
    // occurrence wins when a qualified name repeats.
    let mut values_by_name: HashMap<&str, &Value> = HashMap::with_capacity(entries.len());
    for entry in &entries {
        values_by_name
            .entry(entry.name.as_str())
            .or_insert(&entry.value);
    }

    let image_present = has_profile_image(profile);

    for schema in flatten_schemas(schemas, None) {
        // Skip roles
        if schema.display_name == ROLE_DISPLAY_NAME {
            continue;
        }

        let attribute = ProfileAttribute {
            display_name: if schema.name == PROFILE_URL_ATTRIBUTE {
                PROFILE_IMAGE_DISPLAY_NAME.to_string()
            } else {
                schema.display_name.clone()
            },
            name: schema.name.clone(),
        };

        let partition = if schema.required {
            &mut completion.required
        } else {
            &mut completion.optional
        };
        partition.total_count += 1;

        match values_by_name.get(schema.name.as_str()) {
            Some(value) => {
                if is_truthy(value) || (schema.name == PROFILE_URL_ATTRIBUTE && image_present) {
                    partition.completed_count += 1;
                    partition.completed_attributes.push(attribute);
                } else {
                    partition.incomplete_attributes.push(attribute);
                }
            }
            None => {
                // An unmatched profileUrl with an image elsewhere on the
                // profile is treated as handled: it stays out of both lists
                // while still counting toward the partition total.
                if schema.name != PROFILE_URL_ATTRIBUTE || !image_present {
                    partition.incomplete_attributes.push(attribute);
                }
            }
        }
    }

    completion.percentage = completion_percentage(
        completion.required.completed_count + completion.optional.completed_count,
        completion.required.total_count + completion.optional.total_count,
    );

    completion
}
