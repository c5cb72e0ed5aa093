/// Unit tests for the profile completion pipeline
/// Tests schema flattening, profile flattening, and completion scoring
use rust_myaccount_api::completion::{compute_completion, flatten_profile, flatten_schemas};
use rust_myaccount_api::models::ProfileSchema;
use serde_json::{json, Value};

fn leaf(name: &str, display_name: &str, required: bool) -> ProfileSchema {
    ProfileSchema {
        name: name.to_string(),
        display_name: display_name.to_string(),
        required,
        ..ProfileSchema::default()
    }
}

fn container(name: &str, display_name: &str, sub_attributes: Vec<ProfileSchema>) -> ProfileSchema {
    ProfileSchema {
        name: name.to_string(),
        display_name: display_name.to_string(),
        sub_attributes: Some(sub_attributes),
        ..ProfileSchema::default()
    }
}

#[cfg(test)]
mod schema_flattening_tests {
    use super::*;

    #[test]
    fn test_qualified_naming() {
        let schemas = vec![container(
            "emails",
            "Email Addresses",
            vec![leaf("home", "Home Email", false)],
        )];

        let flattened = flatten_schemas(&schemas, None);

        assert_eq!(flattened.len(), 1);
        assert_eq!(flattened[0].name, "emails.home");
        // Display names are left unchanged
        assert_eq!(flattened[0].display_name, "Home Email");
    }

    #[test]
    fn test_containers_are_never_emitted() {
        let schemas = vec![
            leaf("userName", "Username", true),
            container(
                "name",
                "Name",
                vec![
                    leaf("givenName", "First Name", false),
                    leaf("familyName", "Last Name", false),
                ],
            ),
        ];

        let flattened = flatten_schemas(&schemas, None);

        assert_eq!(flattened.len(), 3);
        assert!(flattened.iter().all(|s| s.name != "name"));
    }

    #[test]
    fn test_flattening_preserves_leaf_count_and_order() {
        let schemas = vec![
            leaf("a", "A", false),
            container(
                "b",
                "B",
                vec![
                    leaf("x", "X", false),
                    container("y", "Y", vec![leaf("z", "Z", false)]),
                ],
            ),
            leaf("c", "C", false),
        ];

        let flattened = flatten_schemas(&schemas, None);

        let names: Vec<&str> = flattened.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b.x", "y.z", "c"]);
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        assert!(flatten_schemas(&[], None).is_empty());
    }

    #[test]
    fn test_schema_with_empty_sub_attributes_is_a_leaf() {
        let mut schema = leaf("nickName", "Nickname", false);
        schema.sub_attributes = Some(vec![]);

        let flattened = flatten_schemas(&[schema], None);

        assert_eq!(flattened.len(), 1);
        assert_eq!(flattened[0].name, "nickName");
    }
}

#[cfg(test)]
mod profile_flattening_tests {
    use super::*;

    #[test]
    fn test_multi_value_array_flattening() {
        let profile = json!({
            "phoneNumbers": [
                { "type": "mobile", "value": "123" },
                { "type": "home", "value": "456" }
            ]
        });

        let flattened = flatten_profile(&profile, None);

        assert_eq!(flattened.len(), 2);
        assert_eq!(flattened[0].name, "phoneNumbers.mobile");
        assert_eq!(flattened[0].value, json!("123"));
        assert_eq!(flattened[1].name, "phoneNumbers.home");
        assert_eq!(flattened[1].value, json!("456"));
    }

    #[test]
    fn test_scalar_array_joined_with_comma() {
        let profile = json!({ "emails": ["a@example.com", "b@example.com"] });

        let flattened = flatten_profile(&profile, None);

        assert_eq!(flattened.len(), 1);
        assert_eq!(flattened[0].name, "emails");
        assert_eq!(flattened[0].value, json!("a@example.com,b@example.com"));
    }

    #[test]
    fn test_nested_object_flattening() {
        let profile = json!({
            "name": { "givenName": "John", "familyName": "Doe" }
        });

        let flattened = flatten_profile(&profile, None);

        assert_eq!(flattened.len(), 2);
        assert!(flattened
            .iter()
            .any(|e| e.name == "name.givenName" && e.value == json!("John")));
        assert!(flattened
            .iter()
            .any(|e| e.name == "name.familyName" && e.value == json!("Doe")));
    }

    #[test]
    fn test_single_multi_value_record_at_root_keeps_its_key() {
        let profile = json!({ "email": { "type": "work", "value": "w@example.com" } });

        let flattened = flatten_profile(&profile, None);

        assert_eq!(flattened.len(), 1);
        assert_eq!(flattened[0].name, "email");
        assert_eq!(flattened[0].value, json!("w@example.com"));
    }

    #[test]
    fn test_metadata_keys_are_skipped() {
        let profile = json!({
            "userName": "jdoe",
            "associations": ["other-account"],
            "responseStatus": 200,
            "nested": { "responseStatus": 200, "city": "Colombo" }
        });

        let flattened = flatten_profile(&profile, None);

        let names: Vec<&str> = flattened.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["nested.city", "userName"]);
    }

    #[test]
    fn test_empty_array_yields_no_entries() {
        let profile = json!({ "roles": [] });

        assert!(flatten_profile(&profile, None).is_empty());
    }

    #[test]
    fn test_null_value_degrades_to_falsy_entry() {
        let profile = json!({ "nickName": null });

        let flattened = flatten_profile(&profile, None);

        assert_eq!(flattened.len(), 1);
        assert_eq!(flattened[0].name, "nickName");
        assert_eq!(flattened[0].value, Value::Null);
    }

    #[test]
    fn test_scalar_entries_pass_through() {
        let profile = json!({ "userName": "jdoe", "active": true });

        let flattened = flatten_profile(&profile, None);

        assert_eq!(flattened.len(), 2);
        assert!(flattened
            .iter()
            .any(|e| e.name == "userName" && e.value == json!("jdoe")));
        assert!(flattened
            .iter()
            .any(|e| e.name == "active" && e.value == json!(true)));
    }
}

#[cfg(test)]
mod completion_scoring_tests {
    use super::*;

    #[test]
    fn test_role_leaves_are_excluded_from_scoring() {
        let schemas = vec![
            leaf("userName", "Username", true),
            leaf("roles.default", "Role", false),
        ];
        let profile = json!({ "userName": "jdoe" });

        let completion = compute_completion(&profile, &schemas);

        assert_eq!(completion.required.total_count, 1);
        assert_eq!(completion.optional.total_count, 0);
        let all_names: Vec<&str> = completion
            .required
            .completed_attributes
            .iter()
            .chain(completion.required.incomplete_attributes.iter())
            .chain(completion.optional.completed_attributes.iter())
            .chain(completion.optional.incomplete_attributes.iter())
            .map(|a| a.name.as_str())
            .collect();
        assert!(!all_names.contains(&"roles.default"));
        assert_eq!(completion.percentage, 100);
    }

    #[test]
    fn test_percentage_rounds_up_to_the_next_decile() {
        // 5 of 7 -> 71.43 -> 72 -> 80
        let schemas: Vec<ProfileSchema> = (1..=7)
            .map(|i| leaf(&format!("attr{}", i), &format!("Attribute {}", i), true))
            .collect();
        let profile = json!({
            "attr1": "v", "attr2": "v", "attr3": "v", "attr4": "v", "attr5": "v"
        });

        let completion = compute_completion(&profile, &schemas);

        assert_eq!(completion.required.total_count, 7);
        assert_eq!(completion.required.completed_count, 5);
        assert_eq!(completion.percentage, 80);
    }

    #[test]
    fn test_empty_schema_list_guards_division_by_zero() {
        let profile = json!({ "userName": "jdoe" });

        let completion = compute_completion(&profile, &[]);

        assert_eq!(completion.percentage, 0);
        assert_eq!(completion.required.total_count, 0);
        assert_eq!(completion.optional.total_count, 0);
    }

    #[test]
    fn test_empty_matched_value_is_incomplete() {
        let schemas = vec![leaf("nickName", "Nickname", false)];
        let profile = json!({ "nickName": "" });

        let completion = compute_completion(&profile, &schemas);

        assert_eq!(completion.optional.completed_count, 0);
        assert_eq!(completion.optional.incomplete_attributes.len(), 1);
        assert_eq!(completion.optional.incomplete_attributes[0].name, "nickName");
    }

    #[test]
    fn test_unmatched_leaf_is_incomplete() {
        let schemas = vec![leaf("organisation", "Organisation", true)];
        let profile = json!({ "userName": "jdoe" });

        let completion = compute_completion(&profile, &schemas);

        assert_eq!(completion.required.completed_count, 0);
        assert_eq!(
            completion.required.incomplete_attributes[0].name,
            "organisation"
        );
        assert_eq!(completion.percentage, 0);
    }

    #[test]
    fn test_profile_url_completed_by_user_image() {
        // profileUrl itself is empty, but a userImage is present
        let schemas = vec![leaf("profileUrl", "Profile URL", false)];
        let profile = json!({ "profileUrl": "", "userImage": "data:image/png;base64,xyz" });

        let completion = compute_completion(&profile, &schemas);

        assert_eq!(completion.optional.completed_count, 1);
        assert_eq!(completion.optional.completed_attributes.len(), 1);
        // The pair is labelled as the profile image
        assert_eq!(
            completion.optional.completed_attributes[0].display_name,
            "Profile Image"
        );
        assert_eq!(completion.percentage, 100);
    }

    #[test]
    fn test_absent_profile_url_with_image_stays_out_of_both_lists() {
        let schemas = vec![leaf("profileUrl", "Profile URL", false)];
        let profile = json!({ "userImage": "https://img.example.com/u.png" });

        let completion = compute_completion(&profile, &schemas);

        // Counted toward the total, but treated as already handled
        assert_eq!(completion.optional.total_count, 1);
        assert!(completion.optional.completed_attributes.is_empty());
        assert!(completion.optional.incomplete_attributes.is_empty());
    }

    #[test]
    fn test_absent_profile_url_without_image_is_incomplete() {
        let schemas = vec![leaf("profileUrl", "Profile URL", false)];
        let profile = json!({ "userName": "jdoe" });

        let completion = compute_completion(&profile, &schemas);

        assert_eq!(completion.optional.incomplete_attributes.len(), 1);
        assert_eq!(
            completion.optional.incomplete_attributes[0].display_name,
            "Profile Image"
        );
    }

    #[test]
    fn test_nested_schema_leaves_match_flattened_profile_entries() {
        let schemas = vec![container(
            "name",
            "Name",
            vec![
                leaf("givenName", "First Name", true),
                leaf("familyName", "Last Name", true),
            ],
        )];
        let profile = json!({ "name": { "givenName": "John" } });

        let completion = compute_completion(&profile, &schemas);

        assert_eq!(completion.required.total_count, 2);
        assert_eq!(completion.required.completed_count, 1);
        assert_eq!(
            completion.required.completed_attributes[0].name,
            "name.givenName"
        );
        assert_eq!(
            completion.required.incomplete_attributes[0].name,
            "name.familyName"
        );
        // 1 of 2 -> 50
        assert_eq!(completion.percentage, 50);
    }

    #[test]
    fn test_multi_valued_phone_satisfies_typed_leaf() {
        let schemas = vec![container(
            "phoneNumbers",
            "Phone Numbers",
            vec![leaf("mobile", "Mobile Number", false)],
        )];
        let profile = json!({
            "phoneNumbers": [{ "type": "mobile", "value": "+14155552671" }]
        });

        let completion = compute_completion(&profile, &schemas);

        assert_eq!(completion.optional.completed_count, 1);
        assert_eq!(
            completion.optional.completed_attributes[0].name,
            "phoneNumbers.mobile"
        );
    }

    #[test]
    fn test_computation_is_idempotent() {
        let schemas = vec![
            leaf("userName", "Username", true),
            container(
                "name",
                "Name",
                vec![
                    leaf("givenName", "First Name", false),
                    leaf("familyName", "Last Name", false),
                ],
            ),
            leaf("profileUrl", "Profile URL", false),
        ];
        let profile = json!({
            "userName": "jdoe",
            "name": { "givenName": "John" },
            "userImage": "https://img.example.com/u.png"
        });

        let first = compute_completion(&profile, &schemas);
        let second = compute_completion(&profile, &schemas);

        assert_eq!(first, second);
    }
}
