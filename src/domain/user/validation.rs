//! User record and search query validation
//!
//! Everything a client sends is checked against the field catalogue before
//! it reaches the store: unknown fields (nested ones included) are always
//! rejected, and every supplied value must satisfy its field's type, length,
//! or range rule. The store's unique index covers the one constraint that
//! cannot be checked here.

use serde_json::Value;
use thiserror::Error;

use super::document::Document;
use super::fields::{resolve, FieldRule};

/// Which operation a record is being validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Full record for insertion; `username` required.
    Create,
    /// Full replacement payload; `username` required.
    Replace,
    /// Partial update; no field required, `null` removes a field.
    Patch,
}

/// A structured validation failure naming the offending field.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Field 'username' is required")]
    MissingUsername,

    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("Field '{field}' must be a {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("Field '{field}' exceeds maximum length of {max} characters")]
    TooLong { field: String, max: usize },

    #[error("Field '{field}' must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("Field '{field}' must be one of: {allowed}")]
    InvalidEnumValue { field: String, allowed: String },
}

/// Validate a full or partial user record for the given operation.
///
/// Keys may be dotted paths (`"name.last"`); they are resolved against the
/// nested field catalogue the same way plain keys are.
pub fn validate_record(doc: &Document, mode: ValidationMode) -> Result<(), ValidationError> {
    if mode != ValidationMode::Patch {
        match doc.get("username") {
            Some(Value::String(username)) if !username.is_empty() => {}
            _ => return Err(ValidationError::MissingUsername),
        }
    }

    let allow_null = mode == ValidationMode::Patch;
    for (path, value) in doc {
        validate_path(path, value, allow_null)?;
    }

    Ok(())
}

/// Validate a search query: known fields only, values of the right type.
pub fn validate_query(query: &Document) -> Result<(), ValidationError> {
    for (path, value) in query {
        validate_path(path, value, false)?;
    }
    Ok(())
}

fn validate_path(path: &str, value: &Value, allow_null: bool) -> Result<(), ValidationError> {
    let rule = resolve(path).ok_or_else(|| ValidationError::UnknownField(path.to_string()))?;
    validate_value(path, value, rule, allow_null)
}

fn validate_value(
    path: &str,
    value: &Value,
    rule: &FieldRule,
    allow_null: bool,
) -> Result<(), ValidationError> {
    if value.is_null() {
        if allow_null {
            // null in a patch removes the field
            return Ok(());
        }
        return Err(wrong_type(path, rule));
    }

    match rule {
        FieldRule::Str { max_len } => {
            let text = value.as_str().ok_or_else(|| wrong_type(path, rule))?;
            if text.chars().count() > *max_len {
                return Err(ValidationError::TooLong {
                    field: path.to_string(),
                    max: *max_len,
                });
            }
            Ok(())
        }
        FieldRule::Int { min, max } => {
            let number = value.as_i64().ok_or_else(|| wrong_type(path, rule))?;
            if number < *min || number > *max {
                return Err(ValidationError::OutOfRange {
                    field: path.to_string(),
                    min: *min,
                    max: *max,
                });
            }
            Ok(())
        }
        FieldRule::Enum { allowed } => {
            let text = value.as_str().ok_or_else(|| wrong_type(path, rule))?;
            if !allowed.contains(&text) {
                return Err(ValidationError::InvalidEnumValue {
                    field: path.to_string(),
                    allowed: allowed.join(", "),
                });
            }
            Ok(())
        }
        FieldRule::Object { fields } => {
            let inner = value.as_object().ok_or_else(|| wrong_type(path, rule))?;
            for (key, inner_value) in inner {
                let inner_path = format!("{path}.{key}");
                let inner_rule = fields
                    .iter()
                    .find(|(name, _)| name == key)
                    .map(|(_, rule)| rule)
                    .ok_or_else(|| ValidationError::UnknownField(inner_path.clone()))?;
                // null removal only works at the paths a patch names; a null
                // buried inside an object value would be stored verbatim
                validate_value(&inner_path, inner_value, inner_rule, false)?;
            }
            Ok(())
        }
    }
}

fn wrong_type(path: &str, rule: &FieldRule) -> ValidationError {
    let expected = match rule {
        FieldRule::Str { .. } | FieldRule::Enum { .. } => "string",
        FieldRule::Int { .. } => "integer",
        FieldRule::Object { .. } => "object",
    };
    ValidationError::WrongType {
        field: path.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().expect("test doc must be an object").clone()
    }

    #[test]
    fn test_valid_full_record() {
        let user = doc(json!({
            "username": "tinywolf709",
            "gender": "female",
            "name": {"title": "miss", "first": "alison", "last": "reid"},
            "location": {"street": "1097 the avenue", "city": "Newbridge", "state": "ohio", "zip": 28782},
            "email": "alison.reid@example.com",
            "registered": 1237176893,
            "dob": 932871968,
            "phone": "031-541-9181",
            "cell": "081-647-4650",
            "PPS": "3302243T",
            "picture": {"large": "https://example.com/60.jpg"}
        }));
        assert!(validate_record(&user, ValidationMode::Create).is_ok());
    }

    #[test]
    fn test_create_requires_username() {
        let user = doc(json!({"gender": "male"}));
        assert_eq!(
            validate_record(&user, ValidationMode::Create),
            Err(ValidationError::MissingUsername)
        );
        assert_eq!(
            validate_record(&user, ValidationMode::Replace),
            Err(ValidationError::MissingUsername)
        );
    }

    #[test]
    fn test_empty_or_non_string_username_counts_as_missing() {
        let empty = doc(json!({"username": ""}));
        assert_eq!(
            validate_record(&empty, ValidationMode::Create),
            Err(ValidationError::MissingUsername)
        );

        let numeric = doc(json!({"username": 42}));
        assert_eq!(
            validate_record(&numeric, ValidationMode::Create),
            Err(ValidationError::MissingUsername)
        );
    }

    #[test]
    fn test_patch_requires_no_field() {
        let patch = doc(json!({"gender": "male"}));
        assert!(validate_record(&patch, ValidationMode::Patch).is_ok());
    }

    #[test]
    fn test_unknown_top_level_field() {
        let user = doc(json!({"username": "bob", "foo": "bar"}));
        assert_eq!(
            validate_record(&user, ValidationMode::Create),
            Err(ValidationError::UnknownField("foo".to_string()))
        );
    }

    #[test]
    fn test_unknown_nested_field() {
        let user = doc(json!({"username": "bob", "name": {"middle": "x"}}));
        assert_eq!(
            validate_record(&user, ValidationMode::Create),
            Err(ValidationError::UnknownField("name.middle".to_string()))
        );
    }

    #[test]
    fn test_unknown_field_rejected_under_patch_too() {
        let patch = doc(json!({"nickname": "bobby"}));
        assert_eq!(
            validate_record(&patch, ValidationMode::Patch),
            Err(ValidationError::UnknownField("nickname".to_string()))
        );
    }

    #[test]
    fn test_unknown_dotted_path() {
        let patch = doc(json!({"name.middle": "x"}));
        assert_eq!(
            validate_record(&patch, ValidationMode::Patch),
            Err(ValidationError::UnknownField("name.middle".to_string()))
        );
    }

    #[test]
    fn test_dotted_path_leaf_accepted() {
        let patch = doc(json!({"name.last": "smith", "location.zip": 12345}));
        assert!(validate_record(&patch, ValidationMode::Patch).is_ok());
    }

    #[test]
    fn test_wrong_type() {
        let user = doc(json!({"username": "bob", "email": 5}));
        assert_eq!(
            validate_record(&user, ValidationMode::Create),
            Err(ValidationError::WrongType {
                field: "email".to_string(),
                expected: "string"
            })
        );

        let user = doc(json!({"username": "bob", "name": "flat"}));
        assert_eq!(
            validate_record(&user, ValidationMode::Create),
            Err(ValidationError::WrongType {
                field: "name".to_string(),
                expected: "object"
            })
        );
    }

    #[test]
    fn test_zip_range() {
        let low = doc(json!({"username": "bob", "location": {"zip": -1}}));
        let high = doc(json!({"username": "bob", "location": {"zip": 100000}}));
        for user in [low, high] {
            assert_eq!(
                validate_record(&user, ValidationMode::Create),
                Err(ValidationError::OutOfRange {
                    field: "location.zip".to_string(),
                    min: 0,
                    max: 99_999
                })
            );
        }

        let edge = doc(json!({"username": "bob", "location": {"zip": 99999}}));
        assert!(validate_record(&edge, ValidationMode::Create).is_ok());
    }

    #[test]
    fn test_timestamps_must_be_non_negative() {
        let user = doc(json!({"username": "bob", "dob": -5}));
        assert!(matches!(
            validate_record(&user, ValidationMode::Create),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_gender_enum() {
        let user = doc(json!({"username": "bob", "gender": "other"}));
        assert_eq!(
            validate_record(&user, ValidationMode::Create),
            Err(ValidationError::InvalidEnumValue {
                field: "gender".to_string(),
                allowed: "male, female".to_string()
            })
        );
    }

    #[test]
    fn test_string_length_bound() {
        let user = doc(json!({"username": "bob", "name": {"first": "a".repeat(51)}}));
        assert_eq!(
            validate_record(&user, ValidationMode::Create),
            Err(ValidationError::TooLong {
                field: "name.first".to_string(),
                max: 50
            })
        );
    }

    #[test]
    fn test_null_removes_only_under_patch() {
        let patch = doc(json!({"gender": null}));
        assert!(validate_record(&patch, ValidationMode::Patch).is_ok());

        let create = doc(json!({"username": "bob", "gender": null}));
        assert!(matches!(
            validate_record(&create, ValidationMode::Create),
            Err(ValidationError::WrongType { .. })
        ));
    }

    #[test]
    fn test_null_inside_object_value_rejected_under_patch() {
        // removal must use the dotted form ("location.street": null); a null
        // nested inside a whole-object value would be persisted as-is
        let patch = doc(json!({"location": {"street": null}}));
        assert_eq!(
            validate_record(&patch, ValidationMode::Patch),
            Err(ValidationError::WrongType {
                field: "location.street".to_string(),
                expected: "string"
            })
        );

        let dotted = doc(json!({"location.street": null}));
        assert!(validate_record(&dotted, ValidationMode::Patch).is_ok());
    }

    #[test]
    fn test_query_validation() {
        assert!(validate_query(&doc(json!({"gender": "female"}))).is_ok());
        assert!(validate_query(&doc(json!({"name.last": "reid"}))).is_ok());

        assert_eq!(
            validate_query(&doc(json!({"favourite_color": "red"}))),
            Err(ValidationError::UnknownField("favourite_color".to_string()))
        );
        assert!(matches!(
            validate_query(&doc(json!({"location.zip": "high"}))),
            Err(ValidationError::WrongType { .. })
        ));
    }

    #[test]
    fn test_error_messages_name_the_field() {
        let err = ValidationError::UnknownField("name.middle".to_string());
        assert_eq!(err.to_string(), "Unknown field 'name.middle'");

        let err = ValidationError::OutOfRange {
            field: "location.zip".to_string(),
            min: 0,
            max: 99_999,
        };
        assert_eq!(
            err.to_string(),
            "Field 'location.zip' must be between 0 and 99999"
        );
    }
}
