//! User field catalogue
//!
//! The strict schema: every field a user record may carry, with its type
//! and bounds. Anything not listed here is rejected by validation, nested
//! fields included. The catalogue also names the credential and internal
//! fields that are stripped from every outbound record.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::document::{strip_fields, Document};

/// Credential material clients can never set or read back.
pub const CREDENTIAL_FIELDS: &[&str] = &["password", "salt", "md5", "sha1", "sha256"];

/// Store bookkeeping fields, never part of the API surface.
pub const INTERNAL_FIELDS: &[&str] = &["_id", "_rev"];

/// Validation rule for a single field.
#[derive(Debug)]
pub enum FieldRule {
    Str { max_len: usize },
    Int { min: i64, max: i64 },
    Enum { allowed: &'static [&'static str] },
    Object { fields: &'static [(&'static str, FieldRule)] },
}

const NAME_FIELDS: &[(&str, FieldRule)] = &[
    ("title", FieldRule::Str { max_len: 50 }),
    ("first", FieldRule::Str { max_len: 50 }),
    ("last", FieldRule::Str { max_len: 50 }),
];

const LOCATION_FIELDS: &[(&str, FieldRule)] = &[
    ("street", FieldRule::Str { max_len: 200 }),
    ("city", FieldRule::Str { max_len: 100 }),
    ("state", FieldRule::Str { max_len: 100 }),
    ("zip", FieldRule::Int { min: 0, max: 99_999 }),
];

const PICTURE_FIELDS: &[(&str, FieldRule)] = &[
    ("large", FieldRule::Str { max_len: 500 }),
    ("medium", FieldRule::Str { max_len: 500 }),
    ("thumbnail", FieldRule::Str { max_len: 500 }),
];

/// The full user schema, top level.
pub const USER_FIELDS: &[(&str, FieldRule)] = &[
    ("username", FieldRule::Str { max_len: 100 }),
    ("gender", FieldRule::Enum { allowed: &["male", "female"] }),
    ("name", FieldRule::Object { fields: NAME_FIELDS }),
    ("location", FieldRule::Object { fields: LOCATION_FIELDS }),
    ("email", FieldRule::Str { max_len: 100 }),
    ("password", FieldRule::Str { max_len: 100 }),
    ("salt", FieldRule::Str { max_len: 100 }),
    ("md5", FieldRule::Str { max_len: 100 }),
    ("sha1", FieldRule::Str { max_len: 100 }),
    ("sha256", FieldRule::Str { max_len: 100 }),
    ("registered", FieldRule::Int { min: 0, max: i64::MAX }),
    ("dob", FieldRule::Int { min: 0, max: i64::MAX }),
    ("phone", FieldRule::Str { max_len: 50 }),
    ("cell", FieldRule::Str { max_len: 50 }),
    ("PPS", FieldRule::Str { max_len: 50 }),
    ("picture", FieldRule::Object { fields: PICTURE_FIELDS }),
];

static TOP_LEVEL_INDEX: Lazy<HashMap<&'static str, &'static FieldRule>> = Lazy::new(|| {
    USER_FIELDS.iter().map(|(name, rule)| (*name, rule)).collect()
});

/// Resolve a (possibly dotted) field path to its rule.
///
/// Returns `None` for unknown fields, unknown nested fields, and paths
/// that descend into a non-object field.
pub fn resolve(path: &str) -> Option<&'static FieldRule> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut rule = *TOP_LEVEL_INDEX.get(first)?;

    for segment in segments {
        let FieldRule::Object { fields } = rule else {
            return None;
        };
        rule = fields
            .iter()
            .find(|(name, _)| *name == segment)
            .map(|(_, rule)| rule)?;
    }

    Some(rule)
}

/// Fields stripped from every inbound payload and outbound record.
pub fn omitted_fields() -> Vec<&'static str> {
    let mut fields = Vec::with_capacity(CREDENTIAL_FIELDS.len() + INTERNAL_FIELDS.len());
    fields.extend_from_slice(INTERNAL_FIELDS);
    fields.extend_from_slice(CREDENTIAL_FIELDS);
    fields
}

/// Copy a record without credential material or internal identifiers.
pub fn redact(doc: &Document) -> Document {
    strip_fields(doc, &omitted_fields())
}
