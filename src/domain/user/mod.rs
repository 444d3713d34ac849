//! User domain
//!
//! Documents, the strict field catalogue, the validation engine, and the
//! store abstraction for the user resource.

pub mod document;
pub mod fields;
pub mod store;
pub mod validation;

pub use document::{apply_patch, expand_dotted, get_path, matches, strip_fields, Document};
pub use fields::{omitted_fields, redact, CREDENTIAL_FIELDS, INTERNAL_FIELDS};
pub use store::{ensure_limit, ensure_query, UserStore};
pub use validation::{validate_query, validate_record, ValidationError, ValidationMode};
