//! JSON document helpers
//!
//! User records are plain JSON objects. These helpers implement the
//! dotted-path navigation, query matching, and merge semantics the store
//! and service layers are built on. A path like `"name.last"` addresses
//! the leaf inside the `name` sub-object.

use serde_json::{Map, Value};

/// A user record (or query, or patch) as stored and transported.
pub type Document = Map<String, Value>;

/// Resolve a dotted path inside a document.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = doc.get(first)?;

    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }

    Some(current)
}

/// Set a dotted path inside a document, creating intermediate objects.
///
/// An intermediate value that is not an object is replaced by one.
pub fn set_path(doc: &mut Document, path: &str, value: Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let leaf = segments.pop().unwrap_or(path);

    let mut current = doc;
    for segment in segments {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));

        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }

        current = entry
            .as_object_mut()
            .unwrap_or_else(|| unreachable!("entry was just made an object"));
    }

    current.insert(leaf.to_string(), value);
}

/// Remove a dotted path from a document. Missing paths are a no-op.
pub fn remove_path(doc: &mut Document, path: &str) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let leaf = match segments.pop() {
        Some(leaf) => leaf,
        None => return,
    };

    let mut current = doc;
    for segment in segments {
        current = match current.get_mut(segment).and_then(Value::as_object_mut) {
            Some(inner) => inner,
            None => return,
        };
    }

    current.remove(leaf);
}

/// True when every query entry matches the document.
///
/// Query keys may be dotted paths; values compare by exact JSON equality at
/// the resolved path. A whole-object query value therefore requires the
/// sub-object to be equal in full, mirroring the store's find semantics.
pub fn matches(doc: &Document, query: &Document) -> bool {
    query
        .iter()
        .all(|(path, expected)| get_path(doc, path) == Some(expected))
}

/// Return a copy of the document without the given top-level fields.
pub fn strip_fields(doc: &Document, fields: &[&str]) -> Document {
    doc.iter()
        .filter(|(key, _)| !fields.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Apply a patch to a document: shallow merge per supplied key.
///
/// Dotted-path keys update only the addressed leaf; a plain key replaces
/// whatever was at that top-level field, including whole sub-objects.
/// A `null` value removes the field.
pub fn apply_patch(doc: &mut Document, patch: &Document) {
    for (path, value) in patch {
        if value.is_null() {
            remove_path(doc, path);
        } else {
            set_path(doc, path, value.clone());
        }
    }
}

/// Expand dotted keys into nested objects.
///
/// `{"name.last": "x"}` becomes `{"name": {"last": "x"}}`. Used when a
/// replacement payload or a store query needs its canonical nested form.
pub fn expand_dotted(doc: &Document) -> Document {
    let mut expanded = Map::new();
    for (path, value) in doc {
        set_path(&mut expanded, path, value.clone());
    }
    expanded
}
