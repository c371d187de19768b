//! Field-level edits addressed by JSON pointer. Array segments accept either a
//! numeric index or the element's `id`, so clients can address entries without
//! caring about their current rank.

use serde_json::Value;
use thiserror::Error;

use crate::profile::models::{ProfileDocument, SectionKind};
use crate::profile::sections;
use crate::profile::validation::ValidationError;

/// Fields that only structural operations may change.
const PROTECTED_LEAVES: &[&str] = &["id", "order"];
const PROTECTED_ROOTS: &[&str] = &["tabs"];

#[derive(Debug, Error)]
pub enum FieldPathError {
    #[error("path must start with '/' and name a field")]
    Malformed,

    #[error("'{0}' cannot be edited directly")]
    Protected(String),

    #[error("{0}")]
    NotFound(String),

    #[error("value does not fit the field: {0}")]
    Shape(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

fn section_of(root: &str) -> Option<SectionKind> {
    SectionKind::ALL.into_iter().find(|k| k.as_str() == root)
}

fn decode_segment(raw: &str) -> String {
    raw.replace("~1", "/").replace("~0", "~")
}

/// Splits a pointer into decoded segments, rejecting protected targets.
pub fn parse(path: &str) -> Result<Vec<String>, FieldPathError> {
    let rest = path.strip_prefix('/').ok_or(FieldPathError::Malformed)?;
    let segments: Vec<String> = rest.split('/').map(decode_segment).collect();
    if segments.iter().any(String::is_empty) {
        return Err(FieldPathError::Malformed);
    }
    if let Some(root) = segments.first() {
        if PROTECTED_ROOTS.contains(&root.as_str()) {
            return Err(FieldPathError::Protected(root.clone()));
        }
        // Whole lists and whole entries go through the section operations.
        if section_of(root).is_some() && segments.len() < 3 {
            return Err(FieldPathError::Protected(segments.join("/")));
        }
    }
    if let Some(leaf) = segments.last() {
        if PROTECTED_LEAVES.contains(&leaf.as_str()) {
            return Err(FieldPathError::Protected(leaf.clone()));
        }
    }
    Ok(segments)
}

fn step<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => match segment.parse::<usize>() {
            Ok(index) => items.get(index),
            Err(_) => items
                .iter()
                .find(|item| item.get("id").and_then(Value::as_str) == Some(segment)),
        },
        _ => None,
    }
}

fn step_mut<'a>(node: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match node {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => match segment.parse::<usize>() {
            Ok(index) => items.get_mut(index),
            Err(_) => items
                .iter_mut()
                .find(|item| item.get("id").and_then(Value::as_str) == Some(segment)),
        },
        _ => None,
    }
}

/// Reads the value at `path`.
pub fn read(doc: &ProfileDocument, path: &str) -> Result<Value, FieldPathError> {
    let rest = path.strip_prefix('/').ok_or(FieldPathError::Malformed)?;
    let root = serde_json::to_value(doc).map_err(|e| FieldPathError::Shape(e.to_string()))?;
    let mut node = &root;
    for segment in rest.split('/').map(decode_segment) {
        node = step(node, &segment).ok_or_else(|| FieldPathError::NotFound(path.to_string()))?;
    }
    Ok(node.clone())
}

/// Returns a copy of `doc` with `value` written at `path`. The result must
/// still deserialize as a [`ProfileDocument`], so type mismatches are rejected.
/// An edit inside a section entry must leave that entry valid.
pub fn apply(doc: &ProfileDocument, path: &str, value: Value) -> Result<ProfileDocument, FieldPathError> {
    let segments = parse(path)?;
    let mut root = serde_json::to_value(doc).map_err(|e| FieldPathError::Shape(e.to_string()))?;

    let mut node = &mut root;
    for segment in &segments {
        node = step_mut(node, segment).ok_or_else(|| FieldPathError::NotFound(path.to_string()))?;
    }
    *node = value;

    let updated: ProfileDocument =
        serde_json::from_value(root).map_err(|e| FieldPathError::Shape(e.to_string()))?;
    if let Some(kind) = section_of(&segments[0]) {
        sections::validate_entry(&updated, kind, &segments[1])?;
    }
    Ok(updated)
}

/// Renders a field as clipboard text: strings verbatim, everything else as JSON.
pub fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
