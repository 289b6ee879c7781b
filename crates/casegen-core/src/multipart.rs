//! Dispatch planning: JSON vs multipart/form-data
//!
//! A body is an upload when any string inside it ends with a known file
//! extension. Only POST requests are sent as multipart.

use std::path::PathBuf;

use serde_json::Value;

use crate::case::RequestPayload;
use crate::endpoint::HttpMethod;

/// Lowercase suffixes that mark a string as a local file path.
pub const FILE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".pdf"];

#[must_use]
pub fn is_file_like(value: &str) -> bool {
    let lower = value.to_lowercase();
    FILE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// True if any string anywhere in `value` is file-like.
#[must_use]
pub fn contains_file(value: &Value) -> bool {
    match value {
        Value::String(s) => is_file_like(s),
        Value::Array(items) => items.iter().any(contains_file),
        Value::Object(map) => map.values().any(contains_file),
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchKind {
    Multipart,
    /// JSON body attached
    Json,
    /// No body at all
    Empty,
}

/// Choose how a case's body goes on the wire.
///
/// Empty bodies are still sent as `{}` for write methods.
#[must_use]
pub fn dispatch_kind(method: &str, body: &RequestPayload) -> DispatchKind {
    let method = HttpMethod::from_key(method);
    if method == Some(HttpMethod::Post) && contains_file(&body.to_value()) {
        DispatchKind::Multipart
    } else if !body.is_empty() || method.is_some_and(HttpMethod::has_body) {
        DispatchKind::Json
    } else {
        DispatchKind::Empty
    }
}

/// Fields of a multipart body.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MultipartPlan {
    /// Text parts: strings verbatim, other values as JSON text
    pub fields: Vec<(String, String)>,
    /// File parts: dotted field path and local path to stream
    pub files: Vec<(String, PathBuf)>,
}

/// Split a body into text and file parts. List bodies are keyed by index.
///
/// File paths nested in objects or arrays become their own parts named by
/// their dotted path (`pet.photo`, `0.images.1`); whatever remains of the
/// container is sent as JSON text unless nothing is left.
#[must_use]
pub fn split_form(body: &RequestPayload) -> MultipartPlan {
    let entries: Vec<(String, Value)> = match body {
        RequestPayload::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        RequestPayload::List(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| (i.to_string(), Value::Object(item.clone())))
            .collect(),
    };

    let mut plan = MultipartPlan::default();
    for (name, mut value) in entries {
        match value {
            Value::String(s) if is_file_like(&s) => plan.files.push((name, PathBuf::from(s))),
            Value::String(s) => plan.fields.push((name, s)),
            Value::Object(_) | Value::Array(_) => {
                take_files(&mut value, &name, &mut plan.files);
                if !is_empty_container(&value) {
                    plan.fields.push((name, value.to_string()));
                }
            }
            other => plan.fields.push((name, other.to_string())),
        }
    }
    plan
}

/// Move every file-like string out of `value` into `files`.
fn take_files(value: &mut Value, prefix: &str, files: &mut Vec<(String, PathBuf)>) {
    match value {
        Value::Object(map) => {
            let keys: Vec<String> = map.keys().cloned().collect();
            for key in keys {
                let path = format!("{prefix}.{key}");
                let file = map
                    .get(&key)
                    .and_then(Value::as_str)
                    .filter(|s| is_file_like(s))
                    .map(PathBuf::from);
                if let Some(file) = file {
                    files.push((path, file));
                    map.shift_remove(&key);
                } else if let Some(child) = map.get_mut(&key) {
                    take_files(child, &path, files);
                }
            }
        }
        Value::Array(items) => {
            let mut index = 0;
            items.retain_mut(|item| {
                let path = format!("{prefix}.{index}");
                index += 1;
                if let Value::String(s) = item {
                    if is_file_like(s) {
                        files.push((path, PathBuf::from(s.as_str())));
                        return false;
                    }
                }
                take_files(item, &path, files);
                true
            });
        }
        _ => {}
    }
}

fn is_empty_container(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
