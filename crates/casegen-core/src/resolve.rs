//! `$ref` resolution against a document-wide definitions table
//!
//! Swagger 2.0 refs look like `#/definitions/Pet`; only the final path
//! segment is used as the lookup key. A ref that is already being expanded
//! further up the same branch resolves to `{}` so cyclic definitions terminate.

use serde_json::{Map, Value};
use tracing::warn;

/// Keys whose values are single subschemas.
const NESTED_SCHEMA_KEYS: &[&str] = &["items", "additionalProperties"];

/// Keys whose values are lists of subschemas.
const COMPOSED_SCHEMA_KEYS: &[&str] = &["allOf", "anyOf", "oneOf"];

/// Inline every `$ref` reachable through `items`, `properties`,
/// `additionalProperties` and the composition keywords.
///
/// A missing definition resolves to `{}`. `null` normalizes to `{}`; other
/// non-object inputs pass through unchanged.
#[must_use]
pub fn resolve(schema: &Value, definitions: &Map<String, Value>) -> Value {
    if schema.is_null() {
        return Value::Object(Map::new());
    }
    let mut expanding = Vec::new();
    resolve_inner(schema, definitions, &mut expanding)
}

/// Final path segment of a ref string: `#/definitions/Pet` → `Pet`.
#[must_use]
pub fn ref_name(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

fn resolve_inner(schema: &Value, definitions: &Map<String, Value>, expanding: &mut Vec<String>) -> Value {
    let Value::Object(obj) = schema else {
        return schema.clone();
    };

    if let Some(reference) = obj.get("$ref") {
        let name = reference.as_str().map(ref_name).unwrap_or_default();
        if expanding.iter().any(|n| n == name) {
            warn!(reference = name, "cyclic $ref, substituting empty schema");
            return Value::Object(Map::new());
        }
        let target = definitions
            .get(name)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        expanding.push(name.to_string());
        let resolved = resolve_inner(&target, definitions, expanding);
        expanding.pop();
        return match resolved {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
    }

    let mut out = obj.clone();

    for key in NESTED_SCHEMA_KEYS {
        if let Some(sub @ Value::Object(_)) = obj.get(*key) {
            out.insert((*key).to_string(), resolve_inner(sub, definitions, expanding));
        }
    }

    for key in COMPOSED_SCHEMA_KEYS {
        if let Some(Value::Array(variants)) = obj.get(*key) {
            let resolved = variants
                .iter()
                .map(|v| resolve_inner(v, definitions, expanding))
                .collect();
            out.insert((*key).to_string(), Value::Array(resolved));
        }
    }

    if let Some(Value::Object(props)) = obj.get("properties") {
        let resolved: Map<String, Value> = props
            .iter()
            .map(|(k, v)| (k.clone(), resolve_inner(v, definitions, expanding)))
            .collect();
        out.insert("properties".to_string(), Value::Object(resolved));
    }

    Value::Object(out)
}

/// True if any `$ref` key remains anywhere in the value.
#[must_use]
pub fn contains_ref(value: &Value) -> bool {
    match value {
        Value::Object(obj) => obj.contains_key("$ref") || obj.values().any(contains_ref),
        Value::Array(items) => items.iter().any(contains_ref),
        _ => false,
    }
}
