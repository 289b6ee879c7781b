//! Example payload synthesis from a resolved object schema
//!
//! Produces one illustrative value per declared property. The result only
//! grounds the LLM prompt; it is never used to validate anything.

use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::{Map, Value};

/// Placeholder path emitted for `format: binary` string properties.
pub const FILE_PLACEHOLDER: &str = "/path/to/cat.jpg";

/// Nesting limit for object/array recursion.
const MAX_DEPTH: u32 = 20;

const WORDS: &[&str] = &[
    "alpha", "amber", "anchor", "apple", "atlas", "bamboo", "beacon", "birch", "breeze", "canyon",
    "cedar", "comet", "coral", "delta", "ember", "falcon", "fern", "glacier", "harbor", "indigo",
    "jasper", "juniper", "lagoon", "lotus", "maple", "meadow", "nebula", "oasis", "orchid", "pebble",
    "quartz", "raven", "river", "saffron", "summit", "thistle", "tundra", "velvet", "willow", "zephyr",
];

/// Synthesize an example object for `schema["properties"]`.
///
/// Never fails: unknown or malformed property schemas become `null`, array
/// properties whose items are neither strings nor objects are left out.
pub fn synthesize(schema: &Value, rng: &mut impl Rng) -> Value {
    Value::Object(synthesize_object(schema, rng, 0))
}

fn synthesize_object(schema: &Value, rng: &mut impl Rng, depth: u32) -> Map<String, Value> {
    let mut out = Map::new();
    if depth > MAX_DEPTH {
        return out;
    }
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return out;
    };

    for (name, prop) in properties {
        let type_str = prop.get("type").and_then(Value::as_str);
        let value = match type_str {
            Some("string") => string_value(prop, rng),
            Some("integer") => Value::from(rng.gen_range(0..=9999_u32)),
            Some("array") => {
                let items = prop.get("items").unwrap_or(&Value::Null);
                match items.get("type").and_then(Value::as_str) {
                    Some("string") => Value::Array(vec![Value::String(word(rng))]),
                    Some("object") => {
                        Value::Array(vec![Value::Object(synthesize_object(items, rng, depth + 1))])
                    }
                    _ => continue,
                }
            }
            Some("object") => Value::Object(synthesize_object(prop, rng, depth + 1)),
            _ => Value::Null,
        };
        out.insert(name.clone(), value);
    }
    out
}

fn string_value(prop: &Value, rng: &mut impl Rng) -> Value {
    if prop.get("format").and_then(Value::as_str) == Some("binary") {
        return Value::String(FILE_PLACEHOLDER.to_string());
    }
    if let Some(first) = prop
        .get("enum")
        .and_then(Value::as_array)
        .and_then(|values| values.first())
    {
        return first.clone();
    }
    if let Some(example) = prop.get("example") {
        return example.clone();
    }
    Value::String(word(rng))
}

fn word(rng: &mut impl Rng) -> String {
    WORDS.choose(rng).copied().unwrap_or("sample").to_string()
}
