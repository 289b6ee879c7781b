//! Candidate validation from model output to typed [`TestCase`]
//!
//! Each candidate is checked against a JSON Schema of the wire format, then
//! decoded. A rejected candidate carries its reason and never stops the rest
//! of the batch.

use serde::Serialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::case::TestCase;

/// Optional wire keys that a model may emit as `null`.
const NULLABLE_KEYS: &[&str] = &["Operation ID", "Summary", "Request Body", "Headers"];

const STATUS_KEY: &str = "Expected Status Code";

#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
pub enum RejectReason {
    #[error("candidate is not a JSON object")]
    NotAnObject,
    #[error("schema violations: {}", .0.join("; "))]
    Schema(Vec<String>),
    #[error("cannot decode candidate: {0}")]
    Decode(String),
}

/// A candidate that did not become a [`TestCase`].
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("rejected '{}': {reason}", candidate_name(.candidate))]
pub struct Rejection {
    pub candidate: Value,
    pub reason: RejectReason,
}

impl Rejection {
    /// `Test Case Name` of the candidate, if it has a usable one.
    #[must_use]
    pub fn name(&self) -> &str {
        candidate_name(&self.candidate)
    }
}

fn candidate_name(candidate: &Value) -> &str {
    candidate
        .get("Test Case Name")
        .and_then(Value::as_str)
        .unwrap_or("<unnamed>")
}

/// `200.0` → `200`; anything else is left alone.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn integral_float(value: &Value) -> Option<u64> {
    if value.is_u64() {
        return None;
    }
    let f = value.as_f64()?;
    (f.fract() == 0.0 && (0.0..=f64::from(u16::MAX)).contains(&f)).then_some(f as u64)
}

fn candidate_schema() -> Value {
    json!({
        "type": "object",
        "required": [
            "Test Case Name",
            "Description",
            "Endpoint",
            "Method",
            "Expected Status Code"
        ],
        "properties": {
            "Test Case Name": {"type": "string"},
            "Description": {"type": "string"},
            "Endpoint": {"type": "string"},
            "Method": {"type": "string", "minLength": 1},
            "Operation ID": {"type": ["string", "null"]},
            "Summary": {"type": ["string", "null"]},
            "Request Body": {
                "type": ["object", "array", "null"],
                "items": {"type": "object"}
            },
            "Expected Status Code": {"type": "integer", "minimum": 100, "maximum": 599},
            "Headers": {"type": ["object", "null"]}
        }
    })
}

pub struct TestCaseValidator {
    schema: jsonschema::Validator,
}

impl Default for TestCaseValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl TestCaseValidator {
    #[must_use]
    pub fn new() -> Self {
        let schema =
            jsonschema::validator_for(&candidate_schema()).expect("candidate schema is well-formed");
        Self { schema }
    }

    /// Validate and decode one candidate.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] naming every schema violation, or the decode
    /// failure when the shape is right but a value does not fit.
    pub fn validate(&self, candidate: &Value) -> Result<TestCase, Rejection> {
        let reject = |reason| Rejection {
            candidate: candidate.clone(),
            reason,
        };

        let Some(obj) = candidate.as_object() else {
            return Err(reject(RejectReason::NotAnObject));
        };

        let violations: Vec<String> = self
            .schema
            .iter_errors(candidate)
            .map(|e| e.to_string())
            .collect();
        if !violations.is_empty() {
            return Err(reject(RejectReason::Schema(violations)));
        }

        let mut cleaned = obj.clone();
        for key in NULLABLE_KEYS {
            if cleaned.get(*key).is_some_and(Value::is_null) {
                cleaned.remove(*key);
            }
        }
        // The schema accepts `200.0` as an integer; decode it as one too
        if let Some(code) = cleaned.get(STATUS_KEY).and_then(integral_float) {
            cleaned.insert(STATUS_KEY.to_string(), Value::from(code));
        }
        serde_json::from_value(Value::Object(cleaned))
            .map_err(|e| reject(RejectReason::Decode(e.to_string())))
    }

    /// Split a batch into accepted cases and rejections, preserving order.
    pub fn partition(&self, candidates: &[Value]) -> (Vec<TestCase>, Vec<Rejection>) {
        let mut cases = Vec::new();
        let mut rejected = Vec::new();
        for candidate in candidates {
            match self.validate(candidate) {
                Ok(case) => cases.push(case),
                Err(rejection) => {
                    warn!("{rejection}");
                    rejected.push(rejection);
                }
            }
        }
        (cases, rejected)
    }
}
