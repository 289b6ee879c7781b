//! Test-case interchange types
//!
//! Field names follow the wire contract shared with the prompt template:
//! `"Test Case Name"`, `"Expected Status Code"`, ... Execution results are
//! attached as a separate [`Outcome`] so the generation record stays untouched.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Request body of a generated case: one object, or a list of objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RequestPayload {
    Object(Map<String, Value>),
    List(Vec<Map<String, Value>>),
}

impl Default for RequestPayload {
    fn default() -> Self {
        Self::Object(Map::new())
    }
}

impl RequestPayload {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Object(map) => map.is_empty(),
            Self::List(items) => items.is_empty(),
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Object(map) => Value::Object(map.clone()),
            Self::List(items) => Value::Array(items.iter().cloned().map(Value::Object).collect()),
        }
    }
}

/// A generated test case, validated at the boundary where LLM output enters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TestCase {
    #[serde(rename = "Test Case Name")]
    pub name: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Endpoint")]
    pub endpoint: String,
    #[serde(rename = "Method")]
    pub method: String,
    #[serde(rename = "Operation ID", default)]
    pub operation_id: String,
    #[serde(rename = "Summary", default)]
    pub summary: String,
    #[serde(rename = "Request Body", default)]
    pub request_body: RequestPayload,
    #[serde(rename = "Expected Status Code")]
    pub expected_status_code: u16,
    #[serde(rename = "Headers", default)]
    pub headers: Map<String, Value>,
}

/// Execution verdict of one case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestStatus {
    /// Actual status code equals the expected one
    Passed,
    /// Server answered with a different status code
    Failed,
    /// No response at all (timeout, connection refused, DNS, unreadable upload)
    Error,
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => f.write_str("PASSED"),
            Self::Failed => f.write_str("FAILED"),
            Self::Error => f.write_str("ERROR"),
        }
    }
}

/// Result fields appended to a case by the execution engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Outcome {
    #[serde(rename = "Status")]
    pub status: TestStatus,
    #[serde(rename = "Actual Status Code", default)]
    pub actual_status_code: Option<u16>,
    #[serde(rename = "Error", default)]
    pub error: Option<String>,
    /// Seconds spent on the HTTP call
    #[serde(rename = "Response Time", default)]
    pub response_time: Option<f64>,
}

impl Outcome {
    /// Compare the actual code against the expectation.
    #[must_use]
    pub fn classify(expected: u16, actual: u16, response_time: f64) -> Self {
        let status = if actual == expected {
            TestStatus::Passed
        } else {
            TestStatus::Failed
        };
        Self {
            status,
            actual_status_code: Some(actual),
            error: None,
            response_time: Some(response_time),
        }
    }

    /// The call never produced a response.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: TestStatus::Error,
            actual_status_code: None,
            error: Some(message.into()),
            response_time: None,
        }
    }
}

/// A case together with its execution outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExecutedCase {
    #[serde(flatten)]
    pub case: TestCase,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Aggregate of one execution batch.
///
/// `failed_cases` counts FAILED and ERROR cases; `error_cases` is the ERROR
/// subset, so `total_cases == passed_cases + failed_cases` always holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RunSummary {
    pub total_cases: u64,
    pub passed_cases: u64,
    pub failed_cases: u64,
    pub error_cases: u64,
    /// Wall-clock seconds for the whole batch
    pub total_time: f64,
}

impl RunSummary {
    #[must_use]
    pub fn from_results(results: &[ExecutedCase], total_time: f64) -> Self {
        let mut summary = Self {
            total_time,
            ..Self::default()
        };
        for result in results {
            summary.total_cases += 1;
            match result.outcome.status {
                TestStatus::Passed => summary.passed_cases += 1,
                TestStatus::Failed => summary.failed_cases += 1,
                TestStatus::Error => {
                    summary.failed_cases += 1;
                    summary.error_cases += 1;
                }
            }
        }
        summary
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed_cases == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} total, {} passed, {} failed (errors: {}) in {:.2}s",
            self.total_cases, self.passed_cases, self.failed_cases, self.error_cases, self.total_time
        )
    }
}

/// Per-case results in processing order plus the batch summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RunReport {
    pub results: Vec<ExecutedCase>,
    pub summary: RunSummary,
}

/// JSON Schema of an executed test-case list, for tools that exchange case files.
#[must_use]
pub fn generate_schema() -> String {
    let schema = schemars::schema_for!(Vec<ExecutedCase>);
    serde_json::to_string_pretty(&schema).expect("schema serialization should not fail")
}
