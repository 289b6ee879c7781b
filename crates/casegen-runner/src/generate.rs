//! Generation pipeline: prompt → model → repair → validate, per endpoint

use casegen_core::{
    Endpoint, Rejection, TestCase, TestCaseValidator, build_prompt, parse_test_cases,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info, info_span, warn};

use crate::llm::TextGenerator;

/// An endpoint that produced no candidates at all.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointFailure {
    /// `operation_id` of the endpoint
    pub operation: String,
    pub reason: String,
}

/// Everything one generation run produced.
#[derive(Debug, Default, Serialize)]
pub struct GenerationReport {
    pub cases: Vec<TestCase>,
    pub rejected: Vec<Rejection>,
    pub failures: Vec<EndpointFailure>,
}

impl GenerationReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

/// Generate test cases for every endpoint in order.
///
/// A failing endpoint is recorded and skipped; a rejected candidate is
/// recorded and skipped. Neither stops the run.
pub fn generate_test_cases(
    endpoints: &[Endpoint],
    definitions: &Map<String, Value>,
    generator: &impl TextGenerator,
) -> GenerationReport {
    let mut report = GenerationReport::default();
    if endpoints.is_empty() {
        info!("no endpoints to generate test cases for");
        return report;
    }

    let validator = TestCaseValidator::new();
    for endpoint in endpoints {
        let _span = info_span!("generate", endpoint = %endpoint.label()).entered();
        let prompt = build_prompt(endpoint, definitions);

        let raw = match generator.generate(&prompt) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("generation failed: {e}");
                report.failures.push(EndpointFailure {
                    operation: endpoint.operation_id.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let candidates = match parse_test_cases(&raw) {
            Ok(candidates) => candidates,
            Err(e) => {
                error!(text = %e.repaired_text(), "model output parse error: {e}");
                report.failures.push(EndpointFailure {
                    operation: endpoint.operation_id.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let (cases, rejected) = validator.partition(&candidates);
        info!(
            accepted = cases.len(),
            rejected = rejected.len(),
            "generated test cases"
        );
        report.cases.extend(cases);
        report.rejected.extend(rejected);
    }

    info!(total = report.cases.len(), "generation finished");
    report
}

/// Restrict `endpoints` to one operation, or keep all of them.
#[must_use]
pub fn select_endpoints(endpoints: &[Endpoint], operation: Option<&str>) -> Vec<Endpoint> {
    endpoints
        .iter()
        .filter(|e| operation.is_none_or(|op| e.operation_id == op))
        .cloned()
        .collect()
}
