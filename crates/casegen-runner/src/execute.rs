//! Test-case execution against the target API
//!
//! Cases run sequentially in input order. Each case yields exactly one
//! [`Outcome`]: a status-code comparison when the server answered, `ERROR`
//! when no response arrived.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use casegen_core::multipart::{DispatchKind, dispatch_kind, split_form};
use casegen_core::{Config, ExecutedCase, Outcome, RunReport, RunSummary, TestCase, TestStatus};
use reqwest::blocking::{Client, RequestBuilder, multipart};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use tracing::{debug, error, info, info_span, warn};

/// Response bodies longer than this are cut in FAILED logs.
const MAX_LOGGED_BODY_BYTES: usize = 4096;

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Sends test cases to `base_url + endpoint` and classifies the answers.
#[derive(Debug, Clone)]
pub struct Executor {
    base_url: String,
    timeout: Duration,
    headers: BTreeMap<String, String>,
}

impl Executor {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.api.base_url(),
            timeout: config.api.timeout(),
            headers: config.api.headers.clone(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Execute every case and aggregate the summary.
    ///
    /// # Errors
    ///
    /// Returns error only if the HTTP client cannot be built; per-case
    /// failures are recorded in the report.
    pub fn run(&self, cases: &[TestCase]) -> Result<RunReport, ExecError> {
        let _span = info_span!("execute", cases = cases.len()).entered();
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ExecError::Client(e.to_string()))?;

        let started = Instant::now();
        let results: Vec<ExecutedCase> = cases
            .iter()
            .map(|case| ExecutedCase {
                case: case.clone(),
                outcome: self.execute_one(&client, case),
            })
            .collect();
        let summary = RunSummary::from_results(&results, started.elapsed().as_secs_f64());
        info!(%summary, "execution finished");

        Ok(RunReport { results, summary })
    }

    fn execute_one(&self, client: &Client, case: &TestCase) -> Outcome {
        let _span = info_span!("case", name = %case.name).entered();
        let method_name = case.method.trim().to_uppercase();
        let url = format!("{}{}", self.base_url, case.endpoint);

        info!(method = %method_name, %url, "executing");
        debug!(body = %case.request_body.to_value(), headers = ?case.headers, "payload");

        let Ok(method) = reqwest::Method::from_bytes(method_name.as_bytes()) else {
            let message = format!("invalid HTTP method '{}'", case.method);
            error!("ERROR: {message}");
            return Outcome::error(message);
        };

        let kind = dispatch_kind(&method_name, &case.request_body);
        let req = client
            .request(method, &url)
            .headers(self.merged_headers(case, kind));
        let req = match attach_body(req, case, kind) {
            Ok(req) => req,
            Err(message) => {
                error!("ERROR: {message}");
                return Outcome::error(message);
            }
        };

        let start = Instant::now();
        match req.send() {
            Ok(resp) => {
                let elapsed = start.elapsed().as_secs_f64();
                let actual = resp.status().as_u16();
                let outcome = Outcome::classify(case.expected_status_code, actual, elapsed);
                if outcome.status == TestStatus::Passed {
                    info!(status = actual, "PASSED in {elapsed:.4}s");
                } else {
                    let body = resp.text().unwrap_or_default();
                    error!(
                        expected = case.expected_status_code,
                        actual,
                        response = %truncate(&body),
                        "FAILED"
                    );
                }
                outcome
            }
            Err(e) => {
                error!("ERROR: {e}");
                Outcome::error(e.to_string())
            }
        }
    }

    /// Config headers first, case headers on top. Names and values that are
    /// not valid HTTP are skipped.
    fn merged_headers(&self, case: &TestCase, kind: DispatchKind) -> HeaderMap {
        let configured = self
            .headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()));
        let per_case = case
            .headers
            .iter()
            .map(|(k, v)| (k.as_str(), header_text(v)));

        let mut map = HeaderMap::new();
        for (name, value) in configured.chain(per_case) {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    map.insert(name, value);
                }
                _ => warn!(header = name, "skipping invalid header"),
            }
        }
        // The multipart boundary must come from the form itself
        if kind == DispatchKind::Multipart {
            map.remove(CONTENT_TYPE);
        }
        map
    }
}

fn attach_body(
    req: RequestBuilder,
    case: &TestCase,
    kind: DispatchKind,
) -> Result<RequestBuilder, String> {
    match kind {
        DispatchKind::Multipart => {
            let plan = split_form(&case.request_body);
            let mut form = multipart::Form::new();
            for (name, text) in plan.fields {
                form = form.text(name, text);
            }
            for (name, path) in plan.files {
                form = form
                    .file(name, &path)
                    .map_err(|e| format!("cannot open {}: {e}", path.display()))?;
            }
            Ok(req.multipart(form))
        }
        DispatchKind::Json => Ok(req.json(&case.request_body.to_value())),
        DispatchKind::Empty => Ok(req),
    }
}

fn header_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_LOGGED_BODY_BYTES {
        return body.to_string();
    }
    // Safe UTF-8 truncation: walk back to char boundary
    let mut end = MAX_LOGGED_BODY_BYTES;
    while end > 0 && !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…({} bytes total)", &body[..end], body.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn case(headers: Value) -> TestCase {
        serde_json::from_value(json!({
            "Test Case Name": "t",
            "Description": "d",
            "Endpoint": "/pet",
            "Method": "POST",
            "Expected Status Code": 200,
            "Headers": headers
        }))
        .unwrap()
    }

    fn executor(headers: &[(&str, &str)]) -> Executor {
        let mut config = Config::default();
        config.api.headers = headers
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Executor::from_config(&config)
    }

    #[test]
    fn case_headers_override_config() {
        let exec = executor(&[("Authorization", "Bearer config"), ("X-Trace", "1")]);
        let map = exec.merged_headers(
            &case(json!({"authorization": "Bearer case", "X-Retry": 3})),
            DispatchKind::Json,
        );
        assert_eq!(map["authorization"], "Bearer case");
        assert_eq!(map["x-trace"], "1");
        assert_eq!(map["x-retry"], "3");
    }

    #[test]
    fn config_headers_differing_in_case_resolve_in_key_order() {
        // "Authorization" sorts before "authorization"
        let exec = executor(&[("authorization", "Bearer lower"), ("Authorization", "Bearer upper")]);
        let map = exec.merged_headers(&case(json!({})), DispatchKind::Json);
        assert_eq!(map.get_all("authorization").iter().count(), 1);
        assert_eq!(map["authorization"], "Bearer lower");
    }

    #[test]
    fn invalid_headers_are_skipped() {
        let exec = executor(&[]);
        let map = exec.merged_headers(
            &case(json!({"bad header": "x", "X-Ok": "fine", "X-Bad": "a\r\nb"})),
            DispatchKind::Json,
        );
        assert_eq!(map.len(), 1);
        assert_eq!(map["x-ok"], "fine");
    }

    #[test]
    fn multipart_drops_content_type() {
        let exec = executor(&[("Content-Type", "application/json")]);
        let map = exec.merged_headers(&case(json!({})), DispatchKind::Multipart);
        assert!(map.get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn base_url_override_trims_slash() {
        let exec = executor(&[]).with_base_url("http://localhost:8080/");
        assert_eq!(exec.base_url(), "http://localhost:8080");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let body = "é".repeat(MAX_LOGGED_BODY_BYTES);
        let cut = truncate(&body);
        assert!(cut.ends_with(&format!("({} bytes total)", body.len())));
        assert_eq!(truncate("short"), "short");
    }
}
