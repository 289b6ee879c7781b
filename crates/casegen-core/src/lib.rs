//! casegen-core: Swagger extraction, prompt contract and test-case model
//!
//! Pure logic only. Everything here is deterministic and free of network
//! I/O; fetching documents, calling the model and sending requests live in
//! `casegen-runner`.

pub mod case;
pub mod config;
pub mod endpoint;
pub mod extract;
pub mod multipart;
pub mod prompt;
pub mod repair;
pub mod resolve;
pub mod synth;
pub mod validate;

pub use case::{
    ExecutedCase, Outcome, RequestPayload, RunReport, RunSummary, TestCase, TestStatus,
    generate_schema,
};
pub use config::{ApiConfig, Config, ConfigError, LlmConfig};
pub use endpoint::{
    Endpoint, ExtractedDocument, HttpMethod, ParamLocation, Parameter, RequestBody, ResponseSpec,
};
pub use extract::{ExtractError, extract};
pub use multipart::{DispatchKind, MultipartPlan, dispatch_kind, split_form};
pub use prompt::build_prompt;
pub use repair::{MalformedGenerationError, parse_test_cases};
pub use resolve::resolve;
pub use synth::synthesize;
pub use validate::{RejectReason, Rejection, TestCaseValidator};
