//! casegen-runner: document loading, LLM generation and HTTP execution

pub mod document;
pub mod execute;
pub mod generate;
pub mod llm;

pub use document::{LoadError, load_document, read_document};
pub use execute::{ExecError, Executor};
pub use generate::{EndpointFailure, GenerationReport, generate_test_cases, select_endpoints};
pub use llm::{ChatCompletionsClient, LlmError, TextGenerator};
