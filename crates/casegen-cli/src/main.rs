//! casegen CLI - LLM-generated API test cases from Swagger 2.0

mod storage;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use casegen_core::{
    Config, ExtractedDocument, RunReport, TestCase, TestStatus, build_prompt, generate_schema,
};
use casegen_runner::{
    ChatCompletionsClient, Executor, GenerationReport, generate_test_cases, load_document,
    select_endpoints,
};

use crate::storage::ReportStore;

#[derive(Parser)]
#[command(name = "casegen")]
#[command(about = "Generate API test cases from Swagger 2.0 with an LLM and run them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: .casegen.toml in the working directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "terminal")]
    output: OutputFormat,

    /// Debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the endpoints of a Swagger document
    Extract {
        /// Swagger 2.0 file path or http(s) URL
        #[arg(short, long)]
        spec: String,
    },

    /// Print the generation prompt for one endpoint without calling the model
    Prompt {
        #[arg(short, long)]
        spec: String,

        /// operationId of the endpoint
        #[arg(long)]
        operation: String,
    },

    /// Generate test cases with the configured model
    Generate {
        #[arg(short, long)]
        spec: String,

        /// Only this operationId
        #[arg(long)]
        operation: Option<String>,

        /// Write the cases here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Execute a JSON file of test cases against the API
    Execute {
        #[arg(long)]
        cases: PathBuf,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Generate, then execute
    Run {
        #[arg(short, long)]
        spec: String,

        #[arg(long)]
        operation: Option<String>,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Initialize config file
    Init,

    /// Export JSON Schema for executed test-case files
    Schema,
}

#[derive(clap::Args)]
struct TargetArgs {
    /// Overrides api.base_url
    #[arg(long)]
    base_url: Option<String>,

    /// Per-request timeout in seconds (overrides api.timeout_secs)
    #[arg(long)]
    timeout: Option<u64>,
}

impl TargetArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.base_url {
            config.api.base_url.clone_from(url);
        }
        if let Some(secs) = self.timeout {
            config.api.timeout_secs = secs;
        }
    }
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Terminal,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(3)
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable. `RUST_LOG` wins over flags.
fn init_tracing(cli: &Cli) {
    let default = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    Ok(config)
}

fn run(cli: Cli) -> Result<i32> {
    let output = cli.output;
    match cli.command {
        Commands::Extract { spec } => {
            let config = load_config(cli.config.as_deref())?;
            let doc = load_document(&spec, config.api.timeout());
            if doc.endpoints.is_empty() {
                eprintln!("No endpoints found in {spec}");
                return Ok(2);
            }
            match output {
                OutputFormat::Terminal => print_endpoints(&doc),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&doc.endpoints)?),
            }
            Ok(0)
        }

        Commands::Prompt { spec, operation } => {
            let config = load_config(cli.config.as_deref())?;
            let doc = load_document(&spec, config.api.timeout());
            let Some(endpoint) = doc.find(&operation) else {
                eprintln!("No endpoint with operationId '{operation}'");
                return Ok(2);
            };
            print!("{}", build_prompt(endpoint, &doc.definitions));
            Ok(0)
        }

        Commands::Generate {
            spec,
            operation,
            out,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let generated = generate(&config, &spec, operation.as_deref())?;
            if generated.is_empty() {
                eprintln!("No test cases generated");
                return Ok(2);
            }

            let json = serde_json::to_string_pretty(&generated.cases)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("cannot write {}", path.display()))?;
                    eprintln!("Wrote {} test cases to {}", generated.cases.len(), path.display());
                }
                None => println!("{json}"),
            }
            Ok(0)
        }

        Commands::Execute { cases: path, target } => {
            let mut config = load_config(cli.config.as_deref())?;
            target.apply(&mut config);

            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            let cases: Vec<TestCase> = serde_json::from_str(&content)
                .with_context(|| format!("{} is not a JSON array of test cases", path.display()))?;
            if cases.is_empty() {
                eprintln!("No test cases to execute");
                return Ok(2);
            }

            execute(&config, &cases, output, Some(&path.display().to_string()))
        }

        Commands::Run {
            spec,
            operation,
            target,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            target.apply(&mut config);

            let generated = generate(&config, &spec, operation.as_deref())?;
            if generated.is_empty() {
                eprintln!("No test cases generated");
                return Ok(2);
            }
            execute(&config, &generated.cases, output, Some(&spec))
        }

        Commands::Init => {
            let config_path = Config::CANDIDATES[0];
            if Path::new(config_path).exists() {
                eprintln!("{config_path} already exists");
                return Ok(1);
            }

            std::fs::write(config_path, Config::example())?;
            println!("Created {config_path}");
            println!("\nEdit the file to configure:");
            println!("  - api.base_url: server the test cases run against");
            println!("  - api.headers: auth tokens, API keys");
            println!("  - llm: chat completions endpoint, model, API key variable");
            Ok(0)
        }

        Commands::Schema => {
            println!("{}", generate_schema());
            Ok(0)
        }
    }
}

fn generate(config: &Config, spec: &str, operation: Option<&str>) -> Result<GenerationReport> {
    let llm = ChatCompletionsClient::from_config(&config.llm)?;
    let doc = load_document(spec, config.api.timeout());
    let endpoints = select_endpoints(&doc.endpoints, operation);
    if let Some(op) = operation {
        if endpoints.is_empty() {
            eprintln!("No endpoint with operationId '{op}'");
        }
    }

    let generated = generate_test_cases(&endpoints, &doc.definitions, &llm);
    for failure in &generated.failures {
        eprintln!("  skipped {}: {}", failure.operation, failure.reason);
    }
    if !generated.rejected.is_empty() {
        eprintln!("  rejected {} malformed test cases", generated.rejected.len());
    }
    Ok(generated)
}

fn execute(
    config: &Config,
    cases: &[TestCase],
    output: OutputFormat,
    source: Option<&str>,
) -> Result<i32> {
    let executor = Executor::from_config(config);
    let report = executor.run(cases)?;

    match output {
        OutputFormat::Terminal => print_report(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    match ReportStore::home().and_then(|store| store.save(&report, config, executor.base_url(), source))
    {
        Ok(path) => info!(path = %path.display(), "report saved"),
        Err(e) => warn!("failed to save report: {e}"),
    }

    Ok(if report.summary.all_passed() { 0 } else { 1 })
}

fn print_endpoints(doc: &ExtractedDocument) {
    for endpoint in &doc.endpoints {
        let summary = if endpoint.summary.is_empty() {
            String::new()
        } else {
            format!("  {}", endpoint.summary)
        };
        println!(
            "{:<7} {:<40} {}{summary}",
            endpoint.method.as_str(),
            endpoint.full_path,
            endpoint.operation_id
        );
    }
    println!("\n{} endpoints", doc.endpoints.len());
}

fn print_report(report: &RunReport) {
    for result in &report.results {
        let case = &result.case;
        let outcome = &result.outcome;
        let detail = match outcome.status {
            TestStatus::Passed | TestStatus::Failed => format!(
                "expected {}, got {}",
                case.expected_status_code,
                outcome
                    .actual_status_code
                    .map_or_else(|| "-".to_string(), |c| c.to_string())
            ),
            TestStatus::Error => outcome.error.clone().unwrap_or_default(),
        };
        println!(
            "[{}] {} {} {} ({detail})",
            outcome.status,
            case.method.to_uppercase(),
            case.endpoint,
            case.name
        );
    }

    let icon = if report.summary.all_passed() { "PASS" } else { "FAIL" };
    println!("\n{icon}: {}", report.summary);
}
