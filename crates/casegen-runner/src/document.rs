//! Swagger document loading from a URL or a local file

use std::path::Path;
use std::time::Duration;

use casegen_core::{ExtractedDocument, extract};
use serde_json::Value;
use tracing::{error, info, info_span};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Fetch, parse and extract a Swagger 2.0 document.
///
/// Failures are logged and produce an empty document; callers treat "no
/// endpoints" as the failure signal.
#[must_use]
pub fn load_document(source: &str, timeout: Duration) -> ExtractedDocument {
    let _span = info_span!("load", source).entered();
    match read_document(source, timeout) {
        Ok(document) => extract(&document),
        Err(e) => {
            error!("cannot load document: {e}");
            ExtractedDocument::default()
        }
    }
}

/// Read the raw document as JSON.
///
/// # Errors
///
/// Returns error if the source cannot be fetched or read, or is neither
/// valid JSON nor valid YAML.
pub fn read_document(source: &str, timeout: Duration) -> Result<Value, LoadError> {
    if source.starts_with("http://") || source.starts_with("https://") {
        info!("fetching document over HTTP");
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LoadError::Http(e.to_string()))?;
        let content = client
            .get(source)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .and_then(reqwest::blocking::Response::text)
            .map_err(|e| LoadError::Http(e.to_string()))?;
        let path = source.split(['?', '#']).next().unwrap_or(source);
        parse_document(Path::new(path), &content)
    } else {
        let path = Path::new(source);
        let content = std::fs::read_to_string(path)
            .map_err(|e| LoadError::Io(format!("{}: {e}", path.display())))?;
        parse_document(path, &content)
    }
}

/// Parse a document from JSON or YAML.
///
/// Detection strategy: try extension first (`.yaml`/`.yml`), then fall back to
/// content sniffing (leading `{` → JSON, otherwise YAML).
///
/// # Errors
///
/// Returns [`LoadError::Parse`] naming the format that was attempted.
pub fn parse_document(path: &Path, content: &str) -> Result<Value, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let as_yaml = |content: &str| {
        serde_yml::from_str::<Value>(content).map_err(|e| LoadError::Parse(format!("Invalid YAML: {e}")))
    };
    let as_json = |content: &str| {
        serde_json::from_str::<Value>(content).map_err(|e| LoadError::Parse(format!("Invalid JSON: {e}")))
    };

    match ext.as_str() {
        "yaml" | "yml" => as_yaml(content),
        "json" => as_json(content),
        _ if content.trim_start().starts_with('{') => as_json(content),
        _ => as_yaml(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SWAGGER_YAML: &str = r#"swagger: "2.0"
basePath: /v2
paths:
  /pet/{petId}:
    get:
      operationId: getPetById
      parameters:
        - name: petId
          in: path
          required: true
          type: integer
      responses:
        "200":
          description: successful operation
"#;

    #[test]
    fn yaml_by_extension() {
        let doc = parse_document(Path::new("petstore.yaml"), SWAGGER_YAML).unwrap();
        assert_eq!(doc["swagger"], "2.0");
    }

    #[test]
    fn sniffs_content_without_extension() {
        let doc = parse_document(Path::new("swagger"), r#"{"swagger": "2.0"}"#).unwrap();
        assert_eq!(doc["swagger"], "2.0");
        let doc = parse_document(Path::new("swagger"), SWAGGER_YAML).unwrap();
        assert_eq!(doc["basePath"], "/v2");
    }

    #[test]
    fn invalid_json_names_format() {
        let err = parse_document(Path::new("a.json"), "{nope").unwrap_err();
        assert!(err.to_string().starts_with("Parse error: Invalid JSON"));
    }

    #[test]
    fn loads_local_file() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        file.write_all(SWAGGER_YAML.as_bytes()).unwrap();
        let source = file.path().to_str().unwrap();
        let doc = load_document(source, Duration::from_secs(1));
        assert_eq!(doc.endpoints.len(), 1);
        assert_eq!(doc.endpoints[0].full_path, "/v2/pet/{petId}");
    }

    #[test]
    fn missing_file_is_empty_document() {
        let doc = load_document("/no/such/swagger.json", Duration::from_secs(1));
        assert!(doc.is_empty());
    }

    #[test]
    fn read_error_for_missing_file() {
        let err = read_document("/no/such/swagger.json", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
