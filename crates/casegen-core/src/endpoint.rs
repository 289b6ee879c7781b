//! Typed endpoint records extracted from a Swagger 2.0 document

use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// HTTP verbs that produce endpoints. Anything else in a path item is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub const ALL: [Self; 5] = [Self::Get, Self::Post, Self::Put, Self::Delete, Self::Patch];

    /// Match a path-item key (`get`, `POST`, ...) case-insensitively.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(key))
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }

    /// Methods whose requests conventionally carry a body.
    #[must_use]
    pub const fn has_body(self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Swagger 2.0 parameter location (`in`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ParamLocation {
    Query,
    Path,
    Header,
    Body,
    FormData,
}

impl ParamLocation {
    #[must_use]
    pub fn from_swagger(value: &str) -> Option<Self> {
        match value {
            "query" => Some(Self::Query),
            "path" => Some(Self::Path),
            "header" => Some(Self::Header),
            "body" => Some(Self::Body),
            "formData" => Some(Self::FormData),
            _ => None,
        }
    }
}

/// One operation parameter, as declared in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParamLocation,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    /// Primitive type for non-body parameters (`string`, `integer`, `file`, ...)
    #[serde(rename = "type", default)]
    pub param_type: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    /// Ref-resolved schema (body parameters only)
    #[serde(default)]
    pub schema: Option<Value>,
    /// Allowed literal values, in declaration order
    #[serde(rename = "enum", default)]
    pub allowed: Vec<Value>,
    /// Element schema for `type: array`
    #[serde(default)]
    pub items: Option<Value>,
}

/// Request body of an endpoint: the `body` parameter's schema, or an object
/// schema merged from `formData` parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RequestBody {
    #[serde(default)]
    pub required: bool,
    /// Ref-free schema; `{}` when the endpoint takes no body
    #[serde(default = "empty_schema")]
    pub schema: Value,
}

impl Default for RequestBody {
    fn default() -> Self {
        Self {
            required: false,
            schema: empty_schema(),
        }
    }
}

impl RequestBody {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schema.as_object().is_none_or(Map::is_empty)
    }
}

/// Declared response for one status code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResponseSpec {
    #[serde(default)]
    pub description: String,
    #[serde(default = "empty_schema")]
    pub schema: Value,
}

/// Security requirement object: scheme name → required scopes.
pub type SecurityRequirement = BTreeMap<String, Vec<String>>;

/// A single `path × method` entry of the document.
///
/// `full_path` is always `base_path + path` and `operation_id` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Endpoint {
    pub full_path: String,
    pub path: String,
    pub method: HttpMethod,
    pub operation_id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub request_body: RequestBody,
    /// Keyed by status code string (`"200"`, `"default"`, ...)
    #[serde(default)]
    pub responses: BTreeMap<String, ResponseSpec>,
    #[serde(default)]
    pub security: Vec<SecurityRequirement>,
}

impl Endpoint {
    /// `"GET /pets"` style label used in logs and reports.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Result of walking one document. An empty endpoint list means extraction failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedDocument {
    pub endpoints: Vec<Endpoint>,
    /// Raw `definitions` table, kept for prompt building downstream
    #[serde(default)]
    pub definitions: Map<String, Value>,
}

impl ExtractedDocument {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    #[must_use]
    pub fn find(&self, operation_id: &str) -> Option<&Endpoint> {
        self.endpoints
            .iter()
            .find(|e| e.operation_id == operation_id)
    }
}

pub(crate) fn empty_schema() -> Value {
    Value::Object(Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_from_key_is_case_insensitive() {
        assert_eq!(HttpMethod::from_key("get"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::from_key("PATCH"), Some(HttpMethod::Patch));
        assert_eq!(HttpMethod::from_key("options"), None);
        assert_eq!(HttpMethod::from_key("parameters"), None);
    }

    #[test]
    fn parameter_serializes_with_swagger_names() {
        let param = Parameter {
            name: "status".into(),
            location: ParamLocation::Query,
            description: String::new(),
            required: true,
            param_type: Some("string".into()),
            format: None,
            schema: None,
            allowed: vec![serde_json::json!("available")],
            items: None,
        };
        let value = serde_json::to_value(&param).unwrap();
        assert_eq!(value["in"], "query");
        assert_eq!(value["type"], "string");
        assert_eq!(value["enum"], serde_json::json!(["available"]));
    }

    #[test]
    fn form_data_location_round_trips() {
        let loc: ParamLocation = serde_json::from_str(r#""formData""#).unwrap();
        assert_eq!(loc, ParamLocation::FormData);
        assert_eq!(ParamLocation::from_swagger("cookie"), None);
    }

    #[test]
    fn empty_request_body() {
        assert!(RequestBody::default().is_empty());
        let body = RequestBody {
            required: true,
            schema: serde_json::json!({"type": "object"}),
        };
        assert!(!body.is_empty());
    }
}
