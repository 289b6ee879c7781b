//! Swagger 2.0 endpoint extraction
//!
//! Walks `paths`, keeps GET/POST/PUT/DELETE/PATCH operations and builds typed
//! [`Endpoint`] records with ref-free schemas. A malformed operation is
//! logged and skipped; it never discards the endpoints already extracted.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};
use tracing::{debug, error, info, info_span, warn};

use crate::endpoint::{
    Endpoint, ExtractedDocument, HttpMethod, ParamLocation, Parameter, RequestBody, ResponseSpec,
    SecurityRequirement, empty_schema,
};
use crate::resolve::{ref_name, resolve};

pub const SUPPORTED_SWAGGER_VERSION: &str = "2.0";

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("unsupported Swagger version: {0} (only \"2.0\" is supported)")]
    UnsupportedVersion(String),
    #[error("{0} is not a JSON object")]
    NotAnObject(String),
    #[error("parameter #{index} has no {field}")]
    MissingField { index: usize, field: &'static str },
    #[error("parameter '{name}' has unknown location '{location}'")]
    UnknownLocation { name: String, location: String },
    #[error("parameter reference '{0}' not found")]
    UnresolvedParameter(String),
    #[error("malformed security requirement: {0}")]
    InvalidSecurity(String),
}

/// Extract every supported endpoint from a Swagger 2.0 document.
///
/// Never fails: a version mismatch or a document without paths yields an
/// empty [`ExtractedDocument`], a broken operation is skipped.
#[must_use]
pub fn extract(document: &Value) -> ExtractedDocument {
    let _span = info_span!("extract").entered();

    if let Err(e) = check_version(document) {
        error!("{e}");
        return ExtractedDocument::default();
    }
    info!("Swagger 2.0 document detected, extracting endpoints");

    let definitions = document
        .get("definitions")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let Some(paths) = document.get("paths").and_then(Value::as_object) else {
        warn!("document has no paths");
        return ExtractedDocument {
            endpoints: Vec::new(),
            definitions,
        };
    };

    let ctx = DocumentContext {
        base_path: document
            .get("basePath")
            .and_then(Value::as_str)
            .unwrap_or(""),
        definitions: &definitions,
        shared_parameters: document.get("parameters").and_then(Value::as_object),
        global_security: document.get("security"),
    };

    let mut endpoints = Vec::new();
    for (path, path_item) in paths {
        let Some(item) = path_item.as_object() else {
            warn!(path = %path, "path item is not an object, skipping");
            continue;
        };
        for (key, operation) in item {
            let Some(method) = HttpMethod::from_key(key) else {
                continue;
            };
            match ctx.endpoint(path, key, method, operation, item.get("parameters")) {
                Ok(endpoint) => {
                    debug!(endpoint = %endpoint.label(), operation_id = %endpoint.operation_id, "extracted");
                    endpoints.push(endpoint);
                }
                Err(e) => warn!(endpoint = %format!("{method} {path}"), "skipping endpoint: {e}"),
            }
        }
    }

    info!(count = endpoints.len(), "extracted endpoints");
    ExtractedDocument {
        endpoints,
        definitions,
    }
}

/// Reject anything that is not `swagger: "2.0"`.
///
/// # Errors
///
/// Returns [`ExtractError::UnsupportedVersion`] naming the version found.
pub fn check_version(document: &Value) -> Result<(), ExtractError> {
    match document.get("swagger") {
        Some(Value::String(v)) if v == SUPPORTED_SWAGGER_VERSION => Ok(()),
        Some(other) => Err(ExtractError::UnsupportedVersion(other.to_string())),
        None => Err(ExtractError::UnsupportedVersion("missing".into())),
    }
}

/// Document-wide tables an operation may refer to.
struct DocumentContext<'a> {
    base_path: &'a str,
    definitions: &'a Map<String, Value>,
    shared_parameters: Option<&'a Map<String, Value>>,
    global_security: Option<&'a Value>,
}

impl DocumentContext<'_> {
    fn endpoint(
        &self,
        path: &str,
        method_key: &str,
        method: HttpMethod,
        operation: &Value,
        path_parameters: Option<&Value>,
    ) -> Result<Endpoint, ExtractError> {
        let op = operation
            .as_object()
            .ok_or_else(|| ExtractError::NotAnObject(format!("operation {method} {path}")))?;

        let parameters = self.parameters(path_parameters, op.get("parameters"))?;
        let request_body = self.request_body(&parameters);

        let responses = op
            .get("responses")
            .and_then(Value::as_object)
            .map(|responses| {
                responses
                    .iter()
                    .map(|(code, resp)| (code.clone(), self.response(resp)))
                    .collect()
            })
            .unwrap_or_default();

        let security = match op.get("security").or(self.global_security) {
            Some(value) => parse_security(value)?,
            None => Vec::new(),
        };

        let operation_id = op
            .get("operationId")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map_or_else(
                || format!("{}_{}", method_key.to_lowercase(), path.replace('/', "_")),
                String::from,
            );

        Ok(Endpoint {
            full_path: format!("{}{path}", self.base_path),
            path: path.to_string(),
            method,
            operation_id,
            summary: string_field(op, "summary"),
            description: string_field(op, "description"),
            tags: op
                .get("tags")
                .and_then(Value::as_array)
                .map(|tags| {
                    tags.iter()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            parameters,
            request_body,
            responses,
            security,
        })
    }

    /// Path-level parameters first, overridden by operation-level ones with
    /// the same name and location.
    fn parameters(
        &self,
        path_level: Option<&Value>,
        op_level: Option<&Value>,
    ) -> Result<Vec<Parameter>, ExtractError> {
        let mut params: Vec<Parameter> = Vec::new();
        for source in [path_level, op_level].into_iter().flatten() {
            let Some(list) = source.as_array() else {
                return Err(ExtractError::NotAnObject("parameters list".into()));
            };
            for (index, raw) in list.iter().enumerate() {
                let param = self.parameter(index, raw)?;
                if let Some(existing) = params
                    .iter_mut()
                    .find(|p| p.name == param.name && p.location == param.location)
                {
                    *existing = param;
                } else {
                    params.push(param);
                }
            }
        }
        Ok(params)
    }

    fn parameter(&self, index: usize, raw: &Value) -> Result<Parameter, ExtractError> {
        let raw = match raw.get("$ref").and_then(Value::as_str) {
            Some(reference) => self
                .shared_parameters
                .and_then(|shared| shared.get(ref_name(reference)))
                .ok_or_else(|| ExtractError::UnresolvedParameter(reference.to_string()))?,
            None => raw,
        };
        let obj = raw
            .as_object()
            .ok_or_else(|| ExtractError::NotAnObject(format!("parameter #{index}")))?;

        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or(ExtractError::MissingField { index, field: "name" })?
            .to_string();
        let location_str = obj
            .get("in")
            .and_then(Value::as_str)
            .ok_or(ExtractError::MissingField { index, field: "in" })?;
        let location =
            ParamLocation::from_swagger(location_str).ok_or_else(|| ExtractError::UnknownLocation {
                name: name.clone(),
                location: location_str.to_string(),
            })?;

        Ok(Parameter {
            name,
            location,
            description: string_field(obj, "description"),
            required: obj.get("required").and_then(Value::as_bool).unwrap_or(false),
            param_type: obj.get("type").and_then(Value::as_str).map(String::from),
            format: obj.get("format").and_then(Value::as_str).map(String::from),
            schema: obj.get("schema").map(|s| resolve(s, self.definitions)),
            allowed: obj
                .get("enum")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            items: obj.get("items").cloned(),
        })
    }

    /// `body` parameter wins; otherwise `formData` fields are merged into an
    /// object schema; otherwise the endpoint has no body.
    fn request_body(&self, parameters: &[Parameter]) -> RequestBody {
        if let Some(body) = parameters.iter().find(|p| p.location == ParamLocation::Body) {
            return RequestBody {
                required: body.required,
                schema: body.schema.clone().unwrap_or_else(empty_schema),
            };
        }

        let form_fields: Vec<&Parameter> = parameters
            .iter()
            .filter(|p| p.location == ParamLocation::FormData)
            .collect();
        if form_fields.is_empty() {
            return RequestBody::default();
        }

        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &form_fields {
            properties.insert(field.name.clone(), form_field_schema(field));
            if field.required {
                required.push(Value::String(field.name.clone()));
            }
        }
        // A form body is always sent, even when every field is optional
        RequestBody {
            required: true,
            schema: json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        }
    }

    fn response(&self, raw: &Value) -> ResponseSpec {
        ResponseSpec {
            description: raw
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            schema: raw
                .get("schema")
                .map_or_else(empty_schema, |s| resolve(s, self.definitions)),
        }
    }
}

/// Schema property mirroring one `formData` field. `type: file` becomes a
/// binary string so downstream code treats it as an upload.
fn form_field_schema(field: &Parameter) -> Value {
    let param_type = field.param_type.as_deref().unwrap_or("string");
    let mut schema = Map::new();
    if param_type == "file" {
        schema.insert("type".into(), json!("string"));
        schema.insert("format".into(), json!("binary"));
    } else {
        schema.insert("type".into(), json!(param_type));
        if let Some(format) = &field.format {
            schema.insert("format".into(), json!(format));
        }
        if !field.allowed.is_empty() {
            schema.insert("enum".into(), Value::Array(field.allowed.clone()));
        }
        if let Some(items) = &field.items {
            schema.insert("items".into(), items.clone());
        }
    }
    schema.insert("description".into(), json!(field.description));
    Value::Object(schema)
}

fn parse_security(value: &Value) -> Result<Vec<SecurityRequirement>, ExtractError> {
    let list = value
        .as_array()
        .ok_or_else(|| ExtractError::InvalidSecurity("expected a list".into()))?;
    list.iter()
        .map(|req| {
            let obj = req
                .as_object()
                .ok_or_else(|| ExtractError::InvalidSecurity(req.to_string()))?;
            obj.iter()
                .map(|(scheme, scopes)| {
                    let scopes = scopes
                        .as_array()
                        .ok_or_else(|| ExtractError::InvalidSecurity(format!("{scheme}: {scopes}")))?
                        .iter()
                        .filter_map(Value::as_str)
                        .map(String::from)
                        .collect();
                    Ok((scheme.clone(), scopes))
                })
                .collect::<Result<BTreeMap<_, _>, _>>()
        })
        .collect()
}

fn string_field(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
