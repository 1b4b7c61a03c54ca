//! OpenAPI document → callable operations.
//!
//! The flow is `loader` → `catalog` at startup, then `binder` → `invoker`
//! for every tool call.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

pub mod binder;
pub mod catalog;
pub mod invoker;
pub mod loader;

pub use binder::{bind, BoundRequest};
pub use catalog::build_registry;
pub use invoker::Invoker;
pub use loader::{load, resolve_base_url, SpecSource};

/// A parsed OpenAPI document. Only `info`, `servers` and `paths` are read.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenApiDocument(Value);

impl OpenApiDocument {
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn title(&self) -> Option<&str> {
        self.0
            .get("info")
            .and_then(|info| info.get("title"))
            .and_then(Value::as_str)
            .filter(|title| !title.is_empty())
    }

    /// `servers[0].url`, if present and non-empty.
    pub fn first_server_url(&self) -> Option<&str> {
        self.0
            .get("servers")
            .and_then(Value::as_array)
            .and_then(|servers| servers.first())
            .and_then(|server| server.get("url"))
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
    }

    pub fn paths(&self) -> Option<&Map<String, Value>> {
        self.0.get("paths").and_then(Value::as_object)
    }
}

/// Where a parameter is placed on the outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
}

impl ParameterLocation {
    /// Maps an OpenAPI `in` value. `text` is accepted as an alias of `path`
    /// because some generated documents use it.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "path" | "text" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
        }
    }
}

/// Supported parameter types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParameterType {
    /// Absent or unrecognised types fall back to `string`.
    pub fn from_schema(schema: Option<&Value>) -> Self {
        match schema.and_then(|s| s.get("type")).and_then(Value::as_str) {
            Some("integer") => Self::Integer,
            Some("number") => Self::Number,
            Some("boolean") => Self::Boolean,
            Some("array") => Self::Array,
            Some("object") => Self::Object,
            _ => Self::String,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

/// Defines a parameter of an operation
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDefinition {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub parameter_type: ParameterType,
    pub description: Option<String>,
}

/// The static description of one callable (path, method) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDescriptor {
    pub id: String,
    pub http_method: Method,
    pub path_template: String,
    pub parameters: Vec<ParameterDefinition>,
    pub has_body: bool,
    pub body_required: bool,
    pub body_description: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
}

impl OperationDescriptor {
    pub fn parameter(&self, name: &str) -> Option<&ParameterDefinition> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Inbound metadata of the transport connection a call arrives on.
///
/// Header names are stored lower-cased.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    pub headers: HashMap<String, String>,
    pub query_params: BTreeMap<String, String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_query_param(mut self, name: &str, value: &str) -> Self {
        self.query_params.insert(name.to_string(), value.to_string());
        self
    }

    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("authorization"))
            .map(|(_, value)| value.as_str())
    }
}

/// Outcome of a single invocation. Errors are data, never raised.
#[derive(Debug, Clone, PartialEq)]
pub enum CallResult {
    Json(Value),
    Text(String),
    Error(String),
}

impl CallResult {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Text form handed back to the calling agent.
    pub fn to_text(&self) -> String {
        match self {
            Self::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            Self::Text(text) | Self::Error(text) => text.clone(),
        }
    }
}

/// Renders an argument for a query string, header or path segment.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
