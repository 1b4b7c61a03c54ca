use reqwest::Method;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use super::binder::placeholders;
use super::{
    OpenApiDocument, OperationDescriptor, ParameterDefinition, ParameterLocation, ParameterType,
};
use crate::tools::Registry;

/// Builds the registry of every supported (path, method) pair in `document`.
pub fn build_registry(document: &OpenApiDocument) -> Registry {
    let mut registry = Registry::new();
    for descriptor in extract_operations(document) {
        info!(
            "Registering tool {} ({} {})",
            descriptor.id, descriptor.http_method, descriptor.path_template
        );
        registry.register(descriptor);
    }
    registry
}

/// Walks `paths` in document order. Malformed entries are skipped.
pub fn extract_operations(document: &OpenApiDocument) -> Vec<OperationDescriptor> {
    let mut operations = Vec::new();

    let paths = match document.paths() {
        Some(paths) => paths,
        None => {
            warn!("OpenAPI spec has no 'paths' object");
            return operations;
        }
    };

    for (path, path_item) in paths {
        let path_item = match path_item.as_object() {
            Some(item) => item,
            None => {
                debug!("Skipping malformed path item {}", path);
                continue;
            }
        };

        let path_level_params = path_item.get("parameters");

        for (method_name, operation) in path_item {
            let method = match supported_method(method_name) {
                Some(m) => m,
                None => continue,
            };

            let operation = match operation.as_object() {
                Some(op) => op,
                None => {
                    debug!("Skipping malformed operation {} {}", method_name, path);
                    continue;
                }
            };

            operations.push(describe_operation(path, method, operation, path_level_params));
        }
    }

    operations
}

fn supported_method(name: &str) -> Option<Method> {
    match name.to_ascii_lowercase().as_str() {
        "get" => Some(Method::GET),
        "post" => Some(Method::POST),
        "put" => Some(Method::PUT),
        "delete" => Some(Method::DELETE),
        "patch" => Some(Method::PATCH),
        _ => None,
    }
}

fn describe_operation(
    path: &str,
    method: Method,
    operation: &Map<String, Value>,
    path_level_params: Option<&Value>,
) -> OperationDescriptor {
    let id = match operation
        .get("operationId")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
    {
        Some(id) => id.to_string(),
        None => {
            let generated = synthesize_operation_id(&method, path);
            debug!("No operationId for {} {}, using {}", method, path, generated);
            generated
        }
    };

    let mut parameters = collect_parameters(path_level_params);
    for param in collect_parameters(operation.get("parameters")) {
        match parameters
            .iter_mut()
            .find(|p| p.name == param.name && p.location == param.location)
        {
            Some(existing) => *existing = param,
            None => parameters.push(param),
        }
    }

    check_path_parameters(&id, path, &parameters);

    let request_body = operation.get("requestBody").filter(|body| body.is_object());
    let has_body = request_body.is_some() && method != Method::GET && method != Method::HEAD;
    let body_required = has_body
        && request_body
            .and_then(|body| body.get("required"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
    let body_description = request_body
        .filter(|_| has_body)
        .and_then(|body| body.get("description"))
        .and_then(Value::as_str)
        .map(str::to_string);

    OperationDescriptor {
        id,
        http_method: method,
        path_template: path.to_string(),
        parameters,
        has_body,
        body_required,
        body_description,
        summary: non_empty_str(operation.get("summary")),
        description: non_empty_str(operation.get("description")),
    }
}

/// `GET /users/{id}` becomes `get_users_id`.
pub fn synthesize_operation_id(method: &Method, path: &str) -> String {
    let mut id = method.as_str().to_ascii_lowercase();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let segment: String = segment.chars().filter(|c| *c != '{' && *c != '}').collect();
        if segment.is_empty() {
            continue;
        }
        id.push('_');
        id.push_str(&segment);
    }
    id
}

fn collect_parameters(params: Option<&Value>) -> Vec<ParameterDefinition> {
    let params = match params.and_then(Value::as_array) {
        Some(p) => p,
        None => return Vec::new(),
    };

    params
        .iter()
        .filter_map(|param| {
            let name = match param.get("name").and_then(Value::as_str) {
                Some(name) if !name.is_empty() => name,
                _ => {
                    debug!("Skipping parameter without a name: {}", param);
                    return None;
                }
            };

            let location_raw = param.get("in").and_then(Value::as_str).unwrap_or_default();
            let location = match ParameterLocation::parse(location_raw) {
                Some(location) => location,
                None => {
                    debug!("Skipping parameter {} with unsupported location '{}'", name, location_raw);
                    return None;
                }
            };

            Some(ParameterDefinition {
                name: name.to_string(),
                location,
                required: param.get("required").and_then(Value::as_bool).unwrap_or(false),
                parameter_type: ParameterType::from_schema(param.get("schema")),
                description: non_empty_str(param.get("description")),
            })
        })
        .collect()
}

fn check_path_parameters(id: &str, path: &str, parameters: &[ParameterDefinition]) {
    let in_template: BTreeSet<&str> = placeholders(path).into_iter().collect();
    let declared: BTreeSet<&str> = parameters
        .iter()
        .filter(|p| p.location == ParameterLocation::Path)
        .map(|p| p.name.as_str())
        .collect();

    if in_template != declared {
        warn!(
            "Tool {}: path placeholders {:?} do not match declared path parameters {:?}",
            id, in_template, declared
        );
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
