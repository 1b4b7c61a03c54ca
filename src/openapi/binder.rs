use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;

use super::{value_to_string, OperationDescriptor, ParameterLocation, RequestContext};
use crate::error::BindError;

lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{([^{}]+)\}").unwrap();
}

/// Fully specified outbound request, ready for the invoker.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// Names of the `{name}` placeholders in a path template, in order.
pub fn placeholders(template: &str) -> Vec<&str> {
    PLACEHOLDER
        .captures_iter(template)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Maps caller arguments and ambient context onto an HTTP request.
///
/// `null` arguments are treated as absent. Required-ness is not enforced here,
/// except that every path placeholder must be filled.
pub fn bind(
    descriptor: &OperationDescriptor,
    arguments: &HashMap<String, Value>,
    context: &RequestContext,
    base_url: &str,
) -> Result<BoundRequest, BindError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let mut query: Vec<(String, String)> = context
        .query_params
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    if let Some(auth) = context.authorization() {
        let value = HeaderValue::from_str(auth).map_err(|e| BindError::InvalidHeader {
            name: AUTHORIZATION.to_string(),
            message: e.to_string(),
        })?;
        headers.insert(AUTHORIZATION, value);
    }

    let mut path_values: HashMap<&str, String> = HashMap::new();

    for param in &descriptor.parameters {
        let value = match arguments.get(&param.name) {
            Some(Value::Null) | None => continue,
            Some(value) => value,
        };

        match param.location {
            ParameterLocation::Path => {
                path_values.insert(param.name.as_str(), value_to_string(value));
            }
            ParameterLocation::Query => set_query(&mut query, &param.name, value_to_string(value)),
            ParameterLocation::Header => {
                let name = HeaderName::from_bytes(param.name.as_bytes()).map_err(|e| {
                    BindError::InvalidHeader {
                        name: param.name.clone(),
                        message: e.to_string(),
                    }
                })?;
                let header_value = HeaderValue::from_str(&value_to_string(value)).map_err(|e| {
                    BindError::InvalidHeader {
                        name: param.name.clone(),
                        message: e.to_string(),
                    }
                })?;
                headers.insert(name, header_value);
            }
        }
    }

    // A declared parameter named `body` takes precedence over the request body.
    let body = if descriptor.parameter("body").is_none() {
        arguments.get("body").filter(|v| !v.is_null()).cloned()
    } else {
        None
    };

    let path = substitute_path(&descriptor.path_template, &path_values)?;

    Ok(BoundRequest {
        method: descriptor.http_method.clone(),
        url: format!("{}{}", base_url, path),
        headers,
        query,
        body,
    })
}

fn set_query(query: &mut Vec<(String, String)>, name: &str, value: String) {
    match query.iter_mut().find(|(k, _)| k == name) {
        Some(entry) => entry.1 = value,
        None => query.push((name.to_string(), value)),
    }
}

fn substitute_path(template: &str, values: &HashMap<&str, String>) -> Result<String, BindError> {
    let mut path = String::with_capacity(template.len());
    let mut last = 0;

    for captures in PLACEHOLDER.captures_iter(template) {
        let (whole, name) = match (captures.get(0), captures.get(1)) {
            (Some(whole), Some(name)) => (whole, name.as_str()),
            _ => continue,
        };
        let value = values
            .get(name)
            .ok_or_else(|| BindError::MissingPathParameter(name.to_string()))?;

        path.push_str(&template[last..whole.start()]);
        path.push_str(&urlencoding::encode(value));
        last = whole.end();
    }

    path.push_str(&template[last..]);
    Ok(path)
}
