//! Apigee proxy endpoint → OpenAPI document.
//!
//! Each proxy `Flow` whose condition names a path suffix and a verb becomes
//! one operation. The result feeds the same catalog as a hand-written spec.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::path::Path;
use tracing::debug;

use crate::error::ApigeeError;
use crate::openapi::OpenApiDocument;

lazy_static! {
    static ref PATH_SUFFIX: Regex = Regex::new(r#"proxy\.pathsuffix MatchesPath "([^"]+)""#).unwrap();
    static ref VERB: Regex = Regex::new(r#"request\.verb = "([^"]+)""#).unwrap();
    static ref PATH_PARAM: Regex = Regex::new(r"\{(\w+)\}").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flow {
    pub name: String,
    pub description: Option<String>,
    pub condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyInfo {
    pub base_path: String,
    pub flows: Vec<Flow>,
}

pub fn load_proxy_xml(path: &Path) -> Result<ProxyInfo, ApigeeError> {
    let xml = std::fs::read_to_string(path).map_err(|source| ApigeeError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    parse_proxy_xml(&xml)
}

/// Reads the first `BasePath` and every `Flow` element of a proxy endpoint.
pub fn parse_proxy_xml(xml: &str) -> Result<ProxyInfo, ApigeeError> {
    let document = roxmltree::Document::parse(xml)?;

    let base_path = document
        .descendants()
        .find(|node| node.has_tag_name("BasePath"))
        .and_then(|node| node.text())
        .map(|text| text.trim().to_string())
        .unwrap_or_default();

    let flows = document
        .descendants()
        .filter(|node| node.has_tag_name("Flow"))
        .map(|flow| Flow {
            name: flow.attribute("name").unwrap_or_default().to_string(),
            description: child_text(flow, "Description"),
            condition: child_text(flow, "Condition"),
        })
        .collect();

    Ok(ProxyInfo { base_path, flows })
}

fn child_text(node: roxmltree::Node, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Pulls the path suffix and verb out of a flow condition.
///
/// `/**` becomes `/{proxy+}` and `/*` becomes `/{id}`. Missing parts come
/// back as empty strings.
pub fn extract_path_and_method(condition: &str) -> (String, String) {
    let path = PATH_SUFFIX
        .captures(condition)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or_default();
    let method = VERB
        .captures(condition)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    let path = path.replace("/**", "/{proxy+}").replace("/*", "/{id}");
    (path, method)
}

pub fn generate_openapi_spec(proxy: &ProxyInfo, proxy_name: &str) -> OpenApiDocument {
    let mut paths = Map::new();

    for flow in &proxy.flows {
        let condition = match &flow.condition {
            Some(condition) => condition,
            None => continue,
        };

        let (path, method) = extract_path_and_method(condition);
        if path.is_empty() || method.is_empty() {
            debug!("Skipping flow {}: no path or verb in condition", flow.name);
            continue;
        }

        let mut operation = json!({
            "summary": flow.description.as_deref().unwrap_or(&flow.name),
            "operationId": flow.name.replace('-', "_"),
            "responses": {
                "200": {"description": "Successful operation"},
                "400": {"description": "Bad request"},
                "404": {"description": "Not found"},
                "500": {"description": "Internal server error"}
            }
        });

        let mut names: Vec<&str> = Vec::new();
        for name in PATH_PARAM.captures_iter(&path).filter_map(|c| c.get(1)) {
            if !names.contains(&name.as_str()) {
                names.push(name.as_str());
            }
        }
        let params: Vec<Value> = names
            .iter()
            .map(|name| {
                json!({
                    "name": name,
                    "in": "path",
                    "required": true,
                    "schema": {"type": "string"}
                })
            })
            .collect();
        if !params.is_empty() {
            operation["parameters"] = Value::Array(params);
        }

        let path_item = paths
            .entry(path.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(item) = path_item.as_object_mut() {
            item.insert(method.to_ascii_lowercase(), operation);
        }
    }

    let description = proxy
        .flows
        .iter()
        .find_map(|flow| flow.description.clone())
        .unwrap_or_else(|| format!("API specification for {}", proxy_name));

    OpenApiDocument::from_value(json!({
        "openapi": "3.0.0",
        "info": {
            "title": format!("{} API", proxy_name),
            "version": "1.0.0",
            "description": description
        },
        "paths": paths
    }))
}
