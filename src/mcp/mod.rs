use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::apigee;
use crate::config::Config;
use crate::openapi::{self, CallResult, Invoker, OpenApiDocument, RequestContext, SpecSource};
use crate::tools::ToolRegistry;

pub mod types;
pub use types::*;

pub const DEFAULT_SERVER_NAME: &str = "OpenAPI MCP Server";

/// JSON-RPC front end over the tool registry.
///
/// Holds no per-connection state; the ambient context of each message is
/// passed in by the transport.
pub struct McpServer {
    tools: ToolRegistry,
    server_name: String,
}

impl McpServer {
    pub fn new(tools: ToolRegistry, server_name: impl Into<String>) -> Self {
        Self {
            tools,
            server_name: server_name.into(),
        }
    }

    /// Loads the document named by `config` and builds the tool registry.
    /// Any failure here is fatal: the process must not serve without tools.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let invoker = Invoker::new(config.timeout())?;

        let (source, document) = match (&config.openapi_spec, &config.apigee_proxy_xml) {
            (Some(location), _) => {
                let source = SpecSource::parse(location);
                let document = openapi::load(&source, invoker.client(), config.timeout()).await?;
                (source, document)
            }
            (None, Some(xml_path)) => {
                let proxy = apigee::load_proxy_xml(xml_path)?;
                info!(
                    "Generating OpenAPI spec for proxy '{}' (base path '{}', {} flows)",
                    config.proxy_name,
                    proxy.base_path,
                    proxy.flows.len()
                );
                let document = apigee::generate_openapi_spec(&proxy, &config.proxy_name);
                (SpecSource::Document(document.clone()), document)
            }
            (None, None) => anyhow::bail!("Either an OpenAPI spec or an Apigee proxy XML file is required"),
        };

        let base_url = openapi::resolve_base_url(&document, config.base_url.as_deref(), &source);
        info!("Using API base URL: {}", base_url);

        Ok(Self::from_document(&document, invoker, base_url))
    }

    pub fn from_document(document: &OpenApiDocument, invoker: Invoker, base_url: String) -> Self {
        let registry = openapi::build_registry(document);
        info!("Registered {} tools", registry.len());

        let server_name = document.title().unwrap_or(DEFAULT_SERVER_NAME).to_string();
        Self::new(ToolRegistry::new(registry, invoker, base_url), server_name)
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Handles one JSON-RPC message. Returns `None` for notifications.
    pub async fn handle_message(&self, message: &str, context: &RequestContext) -> Option<String> {
        let message = message.trim();
        if message.is_empty() {
            return None;
        }

        debug!("Received message: {}", message);

        let value: Value = match serde_json::from_str(message) {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to parse JSON-RPC request: {}", e);
                return Some(self.create_error_response(None, PARSE_ERROR, "Parse error", None));
            }
        };

        let id = value.get("id").cloned().filter(|id| !id.is_null());
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                error!("Invalid JSON-RPC request: {}", e);
                return Some(self.create_error_response(
                    id,
                    INVALID_REQUEST,
                    "Invalid Request",
                    Some(Value::String(e.to_string())),
                ));
            }
        };

        if request.is_notification() {
            debug!("Received notification {}", request.method);
            return None;
        }

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(self.create_error_response(
                request.id.clone(),
                INVALID_REQUEST,
                "Invalid Request",
                Some(Value::String(format!("Unsupported jsonrpc version '{}'", request.jsonrpc))),
            ));
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(&request),
            "ping" => self.create_success_response(request.id.clone(), serde_json::json!({})),
            "tools/list" => self.handle_tools_list(&request),
            "tools/call" => self.handle_tool_call(&request, context).await,
            "resources/list" => {
                self.create_success_response(request.id.clone(), serde_json::json!({"resources": []}))
            }
            "prompts/list" => {
                self.create_success_response(request.id.clone(), serde_json::json!({"prompts": []}))
            }
            _ => self.create_error_response(
                request.id.clone(),
                METHOD_NOT_FOUND,
                &format!("Method not found: {}", request.method),
                None,
            ),
        };

        Some(response)
    }

    fn handle_initialize(&self, request: &JsonRpcRequest) -> String {
        let params: InitializeParams = request
            .params
            .clone()
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();

        if let Some(client) = &params.client_info {
            info!("Handling initialize request from {} {}", client.name, client.version);
        } else {
            info!("Handling initialize request");
        }

        // Echo the client's revision when we speak it, otherwise offer our newest.
        let protocol_version = params
            .protocol_version
            .filter(|v| SUPPORTED_PROTOCOL_VERSIONS.contains(&v.as_str()))
            .unwrap_or_else(|| SUPPORTED_PROTOCOL_VERSIONS[0].to_string());

        let init_result = InitializeResult {
            protocol_version,
            capabilities: Capabilities {
                tools: Some(ToolCapabilities { list_changed: Some(false) }),
            },
            server_info: ServerInfo {
                name: self.server_name.clone(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        self.create_success_response(request.id.clone(), init_result)
    }

    fn handle_tools_list(&self, request: &JsonRpcRequest) -> String {
        debug!("Handling tools/list request");
        let result = ToolsListResult {
            tools: self.tools.list_tools(),
        };
        self.create_success_response(request.id.clone(), result)
    }

    async fn handle_tool_call(&self, request: &JsonRpcRequest, context: &RequestContext) -> String {
        let params = match request.params.as_ref() {
            Some(value) => match serde_json::from_value::<ToolCallParams>(value.clone()) {
                Ok(p) => p,
                Err(e) => {
                    error!("Invalid tool call parameters: {}", e);
                    return self.create_error_response(
                        request.id.clone(),
                        INVALID_PARAMS,
                        "Invalid params",
                        Some(Value::String(e.to_string())),
                    );
                }
            },
            None => {
                error!("Missing parameters in tool call request");
                return self.create_error_response(request.id.clone(), INVALID_PARAMS, "Missing params", None);
            }
        };

        debug!("Handling tool call for {} with argument names {:?}", params.name, params.arguments.keys());
        match self.tools.call_tool(&params.name, &params.arguments, context).await {
            Ok(result) => {
                if let CallResult::Error(message) = &result {
                    warn!("Tool {} returned an error: {}", params.name, message);
                }
                let response = ToolCallResult {
                    content: vec![ContentBlock::text(&result.to_text())],
                    is_error: result.is_error(),
                };
                self.create_success_response(request.id.clone(), response)
            }
            Err(e) => self.create_error_response(
                request.id.clone(),
                METHOD_NOT_FOUND,
                "Tool not found",
                Some(Value::String(e.to_string())),
            ),
        }
    }

    fn create_success_response<T: Serialize>(&self, id: Option<Value>, result: T) -> String {
        match serde_json::to_value(result) {
            Ok(result) => serialize_response(&JsonRpcResponse {
                jsonrpc: JSONRPC_VERSION.to_string(),
                id,
                result: Some(result),
                error: None,
            }),
            Err(e) => self.create_error_response(
                id,
                INTERNAL_ERROR,
                "Internal error",
                Some(Value::String(e.to_string())),
            ),
        }
    }

    fn create_error_response(
        &self,
        id: Option<Value>,
        code: i32,
        message: &str,
        data: Option<Value>,
    ) -> String {
        let error = JsonRpcError {
            code,
            message: message.to_string(),
            data,
        };
        serialize_response(&JsonRpcResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        })
    }
}

fn serialize_response(response: &JsonRpcResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| {
        error!("Failed to serialize JSON-RPC response: {}", e);
        format!(
            r#"{{"jsonrpc":"2.0","id":null,"error":{{"code":{},"message":"Internal error"}}}}"#,
            INTERNAL_ERROR
        )
    })
}
