use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, error, info_span, Instrument};

use crate::error::UnknownOperation;
use crate::mcp::ToolDefinition;
use crate::openapi::{bind, CallResult, Invoker, RequestContext};

mod registry;
pub mod schema;

pub use registry::Registry;

/// Operations exposed as tools: listing plus dispatch by name.
pub struct ToolRegistry {
    registry: Registry,
    invoker: Invoker,
    base_url: String,
}

impl ToolRegistry {
    pub fn new(registry: Registry, invoker: Invoker, base_url: impl Into<String>) -> Self {
        Self {
            registry,
            invoker,
            base_url: base_url.into(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        debug!("Listing {} available tools", self.registry.len());
        self.registry
            .list()
            .iter()
            .map(|descriptor| ToolDefinition {
                name: descriptor.id.clone(),
                description: schema::tool_description(descriptor),
                input_schema: schema::input_schema(descriptor),
            })
            .collect()
    }

    /// Binds and executes one call. Everything past the lookup is reported as a
    /// `CallResult`, including bind failures, which never reach the network.
    pub async fn call_tool(
        &self,
        name: &str,
        args: &HashMap<String, Value>,
        context: &RequestContext,
    ) -> Result<CallResult, UnknownOperation> {
        let descriptor = match self.registry.get(name) {
            Some(descriptor) => descriptor,
            None => {
                error!("Tool '{}' not found", name);
                return Err(UnknownOperation(name.to_string()));
            }
        };

        let span = info_span!(
            "tool_call",
            tool = %name,
            correlation_id = %uuid::Uuid::new_v4()
        );

        let result = async {
            let request = match bind(descriptor, args, context, &self.base_url) {
                Ok(request) => request,
                Err(e) => {
                    error!("Could not bind arguments: {}", e);
                    return CallResult::Error(format!("Error: {}", e));
                }
            };

            let result = self.invoker.invoke(request).await;
            debug!("Tool finished, error: {}", result.is_error());
            result
        }
        .instrument(span)
        .await;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openapi::{build_registry, invoker::DEFAULT_TIMEOUT, OpenApiDocument};
    use serde_json::json;

    fn tools(base_url: &str) -> ToolRegistry {
        let document = OpenApiDocument::from_value(json!({
            "paths": {
                "/items/{id}": {
                    "get": {
                        "summary": "Fetch an item",
                        "parameters": [{"name": "id", "in": "path", "required": true}]
                    }
                }
            }
        }));
        ToolRegistry::new(
            build_registry(&document),
            Invoker::new(DEFAULT_TIMEOUT).unwrap(),
            base_url,
        )
    }

    #[test]
    fn test_list_tools() {
        let listed = tools("https://api.test").list_tools();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "get_items_id");
        assert_eq!(listed[0].input_schema["required"], json!(["id"]));
        assert!(listed[0].description.starts_with("Fetch an item"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let result = tools("https://api.test")
            .call_tool("nope", &HashMap::new(), &RequestContext::new())
            .await;
        assert_eq!(result, Err(UnknownOperation("nope".to_string())));
    }

    #[tokio::test]
    async fn test_bind_error_is_call_result() {
        // unroutable base URL: the call must fail before any request is attempted
        let result = tools("http://192.0.2.1")
            .call_tool("get_items_id", &HashMap::new(), &RequestContext::new())
            .await
            .unwrap();
        assert_eq!(
            result,
            CallResult::Error("Error: Missing required path parameter: id".to_string())
        );
    }
}
