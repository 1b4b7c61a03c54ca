#![allow(dead_code)]

use axum_test::TestServer;
use openapi_mcp_server::openapi::{loader::parse_document, Invoker, OpenApiDocument};
use openapi_mcp_server::{transport, McpServer};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const INVENTORY_SPEC: &str = r#"
openapi: 3.0.0
info:
  title: Inventory API
  version: 1.0.0
paths:
  /items:
    get:
      operationId: listItems
      summary: List items
      parameters:
        - name: limit
          in: query
          schema:
            type: integer
    post:
      operationId: createItem
      requestBody:
        required: true
        content:
          application/json:
            schema:
              type: object
  /items/{id}:
    get:
      summary: Get one item
      parameters:
        - name: id
          in: path
          required: true
          schema:
            type: string
"#;

pub fn inventory_document() -> OpenApiDocument {
    parse_document(INVENTORY_SPEC, "inventory.yaml").unwrap()
}

/// MCP server whose tools call `base_url`
pub fn create_mcp_server(base_url: &str) -> Arc<McpServer> {
    let invoker = Invoker::new(Duration::from_secs(5)).unwrap();
    Arc::new(McpServer::from_document(
        &inventory_document(),
        invoker,
        base_url.to_string(),
    ))
}

/// Create a test server for the HTTP transport
pub fn create_test_server(base_url: &str) -> TestServer {
    let app = transport::create_app(create_mcp_server(base_url));
    TestServer::new(app).unwrap()
}

pub fn rpc(id: i64, method: &str, params: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
}

pub fn tool_call(id: i64, name: &str, arguments: Value) -> Value {
    rpc(id, "tools/call", json!({"name": name, "arguments": arguments}))
}

/// Text of the first content block of a `tools/call` response
pub fn result_text(response: &Value) -> &str {
    response["result"]["content"][0]["text"].as_str().unwrap_or_default()
}
