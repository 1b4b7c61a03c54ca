//! Exposes the operations of an OpenAPI described HTTP API as Model Context
//! Protocol tools.

pub mod apigee;
pub mod config;
pub mod error;
pub mod mcp;
pub mod openapi;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use mcp::McpServer;
