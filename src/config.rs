use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line and environment configuration.
///
/// Every option can also come from the environment (or a `.env` file).
#[derive(Debug, Clone, Parser)]
#[command(name = "openapi-mcp-server")]
#[command(about = "Expose an OpenAPI described HTTP API as Model Context Protocol (MCP) tools")]
pub struct Config {
    /// Path or http(s) URL of the OpenAPI document (YAML or JSON)
    #[arg(long, env = "OPENAPI_SPEC_PATH")]
    pub openapi_spec: Option<String>,

    /// Apigee proxy endpoint XML used to generate a document when no spec is given
    #[arg(long, env = "APIGEE_PROXY_XML")]
    pub apigee_proxy_xml: Option<PathBuf>,

    /// Proxy name used in the generated document title
    #[arg(long, env = "PROXY_NAME", default_value = "proxy")]
    pub proxy_name: String,

    /// Base URL for outbound API calls; defaults to the document's first server
    #[arg(long, env = "APIGEE_PROXY_BASE_URL")]
    pub base_url: Option<String>,

    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// Serve JSON-RPC over stdin/stdout instead of HTTP
    #[arg(long)]
    pub stdio: bool,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long)]
    pub quiet: bool,

    /// Timeout in seconds for the spec download and every outbound call
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub timeout_secs: u64,
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address {}:{}: {}", self.host, self.port, e))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.openapi_spec.is_none() && self.apigee_proxy_xml.is_none() {
            anyhow::bail!("Either --openapi-spec or --apigee-proxy-xml must be provided");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("--timeout-secs must be greater than zero");
        }
        Ok(())
    }
}
