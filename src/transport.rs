use axum::{
    extract::{Query, State},
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        HeaderMap, Method, StatusCode,
    },
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

use crate::mcp::McpServer;
use crate::openapi::RequestContext;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Builds the HTTP application.
///
/// `POST /mcp` takes one JSON-RPC message; the inbound headers and query
/// string become the ambient context of any tool call it makes.
pub fn create_app(server: Arc<McpServer>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/mcp", post(mcp_handler))
        .route("/mcp/", post(mcp_handler))
        .route("/mcp/health", get(health_handler))
        .layer(cors)
        .with_state(server)
}

pub async fn run_http(server: Arc<McpServer>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_app(server);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);
    info!("  POST /mcp        - MCP JSON-RPC endpoint");
    info!("  GET  /mcp/health - Health check");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

async fn mcp_handler(
    State(server): State<Arc<McpServer>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: String,
) -> Response {
    let context = request_context(&headers, query);

    match server.handle_message(&body, &context).await {
        Some(response) => ([(CONTENT_TYPE, "application/json")], response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

async fn health_handler(State(server): State<Arc<McpServer>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: server.server_name().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Captures inbound headers (names lower-cased, `content-length` dropped)
/// and query parameters.
pub fn request_context(headers: &HeaderMap, query: HashMap<String, String>) -> RequestContext {
    let mut context = RequestContext::new();
    for (name, value) in headers {
        if *name == CONTENT_LENGTH {
            continue;
        }
        match value.to_str() {
            Ok(value) => {
                context.headers.insert(name.as_str().to_string(), value.to_string());
            }
            Err(_) => debug!("Ignoring non-text header {}", name),
        }
    }
    context.query_params.extend(query);
    context
}

/// Serves newline-delimited JSON-RPC. Each line runs on its own task, so a
/// slow upstream call does not hold up the rest; responses may come back
/// out of order and are matched by id. Lines that are not UTF-8 are skipped;
/// messages already read are still answered when stdin fails.
pub async fn run_stdio<R, W>(server: Arc<McpServer>, mut reader: R, mut writer: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    info!("Running in STDIO mode");

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let writer_task = tokio::spawn(async move {
        while let Some(response) = rx.recv().await {
            writer.write_all(response.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    let mut buf = Vec::new();
    let mut tasks = JoinSet::new();
    let context = Arc::new(RequestContext::new());

    let read_result = loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break Ok(()),
            Ok(_) => {}
            Err(e) => break Err(e),
        }

        while tasks.try_join_next().is_some() {}

        let line = match String::from_utf8(std::mem::take(&mut buf)) {
            Ok(line) => line,
            Err(e) => {
                warn!("Skipping stdin line that is not valid UTF-8: {}", e);
                continue;
            }
        };

        let server = server.clone();
        let context = context.clone();
        let tx = tx.clone();
        tasks.spawn(async move {
            if let Some(response) = server.handle_message(&line, &context).await {
                // the receiver only goes away once every task has finished
                let _ = tx.send(response);
            }
        });
    };

    if let Err(e) = &read_result {
        warn!("Failed to read from stdin: {}", e);
    }
    debug!("stdin closed, waiting for {} in-flight messages", tasks.len());
    while tasks.join_next().await.is_some() {}
    drop(tx);

    writer_task.await??;
    read_result?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_request_context_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer abc"));
        headers.insert("Content-Length", HeaderValue::from_static("42"));
        headers.insert("X-Tenant", HeaderValue::from_static("acme"));

        let mut query = HashMap::new();
        query.insert("apikey".to_string(), "k".to_string());

        let context = request_context(&headers, query);
        assert_eq!(context.authorization(), Some("Bearer abc"));
        assert_eq!(context.headers.get("x-tenant").map(String::as_str), Some("acme"));
        assert!(!context.headers.contains_key("content-length"));
        assert_eq!(context.query_params.get("apikey").map(String::as_str), Some("k"));
    }
}
