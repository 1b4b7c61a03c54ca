use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::{BoundRequest, CallResult};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes bound requests on a shared connection pool.
///
/// Cloning is cheap; all clones share the same pool.
#[derive(Debug, Clone)]
pub struct Invoker {
    client: Client,
}

impl Invoker {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Never fails: upstream and network errors come back as `CallResult::Error`.
    pub async fn invoke(&self, request: BoundRequest) -> CallResult {
        debug!("Sending {} request to {}", request.method, request.url);
        debug!("  - Query: {:?}", request.query);

        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Request to {} failed: {}", request.url, e);
                return CallResult::Error(format!("An unexpected error occurred: {}", e));
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to read response body from {}: {}", request.url, e);
                return CallResult::Error(format!("An unexpected error occurred: {}", e));
            }
        };

        if status.is_client_error() || status.is_server_error() {
            warn!("Upstream returned {} for {}", status, request.url);
            return CallResult::Error(format!("API Error: {} - {}", status.as_u16(), text));
        }

        match serde_json::from_str::<Value>(&text) {
            Ok(value) => CallResult::Json(value),
            Err(_) => CallResult::Text(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderMap;
    use reqwest::Method;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(method: Method, url: String) -> BoundRequest {
        BoundRequest {
            method,
            url,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn test_json_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"a":1}"#))
            .mount(&server)
            .await;

        let invoker = Invoker::new(DEFAULT_TIMEOUT).unwrap();
        let result = invoker.invoke(request(Method::GET, format!("{}/a", server.uri()))).await;
        assert_eq!(result, CallResult::Json(json!({"a": 1})));
    }

    #[tokio::test]
    async fn test_plain_text_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("plain text"))
            .mount(&server)
            .await;

        let invoker = Invoker::new(DEFAULT_TIMEOUT).unwrap();
        let result = invoker.invoke(request(Method::GET, format!("{}/t", server.uri()))).await;
        assert_eq!(result, CallResult::Text("plain text".to_string()));
    }

    #[tokio::test]
    async fn test_upstream_error_is_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"error":"not found"}"#))
            .mount(&server)
            .await;

        let invoker = Invoker::new(DEFAULT_TIMEOUT).unwrap();
        let result = invoker.invoke(request(Method::GET, format!("{}/missing", server.uri()))).await;
        assert_eq!(
            result,
            CallResult::Error(r#"API Error: 404 - {"error":"not found"}"#.to_string())
        );
    }

    #[tokio::test]
    async fn test_sends_query_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/things"))
            .and(query_param("dry_run", "true"))
            .and(header("x-trace", "abc"))
            .and(body_json(json!({"name": "widget"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let mut bound = request(Method::POST, format!("{}/things", server.uri()));
        bound.query.push(("dry_run".to_string(), "true".to_string()));
        bound.headers.insert("x-trace", "abc".parse().unwrap());
        bound.body = Some(json!({"name": "widget"}));

        let invoker = Invoker::new(DEFAULT_TIMEOUT).unwrap();
        assert_eq!(invoker.invoke(bound).await, CallResult::Json(json!({"id": 1})));
    }

    #[tokio::test]
    async fn test_network_failure_is_data() {
        let invoker = Invoker::new(Duration::from_secs(2)).unwrap();
        // port 9 (discard) on localhost is not expected to accept HTTP
        let result = invoker.invoke(request(Method::GET, "http://127.0.0.1:9/x".to_string())).await;
        match result {
            CallResult::Error(message) => assert!(message.starts_with("An unexpected error occurred:")),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let invoker = Invoker::new(Duration::from_millis(200)).unwrap();
        let result = invoker.invoke(request(Method::GET, format!("{}/slow", server.uri()))).await;
        assert!(result.is_error());
    }
}
