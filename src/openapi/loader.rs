use reqwest::{Client, Url};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::OpenApiDocument;
use crate::error::SpecFetchError;

/// Where the OpenAPI document comes from.
#[derive(Debug, Clone)]
pub enum SpecSource {
    Path(PathBuf),
    Url(String),
    Document(OpenApiDocument),
}

impl SpecSource {
    /// `http://` and `https://` locations are URLs, anything else is a file path.
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            Self::Url(location.to_string())
        } else {
            Self::Path(PathBuf::from(location))
        }
    }

    /// Scheme and host of a URL source.
    pub fn origin(&self) -> Option<String> {
        match self {
            Self::Url(url) => Url::parse(url)
                .ok()
                .map(|u| u.origin().ascii_serialization())
                .filter(|origin| origin != "null"),
            _ => None,
        }
    }
}

pub async fn load(
    source: &SpecSource,
    client: &Client,
    timeout: Duration,
) -> Result<OpenApiDocument, SpecFetchError> {
    match source {
        SpecSource::Document(document) => Ok(document.clone()),
        SpecSource::Url(url) => {
            info!("Fetching OpenAPI spec from {}", url);
            let response = client
                .get(url)
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| SpecFetchError::Fetch {
                    url: url.clone(),
                    message: e.to_string(),
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(SpecFetchError::Status {
                    url: url.clone(),
                    status: status.as_u16(),
                });
            }

            let text = response.text().await.map_err(|e| SpecFetchError::Fetch {
                url: url.clone(),
                message: e.to_string(),
            })?;
            parse_document(&text, url)
        }
        SpecSource::Path(path) => {
            let location = path.display().to_string();
            info!("Loading OpenAPI spec from {}", location);
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(|source| SpecFetchError::ReadFile {
                    path: location.clone(),
                    source,
                })?;
            parse_document(&text, &location)
        }
    }
}

/// Parses YAML or JSON text into a document.
pub fn parse_document(text: &str, location: &str) -> Result<OpenApiDocument, SpecFetchError> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|source| SpecFetchError::Parse {
            location: location.to_string(),
            source,
        })?;

    // Going through serde_yaml::Value turns integer keys such as response codes into strings.
    let value: Value = serde_json::to_value(yaml).map_err(|source| SpecFetchError::Convert {
        location: location.to_string(),
        source,
    })?;

    if !value.is_object() {
        return Err(SpecFetchError::NotAMapping {
            location: location.to_string(),
        });
    }

    debug!("Parsed OpenAPI spec from {}", location);
    Ok(OpenApiDocument::from_value(value))
}

/// Picks the base URL outbound requests are made against.
///
/// Order: explicit value, `servers[0].url`, origin of a URL source, empty.
pub fn resolve_base_url(
    document: &OpenApiDocument,
    explicit: Option<&str>,
    source: &SpecSource,
) -> String {
    if let Some(explicit) = explicit.filter(|url| !url.is_empty()) {
        return explicit.trim_end_matches('/').to_string();
    }

    if let Some(server) = document.first_server_url() {
        return server.trim_end_matches('/').to_string();
    }

    if let Some(origin) = source.origin() {
        warn!("No 'servers' block in OpenAPI spec. Using source URL origin {} as base URL", origin);
        return origin;
    }

    warn!("Could not determine base URL from spec. Requests will use relative paths");
    String::new()
}
