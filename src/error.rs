use thiserror::Error;

/// The OpenAPI document could not be obtained. Fatal at startup.
#[derive(Debug, Error)]
pub enum SpecFetchError {
    #[error("failed to fetch spec from '{url}': {message}")]
    Fetch { url: String, message: String },

    #[error("spec request to '{url}' returned status {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read spec file '{path}'")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse OpenAPI spec from '{location}'")]
    Parse {
        location: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("OpenAPI spec from '{location}' cannot be represented as JSON")]
    Convert {
        location: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("OpenAPI spec from '{location}' is not a mapping")]
    NotAMapping { location: String },
}

/// A single call could not be turned into an outbound request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindError {
    #[error("Missing required path parameter: {0}")]
    MissingPathParameter(String),

    #[error("Invalid header '{name}': {message}")]
    InvalidHeader { name: String, message: String },
}

#[derive(Debug, Error)]
pub enum ApigeeError {
    #[error("failed to read proxy XML '{path}'")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid proxy XML")]
    Xml(#[from] roxmltree::Error),
}

/// The caller named an operation that is not in the registry.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Tool '{0}' not found")]
pub struct UnknownOperation(pub String);
