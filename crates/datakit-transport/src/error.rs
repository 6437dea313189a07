//! Error types for request assembly, transport and configuration.

use datakit_query::QueryError;

/// Errors raised while building a [`Request`](crate::Request).
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("You can't set both request body and forms")]
    BodyAndForms,

    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Request has no URL")]
    MissingUrl,

    #[error("Query error: {0}")]
    Query(#[from] QueryError),
}

/// Errors raised while sending a request or converting its response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Unable to convert response to {target}")]
    Conversion {
        target: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while loading a [`ServiceConfig`](crate::ServiceConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
