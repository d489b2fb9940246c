//! Error types for the ElasticBox lifecycle client.

use thiserror::Error;

/// Errors raised by the request executor, resource client and progress monitors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required identifier was blank; raised before any network call.
    #[error("{0} cannot be blank")]
    BlankIdentifier(&'static str),

    #[error("Error {status} authenticating with {endpoint}: {message}")]
    AuthenticationFailed {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// Non-2xx response from the control plane.
    #[error("Request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Malformed profile schema: {0}")]
    MalformedSchema(String),

    #[error("The instance at {url} is unavailable")]
    InstanceUnavailable { url: String },

    #[error("Unexpected operation '{operation}' has been performed for instance {url}")]
    UnexpectedOperation { operation: String, url: String },

    #[error("The instance {url} cannot be found")]
    ResourceDisappeared { url: String },

    #[error(
        "The instance at {url} is not ready after waiting for {waited_secs} seconds. \
         Current instance state: {state}"
    )]
    Timeout {
        url: String,
        waited_secs: u64,
        state: String,
    },

    #[error("Waiting for {url} was cancelled")]
    Cancelled { url: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ApiError {
    /// HTTP status carried by the error, if it came from a server response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } | ApiError::AuthenticationFailed { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// True for the fatal outcomes a progress monitor can report.
    pub fn is_monitor_failure(&self) -> bool {
        matches!(
            self,
            ApiError::InstanceUnavailable { .. }
                | ApiError::UnexpectedOperation { .. }
                | ApiError::ResourceDisappeared { .. }
                | ApiError::Timeout { .. }
                | ApiError::Cancelled { .. }
        )
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
