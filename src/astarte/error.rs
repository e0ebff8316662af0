use serde::Deserialize;
use thiserror::Error;

use super::endpoint::EndpointError;

/// Errors returned by the Astarte API client. Kept cloneable so failed
/// fetches can be stored in UI resources.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("HTTP request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("interface {interface_name} is not installed on device {device_id}")]
    InterfaceNotInIntrospection {
        device_id: String,
        interface_name: String,
    },

    #[error(transparent)]
    Endpoint(#[from] EndpointError),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            ClientError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ClientError::Connection(err.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    errors: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    detail: String,
}

impl ClientError {
    /// Maps a non-success response to an error, using the `errors.detail`
    /// message of the Astarte error body when there is one.
    pub fn from_status(status: u16, url: &str, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|body| body.errors.detail)
            .unwrap_or_else(|_| body.trim().to_string());

        match status {
            401 | 403 => ClientError::Unauthorized(message),
            404 => ClientError::NotFound(url.to_string()),
            status => ClientError::Http { status, message },
        }
    }
}
