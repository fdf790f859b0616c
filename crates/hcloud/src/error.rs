//! Errors returned by the Hetzner Cloud API client.

use thiserror::Error;

/// API error codes that are worth retrying.
const RETRYABLE_CODES: &[&str] = &["rate_limit_exceeded", "conflict", "timeout"];

/// HTTP statuses that are worth retrying even without an error body.
const RETRYABLE_STATUSES: &[u16] = &[502, 504];

/// Errors that can occur while talking to the Hetzner Cloud API.
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("{message} ({code})")]
    Api {
        /// HTTP status of the response.
        status: u16,
        /// Machine readable error code, e.g. `not_found`.
        code: String,
        /// Human readable message.
        message: String,
        /// Optional structured details (invalid fields, limits, ...).
        details: Option<serde_json::Value>,
    },

    /// A resource looked up by name or ID does not exist.
    #[error("resource ({resource}) does not exist: {param}")]
    ResourceNotFound {
        /// Singular resource name, e.g. `network`.
        resource: &'static str,
        /// The name or ID that was queried.
        param: String,
    },

    /// An asynchronous action finished with an error.
    #[error("The pending action failed: {message} ({code}, {id})")]
    ActionFailed {
        /// Action ID.
        id: i64,
        /// Error code reported by the action.
        code: String,
        /// Error message reported by the action.
        message: String,
    },

    /// An asynchronous action did not finish in time.
    #[error("The pending action timed out: action {id} is still running after {retries} polls")]
    ActionTimeout {
        /// Action ID.
        id: i64,
        /// Number of polls performed.
        retries: u32,
    },

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Whether the API reported the resource as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { code, .. } if code == "not_found")
            || matches!(self, Self::ResourceNotFound { .. })
    }

    /// Whether the request may succeed when sent again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api { status, code, .. } => {
                RETRYABLE_CODES.contains(&code.as_str()) || RETRYABLE_STATUSES.contains(status)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, code: &str) -> ClientError {
        ClientError::Api {
            status,
            code: code.to_string(),
            message: "boom".to_string(),
            details: None,
        }
    }

    #[test]
    fn test_api_error_display() {
        let err = ClientError::Api {
            status: 422,
            code: "invalid_input".to_string(),
            message: "invalid input in fields 'server', 'home_location'".to_string(),
            details: None,
        };
        assert_eq!(
            err.to_string(),
            "invalid input in fields 'server', 'home_location' (invalid_input)"
        );
    }

    #[test]
    fn test_action_failed_display() {
        let err = ClientError::ActionFailed {
            id: 1_084_730_887,
            code: "server_does_not_exist_anymore".to_string(),
            message: "Server does not exist anymore".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "The pending action failed: Server does not exist anymore (server_does_not_exist_anymore, 1084730887)"
        );
    }

    #[test]
    fn test_resource_not_found_display() {
        let err = ClientError::ResourceNotFound {
            resource: "network",
            param: "backend".to_string(),
        };
        assert_eq!(err.to_string(), "resource (network) does not exist: backend");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(api(429, "rate_limit_exceeded").is_retryable());
        assert!(api(409, "conflict").is_retryable());
        assert!(api(502, "unknown").is_retryable());
        assert!(!api(404, "not_found").is_retryable());
        assert!(!api(401, "unauthorized").is_retryable());
        assert!(api(404, "not_found").is_not_found());
    }
}
