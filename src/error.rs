//! Error types for the session client.

use thiserror::Error;

/// Failure reaching or parsing the remote answering service.
///
/// The kind is informational; callers treat every kind the same way and
/// never retry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Network, message)
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Status(status), message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Malformed, message)
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::malformed(err.to_string())
        } else {
            Self::network(err.to_string())
        }
    }
}

/// Where a gateway call went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// Connection refused, DNS, timeout.
    Network,
    /// The service answered with a non-success status code.
    Status(u16),
    /// The body was not JSON or had no `answer` field.
    Malformed,
}

/// Login and signup failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The service rejected the request; carries its `detail` text.
    #[error("{0}")]
    Rejected(String),

    /// The request never produced a usable response.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Credentials were accepted but could not be persisted.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Key-value backing failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid arguments: {0}")]
    Cli(#[from] clap::Error),

    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_display_is_message() {
        let err = GatewayError::status(500, "internal error");
        assert_eq!(err.to_string(), "internal error");
        assert_eq!(err.kind, GatewayErrorKind::Status(500));
    }

    #[test]
    fn test_gateway_error_constructors() {
        assert_eq!(
            GatewayError::network("refused").kind,
            GatewayErrorKind::Network
        );
        assert_eq!(
            GatewayError::malformed("missing answer").kind,
            GatewayErrorKind::Malformed
        );
    }

    #[test]
    fn test_auth_rejected_display() {
        let err = AuthError::Rejected("Username or password is incorrect".into());
        assert_eq!(err.to_string(), "Username or password is incorrect");
    }

    #[test]
    fn test_store_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StoreError = io.into();
        assert!(err.to_string().contains("denied"));
    }
}
