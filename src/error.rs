//! Error types and exit codes for fieldgraph-engine

use std::process::ExitCode;
use thiserror::Error;

/// Main error type for fieldgraph-engine operations
#[derive(Error, Debug)]
pub enum FieldGraphError {
    #[error("{service} unreachable: {message}")]
    Transport { service: String, message: String },

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: String,
        status: u16,
        body: String,
    },

    #[error("Failed to parse: {message}")]
    ParseFailure { message: String },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("{operation} failed after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        last: Box<FieldGraphError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl FieldGraphError {
    pub fn transport(service: &str, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            service: service.to_string(),
            message: err.to_string(),
        }
    }

    /// Whether a retry could plausibly succeed.
    ///
    /// Network failures, 5xx and 429 responses are retryable; everything
    /// else (4xx, parse errors, missing records) fails the same way twice.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Convert error to appropriate exit code:
    /// - 1: IO error / missing input
    /// - 2: Invalid input or configuration
    /// - 3: Parse failure
    /// - 4: Remote service failure
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Io(_) | Self::NotFound { .. } => ExitCode::from(1),
            Self::ConfigError { .. } | Self::InvalidInput { .. } | Self::Toml(_) => {
                ExitCode::from(2)
            }
            Self::ParseFailure { .. } | Self::Json(_) => ExitCode::from(3),
            Self::Transport { .. } | Self::Status { .. } | Self::RetriesExhausted { .. } => {
                ExitCode::from(4)
            }
        }
    }
}

impl From<reqwest::Error> for FieldGraphError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Status {
                service: err
                    .url()
                    .and_then(|u| u.host_str().map(str::to_string))
                    .unwrap_or_else(|| "remote".to_string()),
                status: status.as_u16(),
                body: err.to_string(),
            },
            None => Self::transport("remote", err),
        }
    }
}

/// Result type alias for fieldgraph-engine operations
pub type Result<T> = std::result::Result<T, FieldGraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(FieldGraphError::transport("ledger", "connection reset").is_retryable());
        let server = FieldGraphError::Status {
            service: "publisher".into(),
            status: 503,
            body: String::new(),
        };
        assert!(server.is_retryable());
        let throttled = FieldGraphError::Status {
            service: "publisher".into(),
            status: 429,
            body: String::new(),
        };
        assert!(throttled.is_retryable());
        let client = FieldGraphError::Status {
            service: "publisher".into(),
            status: 404,
            body: String::new(),
        };
        assert!(!client.is_retryable());
        assert!(!FieldGraphError::ParseFailure {
            message: "bad".into()
        }
        .is_retryable());
    }
}
