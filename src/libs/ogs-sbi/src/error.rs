//! SBI Error Types
//!
//! Error types for the SBI library

use thiserror::Error;

/// SBI Error type
#[derive(Error, Debug)]
pub enum SbiError {
    /// HTTP/2 connection error
    #[error("HTTP/2 connection error: {0}")]
    ConnectionError(String),

    /// Request or connect timeout
    #[error("Request timeout")]
    Timeout,

    /// Invalid URI
    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    /// Invalid method
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Unexpected HTTP status from a peer
    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },

    /// Server error
    #[error("Server error: {0}")]
    ServerError(String),

    /// Client error
    #[error("Client error: {0}")]
    ClientError(String),

    /// TLS/SSL error
    #[error("TLS error: {0}")]
    TlsError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Hyper error
    #[error("Hyper error: {0}")]
    HyperError(String),

    /// Invalid response
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Discovery failed
    #[error("NF discovery failed: {0}")]
    DiscoveryFailed(String),
}

impl SbiError {
    /// Create an HTTP error from status code
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self::HttpError {
            status,
            message: message.into(),
        }
    }

    /// Get the HTTP status code if this error carries one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when no HTTP response was received at all
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Timeout
                | Self::ConnectionError(_)
                | Self::TlsError(_)
                | Self::IoError(_)
                | Self::HyperError(_)
        )
    }
}

/// Result type for SBI operations
pub type SbiResult<T> = Result<T, SbiError>;
