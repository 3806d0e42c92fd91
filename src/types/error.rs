//! Error types for the resolver
//!
//! Component failures stay local (`ParseError`, `ReadError`, `FetchError`);
//! the resolver is the only place that turns them into a `ResolverError` and
//! therefore into an HTTP status. `ConfigError` never reaches a request, it
//! aborts start-up in `main`.

use hyper::StatusCode;
use serde::Serialize;

/// Main error type for resolution requests
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("Missing or out-of-order field: {field}")]
    Validation { field: String },

    #[error("RPC URLs not found.")]
    RpcUrlsNotFound,

    #[error("Token URI not found.")]
    TokenUriNotFound,

    #[error("Failed to fetch data from IPFS.")]
    GatewayExhausted,

    #[error("Unsupported token URI standard: {0}")]
    UnsupportedPointerStandard(String),

    #[error("Failed to fetch token URI content: {0}")]
    Upstream(String),

    #[error("Method {0} is not allowed.")]
    MethodNotAllowed(String),

    /// Resolution aborted unexpectedly (a panicked resolution task)
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResolverError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::RpcUrlsNotFound => StatusCode::NOT_FOUND,
            Self::TokenUriNotFound => StatusCode::NOT_FOUND,
            Self::GatewayExhausted => StatusCode::BAD_GATEWAY,
            Self::UnsupportedPointerStandard(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// HTTP reason phrase used as the `name` of the error body
    pub fn name(&self) -> &'static str {
        self.status_code()
            .canonical_reason()
            .unwrap_or("Internal Server Error")
    }

    /// Human-readable description; internal faults do not leak their cause
    pub fn description(&self) -> String {
        match self {
            Self::Internal(_) | Self::Io(_) => {
                "The server encountered an internal error.".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Build the `{code, name, description}` body sent to clients
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.status_code().as_u16(),
            name: self.name().to_string(),
            description: self.description(),
        }
    }
}

/// JSON error body returned for every failed request
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: u16,
    pub name: String,
    pub description: String,
}

/// Result type alias for resolver operations
pub type Result<T> = std::result::Result<T, ResolverError>;
