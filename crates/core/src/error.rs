//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every failure a request can run into is expressed as one of these variants.
/// Each variant carries the message that ends up in the reply envelope, and
/// [`DomainError::code`] maps it onto the HTTP-style status code callers expect.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or missing input (e.g. an identifier that is not a UUID).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested relational record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A backing store could not be reached or returned a transport error.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A relational record exists but its document could not be joined.
    #[error("join failure: {0}")]
    JoinFailure(String),

    /// The inbound envelope could not be decoded. Never answered.
    #[error("protocol error: {0}")]
    ProtocolError(String),
}

impl DomainError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    pub fn join_failure(msg: impl Into<String>) -> Self {
        Self::JoinFailure(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::ProtocolError(msg.into())
    }

    /// HTTP-style status code for the reply envelope.
    ///
    /// `ProtocolError` has no reply, but reports 400 for logging purposes.
    pub fn code(&self) -> u16 {
        match self {
            DomainError::InvalidArgument(_) | DomainError::ProtocolError(_) => 400,
            DomainError::NotFound(_) => 404,
            DomainError::StoreUnavailable(_) | DomainError::JoinFailure(_) => 500,
        }
    }

    /// The human-readable message placed in the reply's `data` field.
    pub fn message(&self) -> &str {
        match self {
            DomainError::InvalidArgument(m)
            | DomainError::NotFound(m)
            | DomainError::StoreUnavailable(m)
            | DomainError::JoinFailure(m)
            | DomainError::ProtocolError(m) => m,
        }
    }
}
