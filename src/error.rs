//! Error types for riakwire
//!
//! Provides a unified error type for all transport and facade operations.

use std::fmt;

use thiserror::Error;

/// Result type alias using RiakError
pub type Result<T> = std::result::Result<T, RiakError>;

/// Reason a frame could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolErrorKind {
    /// Message code not known to this client
    UnknownMessageType(u8),

    /// Frame ended before the header or payload was complete
    Truncated,

    /// Frame was complete but its contents did not make sense
    Malformed(String),
}

impl fmt::Display for ProtocolErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolErrorKind::UnknownMessageType(code) => {
                write!(f, "unknown message type 0x{:02x}", code)
            }
            ProtocolErrorKind::Truncated => write!(f, "truncated frame"),
            ProtocolErrorKind::Malformed(reason) => write!(f, "malformed frame: {}", reason),
        }
    }
}

/// Unified error type for riakwire operations
#[derive(Debug, Error)]
pub enum RiakError {
    // -------------------------------------------------------------------------
    // Pool Errors
    // -------------------------------------------------------------------------
    #[error("too many transports (max {max})")]
    PoolExhausted { max: usize },

    #[error("connection pool is closed")]
    PoolClosed,

    // -------------------------------------------------------------------------
    // Wire Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(ProtocolErrorKind),

    #[error("Transient network failure: {0}")]
    Transient(#[from] std::io::Error),

    #[error("Server error {code}: {message}")]
    Server { code: u32, message: String },

    // -------------------------------------------------------------------------
    // Operation Errors
    // -------------------------------------------------------------------------
    #[error("{operation} failed: {source}")]
    OperationFailed {
        operation: String,
        #[source]
        source: Box<RiakError>,
    },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    // -------------------------------------------------------------------------
    // Content / Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Content codec error: {0}")]
    Codec(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RiakError {
    pub fn unknown_message(code: u8) -> Self {
        RiakError::Protocol(ProtocolErrorKind::UnknownMessageType(code))
    }

    pub fn truncated() -> Self {
        RiakError::Protocol(ProtocolErrorKind::Truncated)
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        RiakError::Protocol(ProtocolErrorKind::Malformed(reason.into()))
    }

    /// Network-level failures that a repeat attempt may get past.
    pub fn is_transient(&self) -> bool {
        matches!(self, RiakError::Transient(_))
    }

    /// Failures an idempotent operation may be retried on.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RiakError::Transient(_) | RiakError::PoolExhausted { .. }
        )
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, RiakError::Protocol(_))
    }

    /// True when the connection that produced this error can no longer be trusted.
    pub fn breaks_connection(&self) -> bool {
        matches!(self, RiakError::Protocol(_) | RiakError::Transient(_))
    }
}

impl From<bincode::Error> for RiakError {
    fn from(err: bincode::Error) -> Self {
        RiakError::Serialization(err.to_string())
    }
}
