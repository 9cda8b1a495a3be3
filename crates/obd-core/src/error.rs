//! Error taxonomy for backend calls

use thiserror::Error;

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Failures at the backend boundary. None of these ever leave the lane that produced them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Live feed unreachable or answered with a non-success status. Transient.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Chat endpoint unreachable, failed, or answered with an unreadable body.
    #[error("Assistant error: {0}")]
    Assistant(String),

    /// Response body did not match the expected shape.
    #[error("Decode error: {0}")]
    Decode(String),

    /// HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(String),
}
