//! Registry error types

use thiserror::Error;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The subscription request is malformed (e.g. empty breed filter)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Why a delivery to one subscriber failed
///
/// Never surfaced past the broadcast; the subscriber is dropped instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The receiving side is gone
    #[error("subscriber closed")]
    Closed,
    /// The subscriber's outbound buffer is full
    #[error("subscriber buffer full")]
    Full,
    /// The handle is already closing
    #[error("subscriber not active")]
    Inactive,
}
