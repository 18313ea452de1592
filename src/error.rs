//! Crate-level error type

use std::net::SocketAddr;

use thiserror::Error;

use crate::ingest::SourceError;
use crate::server::codec::CodecError;

/// Result type for catfeed operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for catfeed operations
#[derive(Debug, Error)]
pub enum Error {
    /// The listening socket could not be bound; aborts startup
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Startup configuration could not be applied
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The candidate source could not be set up
    #[error(transparent)]
    Source(#[from] SourceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        let e: Error = SourceError::Setup("tls backend".into()).into();
        assert!(matches!(e, Error::Source(SourceError::Setup(_))));

        let e: Error = CodecError::LineTooLong(8).into();
        assert_eq!(e.to_string(), "line exceeds 8 bytes");

        let e: Error = std::io::Error::new(std::io::ErrorKind::Other, "boom").into();
        assert!(matches!(e, Error::Io(_)));
    }
}
