//! TCP transport for the cat service
//!
//! One connection per request, newline-delimited JSON both ways. See
//! [`protocol`] for the message shapes.

pub mod codec;
pub mod config;
pub mod connection;
pub mod listener;
pub mod protocol;

pub use config::ServerConfig;
pub use listener::CatServer;
