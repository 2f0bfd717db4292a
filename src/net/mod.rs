//! TCP transport
//!
//! This module owns the raw TCP side of the server: binding the listening
//! socket, accepting connections and closing them. It performs no TLS work;
//! accepted streams are handed to [`crate::tls::SecureServer`] for the
//! handshake.

pub mod listener;

pub use listener::TcpTransport;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, Error>;

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),
}
