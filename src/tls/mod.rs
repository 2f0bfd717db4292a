//! TLS-terminating server socket
//!
//! This module promotes accepted TCP connections to encrypted channels and
//! provides encrypted I/O over them.
//!
//! # Architecture
//!
//! 1. [`ServerConfig`] is the secure session context: identity material
//!    (certificate and private key files), trust anchors (CA file),
//!    verification depth and a pluggable [`TrustPolicy`]. It is built once
//!    and shared read-only across connections.
//! 2. [`SecureServer`] drives the accept path as an explicit state machine
//!    (`Idle -> TransportAccepted -> ContextAttached -> Handshaking ->
//!    Established`), one attempt per incoming connection.
//! 3. [`SecureSocket`] is the established channel: encrypted receive/send
//!    plus an orderly, idempotent disconnect.
//!
//! The handshake and both I/O directions share one retry contract: a
//! transient want-read/want-write condition from the engine means the
//! identical call must be reissued once the transport is ready. For the
//! handshake that contract is reified as [`PendingHandshake`], which owns
//! the in-flight engine state so a retry cannot be made with different
//! arguments.
//!
//! # Examples
//!
//! ```no_run
//! use securetcp::logger::Logger;
//! use securetcp::net::TcpTransport;
//! use securetcp::tls::{ClientVerify, SecureServer, ServerConfig, TlsVersion};
//!
//! let config = ServerConfig::builder(TlsVersion::Tls12)
//!     .cert_file("server-cert.pem")
//!     .key_file("server-key.pem")
//!     .ca_file("ca-cert.pem")
//!     .client_verify(ClientVerify::Required)
//!     .build()
//!     .unwrap();
//!
//! let transport = TcpTransport::bind("0.0.0.0:4433").unwrap();
//! let server = SecureServer::new(transport, config, Logger::stderr());
//!
//! loop {
//!     let mut client = match server.listen() {
//!         Ok(client) => client,
//!         Err(_) => continue, // diagnostics went through the logger
//!     };
//!     let mut buf = [0u8; 4096];
//!     while let Ok(n) = client.receive(&mut buf) {
//!         if n == 0 {
//!             break;
//!         }
//!         if client.send_all(&buf[..n]).is_err() {
//!             break;
//!         }
//!     }
//!     client.disconnect();
//! }
//! ```

pub mod cert;
pub mod config;
pub mod error;
pub mod server;
pub mod socket;

pub use cert::CertInfo;
pub use config::{ClientVerify, ServerConfig, ServerConfigBuilder, TlsVersion, TrustPolicy};
pub use error::{describe_error_code, TlsError};
pub use server::{AcceptState, Handshake, Interest, PendingHandshake, SecureServer};
pub use socket::{SecureSocket, SessionInfo};

/// Result type for TLS operations
pub type Result<T> = std::result::Result<T, TlsError>;
