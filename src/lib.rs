//! securetcp - TLS-terminating TCP server socket
//!
//! This crate accepts raw TCP connections and promotes them to encrypted
//! channels via a server-side TLS handshake, then provides encrypted
//! read/write/shutdown operations over the established channel.
//!
//! # Architecture
//!
//! Two independent state machines are coordinated here:
//!
//! 1. The TCP connection lifecycle, owned by [`net::TcpTransport`]
//! 2. The TLS session lifecycle, driven by [`tls::SecureServer`]
//!
//! A [`tls::ServerConfig`] holds the identity material (certificate and
//! private key), trust anchors (CA file) and verification policy, and is
//! shared immutably across every accepted connection. Each successful
//! handshake yields an exclusively-owned [`tls::SecureSocket`] bound to one
//! raw transport handle.
//!
//! All failures surface as `Result` values; diagnostics go through an
//! injected [`logger::Logger`] callback and are never the error-reporting
//! mechanism itself.
//!
//! # Examples
//!
//! ```no_run
//! use securetcp::logger::Logger;
//! use securetcp::net::TcpTransport;
//! use securetcp::tls::{SecureServer, ServerConfig, TlsVersion};
//!
//! let config = ServerConfig::builder(TlsVersion::Tls13)
//!     .cert_file("server-cert.pem")
//!     .key_file("server-key.pem")
//!     .build()
//!     .unwrap();
//!
//! let transport = TcpTransport::bind("127.0.0.1:4433").unwrap();
//! let server = SecureServer::new(transport, config, Logger::stderr());
//!
//! let mut client = server.listen().unwrap();
//! let mut buf = [0u8; 4096];
//! let n = client.receive(&mut buf).unwrap();
//! client.send_all(&buf[..n]).unwrap();
//! client.disconnect();
//! ```

pub mod logger;
pub mod net;
pub mod tls;
