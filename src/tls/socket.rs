//! Established secure socket: encrypted I/O and shutdown
//!
//! A [`SecureSocket`] only comes into existence after a completed
//! handshake, so every operation here runs over an established session.
//! The socket exclusively owns its raw transport handle and secure session
//! handle; it is not meant to be shared across threads.

use std::net::{SocketAddr, TcpStream};

use bytes::Bytes;
use openssl::ssl::{ErrorCode, SslRef, SslStream};

use super::cert::CertInfo;
use super::error::{reason_of, TlsError};
use super::server::AcceptState;
use super::Result;
use crate::logger::Logger;
use crate::net::TcpTransport;

const COMPONENT: &str = "SecureSocket";

/// Snapshot of the negotiated session, taken right after the handshake.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Negotiated protocol version (e.g. "TLSv1.3")
    pub version: String,
    /// Negotiated cipher suite name
    pub cipher: String,
    /// Peer certificate, when the client presented one
    pub peer_cert: Option<CertInfo>,
}

impl SessionInfo {
    pub(crate) fn from_ssl(ssl: &SslRef) -> Self {
        SessionInfo {
            version: ssl.version_str().to_string(),
            cipher: ssl
                .current_cipher()
                .map(|c| c.name().to_string())
                .unwrap_or_else(|| "<undef>".to_string()),
            peer_cert: ssl.peer_certificate().map(|cert| CertInfo::from_x509(&cert)),
        }
    }
}

/// One established, encrypted client connection.
pub struct SecureSocket {
    stream: SslStream<TcpStream>,
    peer: SocketAddr,
    info: SessionInfo,
    logger: Logger,
    closed: bool,
}

impl SecureSocket {
    pub(crate) fn established(
        stream: SslStream<TcpStream>,
        peer: SocketAddr,
        logger: Logger,
    ) -> Self {
        let info = SessionInfo::from_ssl(stream.ssl());
        SecureSocket {
            stream,
            peer,
            info,
            logger,
            closed: false,
        }
    }

    /// Peer address of the connection.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// The negotiated session parameters.
    pub fn session_info(&self) -> &SessionInfo {
        &self.info
    }

    /// Accept-path state of this connection. Always `Established`; the type
    /// cannot be constructed in any earlier state.
    pub fn state(&self) -> AcceptState {
        AcceptState::Established
    }

    /// Whether [`SecureSocket::disconnect`] has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The underlying transport stream (for timeouts and socket options).
    pub fn transport(&self) -> &TcpStream {
        self.stream.get_ref()
    }

    /// Read decrypted bytes into `buf`.
    ///
    /// Returns the number of bytes placed into `buf`, never more than
    /// `buf.len()`. `Ok(0)` means the peer sent its close notification.
    /// A transient [`TlsError::WantRead`]/[`TlsError::WantWrite`] must be
    /// retried with the same buffer once the transport is ready; hard
    /// errors are logged and returned.
    pub fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.closed {
            return Err(TlsError::Closed);
        }

        match self.stream.ssl_read(buf) {
            Ok(n) => Ok(n),
            Err(e) => {
                if e.code() == ErrorCode::ZERO_RETURN {
                    // Orderly shutdown from the peer; not an error.
                    return Ok(0);
                }
                let err = TlsError::from_ssl(&e);
                if !err.is_transient() {
                    self.logger.error(
                        COMPONENT,
                        format_args!(
                            "read failed. (Error={} | {})",
                            e.code().as_raw(),
                            reason_of(&e)
                        ),
                    );
                }
                Err(err)
            }
        }
    }

    /// Write `data` through the secure session, one engine attempt.
    ///
    /// Returns the number of bytes accepted by the engine, which may be
    /// less than `data.len()`. Zero-length payloads are rejected before
    /// reaching the engine, whose behavior for them is undefined. The
    /// transient-retry contract matches [`SecureSocket::receive`].
    pub fn send(&mut self, data: &[u8]) -> Result<usize> {
        if data.is_empty() {
            return Err(TlsError::EmptyWrite);
        }
        if self.closed {
            return Err(TlsError::Closed);
        }

        match self.stream.ssl_write(data) {
            Ok(n) => Ok(n),
            Err(e) => {
                let err = TlsError::from_ssl(&e);
                if !err.is_transient() {
                    self.logger.error(
                        COMPONENT,
                        format_args!(
                            "write failed. (Error={} | {})",
                            e.code().as_raw(),
                            reason_of(&e)
                        ),
                    );
                }
                Err(err)
            }
        }
    }

    /// Write all of `data`, looping over partial writes.
    ///
    /// Transient conditions are retried with the identical remaining slice;
    /// intended for blocking transports, where the retry is immediate.
    pub fn send_all(&mut self, data: &[u8]) -> Result<()> {
        let mut written = 0;
        while written < data.len() {
            match self.send(&data[written..]) {
                Ok(n) => written += n,
                Err(err) if err.is_transient() => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Send a string. Forwards to [`SecureSocket::send_all`] and reports
    /// its real outcome.
    pub fn send_str(&mut self, data: &str) -> Result<()> {
        self.send_all(data.as_bytes())
    }

    /// Send a byte buffer. Forwards to [`SecureSocket::send_all`] and
    /// reports its real outcome.
    pub fn send_bytes(&mut self, data: &Bytes) -> Result<()> {
        self.send_all(data)
    }

    /// Orderly disconnect: send the close notification, release the
    /// session, close the raw transport.
    ///
    /// Idempotent; a second call is a no-op. Internal failures are logged
    /// and never escalated, so the caller can always proceed with teardown.
    pub fn disconnect(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.stream.shutdown() {
            let err = TlsError::from_ssl(&e);
            if !err.is_transient() {
                self.logger.error(
                    COMPONENT,
                    format_args!(
                        "shutdown failed. (Error={} | {})",
                        e.code().as_raw(),
                        reason_of(&e)
                    ),
                );
            }
        }

        TcpTransport::disconnect(self.stream.get_ref());
    }
}

impl Drop for SecureSocket {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for SecureSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureSocket")
            .field("peer", &self.peer)
            .field("version", &self.info.version)
            .field("cipher", &self.info.cipher)
            .field("closed", &self.closed)
            .finish()
    }
}
