//! Secure socket server: accept and handshake
//!
//! The accept path coordinates the TCP and TLS state machines. Each attempt
//! walks an explicit [`AcceptState`] progression; the only way to obtain a
//! [`SecureSocket`] is to reach `Established`, so encrypted I/O before a
//! completed handshake is unrepresentable.
//!
//! On a blocking transport (the default) [`SecureServer::listen`] performs
//! the whole progression in one call. On a non-blocking transport the
//! engine may suspend the handshake with a want-read/want-write condition;
//! [`SecureServer::handshake`] then yields a [`PendingHandshake`] that owns
//! the in-flight engine state, and [`PendingHandshake::resume`] retries the
//! operation with the identical arguments, as the engine requires.

use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use openssl::ssl::{HandshakeError, MidHandshakeSslStream, Ssl, SslStream};

use super::config::ServerConfig;
use super::error::{reason_of, TlsError};
use super::socket::SecureSocket;
use super::Result;
use crate::logger::Logger;
use crate::net::TcpTransport;

const COMPONENT: &str = "SecureServer";

/// Accept-path state for one connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptState {
    /// No connection yet; the listener may retry.
    Idle,
    /// Raw TCP connection accepted.
    TransportAccepted,
    /// Secure session handle created from the shared context.
    ContextAttached,
    /// Server-side handshake in flight.
    Handshaking,
    /// Handshake completed; encrypted I/O is valid from here on.
    Established,
    /// Terminal failure for this attempt.
    Failed,
}

impl AcceptState {
    /// Next state when the current step succeeds.
    pub fn advance(self) -> AcceptState {
        match self {
            AcceptState::Idle => AcceptState::TransportAccepted,
            AcceptState::TransportAccepted => AcceptState::ContextAttached,
            AcceptState::ContextAttached => AcceptState::Handshaking,
            AcceptState::Handshaking => AcceptState::Established,
            terminal => terminal,
        }
    }

    /// Terminal failure. An established connection never regresses; failures
    /// past that point are I/O errors, not accept-path transitions.
    pub fn fail(self) -> AcceptState {
        match self {
            AcceptState::Established => AcceptState::Established,
            _ => AcceptState::Failed,
        }
    }

    /// Whether this state ends the attempt.
    pub fn is_terminal(self) -> bool {
        matches!(self, AcceptState::Established | AcceptState::Failed)
    }
}

/// Transport readiness a suspended operation is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    Read,
    Write,
}

/// Outcome of a single handshake attempt.
pub enum Handshake {
    /// Handshake completed.
    Established(SecureSocket),
    /// The engine suspended on transport readiness; resume with
    /// [`PendingHandshake::resume`].
    Interrupted(PendingHandshake),
}

/// An in-flight handshake on a non-blocking transport.
///
/// Owns the engine's mid-handshake state, so resuming necessarily reuses
/// the identical arguments of the suspended call. Dropping it releases the
/// session; [`PendingHandshake::abort`] additionally closes the raw
/// transport.
pub struct PendingHandshake {
    mid: MidHandshakeSslStream<TcpStream>,
    peer: SocketAddr,
    logger: Logger,
}

impl PendingHandshake {
    /// Readiness the engine is waiting for before the next attempt.
    pub fn interest(&self) -> Interest {
        use openssl::ssl::ErrorCode;
        if self.mid.error().code() == ErrorCode::WANT_WRITE {
            Interest::Write
        } else {
            Interest::Read
        }
    }

    /// Peer address of the suspended connection.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Retry the handshake once the transport is ready.
    pub fn resume(self) -> Result<Handshake> {
        finish_handshake(self.mid.handshake(), self.peer, self.logger)
    }

    /// Give up on the attempt: release the session and close the raw
    /// transport. Best effort.
    pub fn abort(self) {
        TcpTransport::disconnect(self.mid.get_ref());
    }
}

/// TLS-terminating server for one listening socket.
///
/// Produces one exclusively-owned [`SecureSocket`] per accepted client.
/// The secure session context is shared read-only across connections; the
/// server itself holds no per-connection state and every operation runs to
/// completion on the calling thread.
pub struct SecureServer {
    transport: TcpTransport,
    config: ServerConfig,
    logger: Logger,
}

impl SecureServer {
    /// Create a server from a bound transport, a built context and a
    /// diagnostics sink.
    pub fn new(transport: TcpTransport, config: ServerConfig, logger: Logger) -> Self {
        SecureServer {
            transport,
            config,
            logger,
        }
    }

    /// The listening transport.
    pub fn transport(&self) -> &TcpTransport {
        &self.transport
    }

    /// The shared session context.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Accept one client and perform the server-side handshake (blocking).
    ///
    /// On failure the server stays usable and the caller may call `listen`
    /// again; the failed attempt's session resources are released before
    /// returning.
    pub fn listen(&self) -> Result<SecureSocket> {
        let (stream, peer) = match self.transport.accept() {
            Ok(accepted) => accepted,
            Err(e) => {
                self.logger.error(
                    COMPONENT,
                    "Unable to accept an incoming TCP connection with a client.",
                );
                return Err(TlsError::Transport(e));
            }
        };

        match self.handshake(stream, peer)? {
            Handshake::Established(socket) => Ok(socket),
            Handshake::Interrupted(pending) => self.drive_to_completion(pending),
        }
    }

    /// Accept one client, waiting at most `timeout` for a connection.
    ///
    /// Returns `Ok(None)` when no client arrived in time. Once a connection
    /// is accepted the handshake itself runs as in [`SecureServer::listen`].
    pub fn listen_timeout(&self, timeout: Duration) -> Result<Option<SecureSocket>> {
        let (stream, peer) = match self.transport.accept_timeout(timeout) {
            Ok(Some(accepted)) => accepted,
            Ok(None) => return Ok(None),
            Err(e) => {
                self.logger.error(
                    COMPONENT,
                    "Unable to accept an incoming TCP connection with a client.",
                );
                return Err(TlsError::Transport(e));
            }
        };

        match self.handshake(stream, peer)? {
            Handshake::Established(socket) => Ok(Some(socket)),
            Handshake::Interrupted(pending) => Ok(Some(self.drive_to_completion(pending)?)),
        }
    }

    /// Attach the shared context to an accepted connection and perform one
    /// handshake attempt.
    ///
    /// This is the non-blocking adaptation point: callers that manage their
    /// own readiness loop accept the raw connection themselves, set it
    /// non-blocking and drive [`Handshake::Interrupted`] through
    /// [`PendingHandshake::resume`].
    pub fn handshake(&self, stream: TcpStream, peer: SocketAddr) -> Result<Handshake> {
        let mut state = AcceptState::TransportAccepted;

        let ssl = match Ssl::new(&self.config.ctx) {
            Ok(ssl) => ssl,
            Err(e) => {
                state = state.fail();
                debug_assert!(state.is_terminal());
                self.logger.error(COMPONENT, "SSL CTX failed.");
                TcpTransport::disconnect(&stream);
                return Err(TlsError::OpenSsl(e));
            }
        };
        state = state.advance();
        debug_assert_eq!(state, AcceptState::ContextAttached);

        state = state.advance();
        debug_assert_eq!(state, AcceptState::Handshaking);

        finish_handshake(ssl.accept(stream), peer, self.logger.clone())
    }

    /// Resume an interrupted handshake until it settles, polling the
    /// transport for the readiness the engine asked for.
    fn drive_to_completion(&self, mut pending: PendingHandshake) -> Result<SecureSocket> {
        use std::os::fd::AsRawFd;

        loop {
            // On a blocking transport this path is never taken; a
            // non-blocking stream reaches it on every suspension.
            let fd = pending.mid.get_ref().as_raw_fd();
            match pending.interest() {
                Interest::Read => crate::net::listener::poll_readable(fd, None),
                Interest::Write => crate::net::listener::poll_writable(fd, None),
            }
            .map_err(TlsError::Transport)?;
            match pending.resume()? {
                Handshake::Established(socket) => return Ok(socket),
                Handshake::Interrupted(next) => pending = next,
            }
        }
    }
}

/// Shared tail of the initial attempt and every resume.
fn finish_handshake(
    result: std::result::Result<SslStream<TcpStream>, HandshakeError<TcpStream>>,
    peer: SocketAddr,
    logger: Logger,
) -> Result<Handshake> {
    match result {
        Ok(stream) => Ok(Handshake::Established(SecureSocket::established(
            stream, peer, logger,
        ))),
        Err(HandshakeError::WouldBlock(mid)) => Ok(Handshake::Interrupted(PendingHandshake {
            mid,
            peer,
            logger,
        })),
        Err(HandshakeError::Failure(mid)) => {
            let err = mid.error();
            let code = err.code().as_raw();
            let reason = reason_of(err);
            logger.error(
                COMPONENT,
                format_args!("accept failed. (Error={} | {})", code, reason),
            );
            // Best-effort shutdown: close the raw transport; the engine
            // state is released when the mid-handshake stream drops.
            TcpTransport::disconnect(mid.get_ref());
            Err(TlsError::Handshake { code, reason })
        }
        Err(HandshakeError::SetupFailure(stack)) => {
            logger.error(
                COMPONENT,
                format_args!("accept failed. ({})", stack),
            );
            Err(TlsError::OpenSsl(stack))
        }
    }
}
