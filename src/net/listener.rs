//! TCP listening socket
//!
//! The listener is built through `socket2` so the socket options that matter
//! for a server (address reuse, listen backlog) are set explicitly rather
//! than inherited from `TcpListener::bind` defaults.

use super::{Error, Result};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::os::fd::{AsRawFd, RawFd};
use std::time::Duration;

/// Default listen backlog
pub const DEFAULT_BACKLOG: i32 = 128;

/// Bound TCP listening socket.
///
/// Owns the listening descriptor; accepted connections are returned as
/// plain `TcpStream`s in blocking mode, exclusively owned by the caller.
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Bind a listening socket with the default backlog.
    pub fn bind<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        Self::bind_with_backlog(addr, DEFAULT_BACKLOG)
    }

    /// Bind a listening socket with an explicit backlog.
    pub fn bind_with_backlog<A: ToSocketAddrs>(addr: A, backlog: i32) -> Result<Self> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| Error::InvalidAddress("no address resolved".to_string()))?;

        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;
        socket.listen(backlog)?;

        Ok(TcpTransport {
            listener: socket.into(),
        })
    }

    /// Local address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept one incoming connection (blocking).
    pub fn accept(&self) -> Result<(TcpStream, SocketAddr)> {
        Ok(self.listener.accept()?)
    }

    /// Accept one incoming connection, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` if no connection arrived before the timeout
    /// elapsed.
    pub fn accept_timeout(&self, timeout: Duration) -> Result<Option<(TcpStream, SocketAddr)>> {
        if poll_readable(self.listener.as_raw_fd(), Some(timeout))? {
            Ok(Some(self.accept()?))
        } else {
            Ok(None)
        }
    }

    /// Close an accepted connection. Best effort; never escalates.
    pub fn disconnect(stream: &TcpStream) {
        let _ = stream.shutdown(Shutdown::Both);
    }
}

/// Wait until `fd` is readable or the timeout elapses.
pub(crate) fn poll_readable(fd: RawFd, timeout: Option<Duration>) -> Result<bool> {
    poll_fd(fd, libc::POLLIN, timeout)
}

/// Wait until `fd` is writable or the timeout elapses.
pub(crate) fn poll_writable(fd: RawFd, timeout: Option<Duration>) -> Result<bool> {
    poll_fd(fd, libc::POLLOUT, timeout)
}

fn poll_fd(fd: RawFd, events: libc::c_short, timeout: Option<Duration>) -> Result<bool> {
    use libc::{poll, pollfd};

    let mut pfd = pollfd {
        fd,
        events,
        revents: 0,
    };

    let timeout_ms = timeout
        .map(|d| d.as_millis() as i32)
        .unwrap_or(-1); // -1 = infinite

    let result = unsafe { poll(&mut pfd as *mut pollfd, 1, timeout_ms) };

    if result < 0 {
        return Err(Error::Io(std::io::Error::last_os_error()));
    }

    Ok(result > 0)
}
