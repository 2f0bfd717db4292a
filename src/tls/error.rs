//! TLS error taxonomy and engine diagnostics translation
//!
//! Errors fall into the classes the rest of the crate relies on:
//! configuration errors are fatal for the connection attempt, handshake
//! errors are fatal for that connection, and I/O errors are either transient
//! (want-read/want-write, retry the identical call) or hard. Shutdown
//! failures never surface here at all; they are logged and swallowed.

use openssl::error::ErrorStack;
use openssl::ssl::ErrorCode;

/// Errors reported by the secure server and socket.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] ErrorStack),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] crate::net::Error),

    #[error("Invalid TLS version: {0}")]
    InvalidVersion(String),

    #[error("Certificate error: {0}")]
    Certificate(String),

    #[error("CA file error: {0}")]
    CaFile(String),

    #[error("Private key error: {0}")]
    PrivateKey(String),

    #[error("Handshake failed (Error={code} | {reason})")]
    Handshake { code: i32, reason: String },

    #[error("TLS engine error (Error={code} | {reason})")]
    Engine { code: i32, reason: String },

    #[error("operation must be retried with identical arguments once the transport is readable")]
    WantRead,

    #[error("operation must be retried with identical arguments once the transport is writable")]
    WantWrite,

    #[error("connection closed by peer")]
    Closed,

    #[error("zero-length payloads are rejected before reaching the engine")]
    EmptyWrite,
}

impl TlsError {
    /// True for want-read/want-write conditions.
    ///
    /// A transient error means the identical call (same buffer, same length)
    /// must be reissued once the underlying transport becomes ready. Any
    /// other error is fatal for the operation.
    pub fn is_transient(&self) -> bool {
        matches!(self, TlsError::WantRead | TlsError::WantWrite)
    }

    /// Classify an engine error from an I/O or handshake attempt.
    pub(crate) fn from_ssl(err: &openssl::ssl::Error) -> Self {
        let code = err.code();
        if code == ErrorCode::WANT_READ {
            TlsError::WantRead
        } else if code == ErrorCode::WANT_WRITE {
            TlsError::WantWrite
        } else if code == ErrorCode::ZERO_RETURN {
            TlsError::Closed
        } else {
            TlsError::Engine {
                code: code.as_raw(),
                reason: reason_of(err),
            }
        }
    }
}

/// Decode the most specific reason available from an engine error.
///
/// Prefers the transport-level cause, then the engine's own error stack,
/// then the generic description of the error code.
pub(crate) fn reason_of(err: &openssl::ssl::Error) -> String {
    if let Some(io) = err.io_error() {
        io.to_string()
    } else if let Some(stack) = err.ssl_error() {
        stack.to_string()
    } else {
        describe_error_code(err.code()).to_string()
    }
}

/// Translate an engine error code to a human-readable string.
pub fn describe_error_code(code: ErrorCode) -> &'static str {
    if code == ErrorCode::NONE {
        "no error"
    } else if code == ErrorCode::SSL {
        "protocol failure in the TLS engine"
    } else if code == ErrorCode::WANT_READ {
        "the operation must be retried once the transport is readable"
    } else if code == ErrorCode::WANT_WRITE {
        "the operation must be retried once the transport is writable"
    } else if code == ErrorCode::WANT_X509_LOOKUP {
        "a certificate lookup callback asked to be called again"
    } else if code == ErrorCode::SYSCALL {
        "I/O failure at the transport layer"
    } else if code == ErrorCode::ZERO_RETURN {
        "the peer sent a close notification"
    } else {
        "unrecognized TLS engine error"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(TlsError::WantRead.is_transient());
        assert!(TlsError::WantWrite.is_transient());
        assert!(!TlsError::Closed.is_transient());
        assert!(!TlsError::EmptyWrite.is_transient());
        assert!(!TlsError::Handshake {
            code: 1,
            reason: "protocol failure in the TLS engine".to_string(),
        }
        .is_transient());
    }

    #[test]
    fn test_describe_known_codes() {
        assert_eq!(describe_error_code(ErrorCode::NONE), "no error");
        assert_eq!(
            describe_error_code(ErrorCode::ZERO_RETURN),
            "the peer sent a close notification"
        );
        assert_eq!(
            describe_error_code(ErrorCode::WANT_READ),
            "the operation must be retried once the transport is readable"
        );
        assert_eq!(
            describe_error_code(ErrorCode::SYSCALL),
            "I/O failure at the transport layer"
        );
    }

    #[test]
    fn test_error_display_carries_code_and_reason() {
        let err = TlsError::Handshake {
            code: 1,
            reason: "protocol failure in the TLS engine".to_string(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("Error=1"));
        assert!(rendered.contains("protocol failure"));
    }
}
