//! Injected diagnostics callback
//!
//! Every error path in this crate reports through a [`Logger`] handed in at
//! construction time. The callback is side-channel diagnostics only: no
//! return value is consulted, and errors are always reported to callers
//! through `Result` values, never through the log.

use std::fmt;
use std::sync::Arc;

/// Cloneable handle around an injected logging callback.
///
/// The callback receives one formatted line per diagnostic, tagged as
/// `[Component][Error] <description>`. It must not panic; a panicking sink
/// would unwind through connection handling.
#[derive(Clone)]
pub struct Logger {
    sink: Option<Arc<dyn Fn(&str) + Send + Sync>>,
}

impl Logger {
    /// Create a logger from a callback.
    pub fn new<F>(sink: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Logger {
            sink: Some(Arc::new(sink)),
        }
    }

    /// Logger that writes each line to standard error.
    pub fn stderr() -> Self {
        Logger::new(|line| eprintln!("{}", line))
    }

    /// Logger that discards all diagnostics.
    pub fn disabled() -> Self {
        Logger { sink: None }
    }

    /// Emit one tagged error line.
    pub fn error(&self, component: &str, message: impl fmt::Display) {
        if let Some(sink) = &self.sink {
            sink(&format!("[{}][Error] {}", component, message));
        }
    }

    /// Whether a sink is installed.
    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Logger::disabled()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
