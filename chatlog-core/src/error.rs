/// Structured error types for chatlog-core library.
///
/// Uses `thiserror` for better API surface and error composition.
/// The binary crate (chatlog-cli) wraps these in `anyhow` with call-site
/// context; library consumers get structured, matchable errors.

use std::io;
use thiserror::Error;

/// Main error type for chatlog-core operations
#[derive(Error, Debug)]
pub enum ExportError {
    /// Invalid or contradictory configuration, detected before any network call
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    /// The remote service could not be reached or returned a failure status
    #[error("Transport error: {reason}")]
    Transport { reason: String },

    /// The remote service rejected the supplied credentials
    #[error("Authentication failed ({status}): {reason}")]
    Auth { status: u16, reason: String },

    /// The remote service answered with data that breaks the paging contract
    #[error("Protocol error: {reason}")]
    Protocol { reason: String },

    /// A log entry is missing a mandatory field
    #[error("Malformed log entry {index}: {reason}")]
    MalformedEntry { index: usize, reason: String },

    /// JSON parsing or serialization failed
    #[error("JSON error at {context}: {source}")]
    Json {
        context: String,
        source: serde_json::Error,
    },

    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Delimited (CSV/TSV) output failed
    #[error("CSV error: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },

    /// Spreadsheet output failed
    #[error("XLSX error: {source}")]
    Xlsx {
        #[from]
        source: rust_xlsxwriter::XlsxError,
    },
}

/// Result type alias for chatlog-core operations
pub type Result<T> = std::result::Result<T, ExportError>;

impl ExportError {
    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Create a transport error
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(status: u16, reason: impl Into<String>) -> Self {
        Self::Auth {
            status,
            reason: reason.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
        }
    }

    /// Create a malformed entry error
    pub fn malformed_entry(index: usize, reason: impl Into<String>) -> Self {
        Self::MalformedEntry {
            index,
            reason: reason.into(),
        }
    }

    /// Create a JSON error with context
    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    /// True for errors that mean the upstream data contract was violated
    pub fn is_data_integrity(&self) -> bool {
        matches!(self, Self::MalformedEntry { .. })
    }
}
