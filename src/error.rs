//! Global error handling for context-builder
//!
//! Call-level failures are represented here. Per-entry problems found while
//! walking a tree (unreadable files, excluded directories, ...) are never
//! errors: they are recorded on the [`ScanResult`](crate::types::ScanResult).

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Global error type for context-builder operations
#[derive(Error, Debug)]
pub enum ContextError {
    /// The scan root does not exist
    #[error("Directory not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The scan root exists but is not a directory
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// Export format outside the supported set
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Redaction pattern name that is not registered
    #[error("Unknown redaction pattern: {0}")]
    UnknownPattern(String),

    /// File system errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON processing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Regular expression errors
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// PDF rendering errors
    #[error("PDF error: {0}")]
    Pdf(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session store errors
    #[error("Session error: {0}")]
    Session(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unexpected error
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Specialized Result type for context-builder operations
pub type Result<T> = std::result::Result<T, ContextError>;

/// Creates a ContextError with a formatted message
#[macro_export]
macro_rules! error {
    ($error_type:ident, $($arg:tt)*) => {
        $crate::error::ContextError::$error_type(format!($($arg)*))
    };
}

/// Returns an error result with a formatted message
#[macro_export]
macro_rules! bail {
    ($error_type:ident, $($arg:tt)*) => {
        return Err($crate::error!($error_type, $($arg)*))
    };
}

/// Ensures a condition is true, otherwise returns an error
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $error_type:ident, $($arg:tt)*) => {
        if !($cond) {
            $crate::bail!($error_type, $($arg)*)
        }
    };
}

/// Extension trait for adding context to errors
pub trait ResultExt<T, E> {
    /// Add additional context to an error
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: std::fmt::Display;
}

impl<T, E: std::error::Error + 'static> ResultExt<T, E> for std::result::Result<T, E> {
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: std::fmt::Display,
    {
        self.map_err(|e| {
            let context = f();
            ContextError::Unexpected(format!("{}: {}", context, e))
        })
    }
}
