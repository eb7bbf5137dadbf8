//! # Theme Error Types
//!
//! This module provides the error types of the defaults loading pipeline.
//! Malformed values, unresolved references and reference cycles abort a theme
//! activation; unreadable sources are logged and skipped by the loader and
//! never surface here.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading and resolving a theme.
#[derive(Error, Debug)]
pub enum ThemeError {
    /// Theme with the specified name was not found.
    #[error("Theme '{name}' not found")]
    ThemeNotFound {
        /// The name of the theme that was not found.
        name: String,
    },

    /// A properties source could not be read.
    #[error("Failed to read {path:?}: {source}")]
    Read {
        /// The path of the source.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A value could not be parsed into its type.
    #[error("Failed to parse '{key}={value}': {reason}")]
    InvalidValue {
        /// The key of the value.
        key: String,
        /// The raw value.
        value: String,
        /// What went wrong.
        reason: String,
    },

    /// A reference points to a key that does not exist.
    #[error("Variable or property '{key}' not found (reference chain: {})", chain.join(" -> "))]
    UnresolvedReference {
        /// The missing key.
        key: String,
        /// The references followed before the missing key was hit.
        chain: Vec<String>,
    },

    /// A chain of references leads back to itself.
    #[error("Endless recursion in variable or property: {}", chain.join(" -> "))]
    ReferenceCycle {
        /// The keys forming the cycle, starting and ending with the same key.
        chain: Vec<String>,
    },

    /// One or more keys of a theme failed to parse.
    #[error("Theme '{theme}' has {} malformed value(s):\n{}", errors.len(), format_errors(errors))]
    Malformed {
        /// The name of the theme.
        theme: String,
        /// All per-key failures.
        errors: Vec<ThemeError>,
    },

    /// Error in the theme configuration.
    #[error("Invalid theme configuration {path:?}: {details}")]
    Config {
        /// The path of the configuration file, if any.
        path: Option<PathBuf>,
        /// Details about the problem.
        details: String,
    },

    /// Error setting up file watcher for live reload.
    #[error("Failed to setup file watcher: {source}")]
    Watcher {
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for theme operations.
pub type ThemeResult<T> = Result<T, ThemeError>;

fn format_errors(errors: &[ThemeError]) -> String {
    errors
        .iter()
        .map(|e| format!("  {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

impl ThemeError {
    /// Create a theme not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::ThemeNotFound { name: name.into() }
    }

    /// Create a read error for a source path.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(path: Option<PathBuf>, details: impl Into<String>) -> Self {
        Self::Config {
            path,
            details: details.into(),
        }
    }

    /// Create a file watcher error from any error type.
    pub fn watcher(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Watcher {
            source: Box::new(source),
        }
    }

    /// Whether this error is fatal regardless of the strictness policy.
    ///
    /// Broken references mean the theme itself is malformed, so they are never
    /// skipped in lenient mode.
    pub fn is_reference_error(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedReference { .. } | Self::ReferenceCycle { .. }
        )
    }
}

/// Error produced by the low level parsing helpers, before a key is known.
///
/// The value parser wraps it into [ThemeError::InvalidValue] with the key and
/// raw value attached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ParseError(pub String);

impl ParseError {
    /// Create a new parse error.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<ParseError> for String {
    fn from(e: ParseError) -> Self {
        e.0
    }
}
