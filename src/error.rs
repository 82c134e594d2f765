//! Error taxonomy for configuration and logging bootstrap.
//!
//! Fatal errors propagate to the caller (normally the process bootstrap).
//! Advisory errors are recovered locally and only recorded for diagnostics.

use serde::Serialize;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Error kinds for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    // Fatal
    ConfigurationSyntax,
    WriteConfiguration,
    LogHandler,
    NotInitialized,

    // Recovered locally
    InvalidLogLevel,
    InvalidLanguage,
    AlreadyConfigured,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::ConfigurationSyntax => "configuration-syntax",
            ErrorKind::WriteConfiguration => "write-configuration",
            ErrorKind::LogHandler => "log-handler",
            ErrorKind::NotInitialized => "not-initialized",
            ErrorKind::InvalidLogLevel => "invalid-log-level",
            ErrorKind::InvalidLanguage => "invalid-language",
            ErrorKind::AlreadyConfigured => "already-configured",
        };
        write!(f, "{}", s)
    }
}

/// Errors that abort the current operation and reach the caller.
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    #[error("invalid configuration syntax in {}: {reason}", path.display())]
    ConfigurationSyntax { path: PathBuf, reason: String },

    #[error("could not read configuration file {}: {source}", path.display())]
    ConfigurationUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid value in configuration section '{section}': {source}")]
    InvalidSection {
        section: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not write configuration to {}: {source}", path.display())]
    WriteConfiguration {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to set up {sink} log sink: {reason}")]
    LogHandler { sink: String, reason: String },

    #[error("invalid log level specified: {value}")]
    InvalidLogLevel { value: String },

    #[error("{component} has not been initialized")]
    NotInitialized { component: &'static str },
}

impl FatalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FatalError::ConfigurationSyntax { .. }
            | FatalError::ConfigurationUnreadable { .. }
            | FatalError::InvalidSection { .. } => ErrorKind::ConfigurationSyntax,
            FatalError::WriteConfiguration { .. } => ErrorKind::WriteConfiguration,
            FatalError::LogHandler { .. } => ErrorKind::LogHandler,
            FatalError::InvalidLogLevel { .. } => ErrorKind::InvalidLogLevel,
            FatalError::NotInitialized { .. } => ErrorKind::NotInitialized,
        }
    }

    // Convenience constructors

    pub fn log_handler(sink: impl fmt::Display, reason: impl fmt::Display) -> Self {
        FatalError::LogHandler {
            sink: sink.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn write_configuration(path: impl Into<PathBuf>, source: io::Error) -> Self {
        FatalError::WriteConfiguration {
            path: path.into(),
            source,
        }
    }

    pub fn syntax(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        FatalError::ConfigurationSyntax {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// A recovered error, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvisoryError {
    pub kind: ErrorKind,
    pub message: String,
}

impl AdvisoryError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_log_level(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidLogLevel, message)
    }

    pub fn already_configured(component: &str) -> Self {
        Self::new(
            ErrorKind::AlreadyConfigured,
            format!("{} already configured. Cannot re-configure.", component),
        )
    }
}

impl fmt::Display for AdvisoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AdvisoryError {}

/// Result type for configuration and logging operations.
pub type Result<T> = std::result::Result<T, FatalError>;
