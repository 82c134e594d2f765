//! Named logger handle.
//!
//! Emits ordinary `tracing` events tagged with the logger name, so whatever
//! subscriber is installed (normally the pipeline layer) receives them.

use crate::logging::Severity;
use serde_json::Value;
use std::error::Error;
use tracing::Level;

/// Emit one event at a constant tracing level with the standard fields.
macro_rules! emit {
    ($level:expr, $name:expr, $severity:expr, $data:expr, $error:expr, $message:expr) => {
        tracing::event!(
            $level,
            logger = $name,
            severity = $severity,
            data = $data,
            error = $error,
            "{}",
            $message
        )
    };
}

/// A logger bound to a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logger {
    name: String,
}

impl Logger {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Log a message at the given severity.
    pub fn log(&self, severity: Severity, message: &str) {
        self.emit(severity, message, None, None);
    }

    /// Log a message with structured data. Object keys become record fields.
    pub fn log_with_data(&self, severity: Severity, message: &str, data: Value) {
        let data = data.to_string();
        self.emit(severity, message, Some(&data), None);
    }

    fn emit(
        &self,
        severity: Severity,
        message: &str,
        data: Option<&str>,
        error: Option<&(dyn Error + 'static)>,
    ) {
        let name = self.name.as_str();
        let tag = severity.name();
        match severity.to_tracing() {
            Level::ERROR => emit!(Level::ERROR, name, tag, data, error, message),
            Level::WARN => emit!(Level::WARN, name, tag, data, error, message),
            Level::INFO => emit!(Level::INFO, name, tag, data, error, message),
            Level::DEBUG => emit!(Level::DEBUG, name, tag, data, error, message),
            Level::TRACE => emit!(Level::TRACE, name, tag, data, error, message),
        }
    }

    // Convenience methods

    pub fn debug(&self, msg: &str) {
        self.log(Severity::Debug, msg);
    }

    pub fn info(&self, msg: &str) {
        self.log(Severity::Info, msg);
    }

    pub fn warning(&self, msg: &str) {
        self.log(Severity::Warning, msg);
    }

    pub fn error(&self, msg: &str) {
        self.log(Severity::Error, msg);
    }

    pub fn critical(&self, msg: &str) {
        self.log(Severity::Critical, msg);
    }

    /// Log at ERROR with an error and its causes attached.
    pub fn exception(&self, msg: &str, err: &(dyn Error + 'static)) {
        self.emit(Severity::Error, msg, None, Some(err));
    }
}
