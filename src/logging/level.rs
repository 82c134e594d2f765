//! Severity ranks and the process-wide minimum-severity gate.

use crate::error::FatalError;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::Level;

/// Log severity. Lower rank is more verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Severity {
    Debug = 10,
    Info = 20,
    Warning = 30,
    Error = 40,
    Critical = 50,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Debug,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];

    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn from_rank(rank: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.rank() == rank)
    }

    /// Upper-case name as written in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Lower-case name as written into log records.
    pub fn record_name(self) -> &'static str {
        match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }

    /// Merge the configured level with an optional CLI level.
    ///
    /// The result is always the more verbose of the two.
    pub fn effective(configured: Severity, cli: Option<Severity>) -> Severity {
        match cli {
            Some(cli) => configured.min(cli),
            None => configured,
        }
    }

    /// Map a count of repeated `-v` flags to a severity.
    pub fn from_verbosity(count: u8) -> Severity {
        match count {
            0 => Severity::Warning,
            1 => Severity::Info,
            _ => Severity::Debug,
        }
    }

    /// The tracing level an event of this severity is emitted at.
    ///
    /// tracing has no level above ERROR; critical events carry an extra
    /// `severity` field instead.
    pub fn to_tracing(self) -> Level {
        match self {
            Severity::Debug => Level::DEBUG,
            Severity::Info => Level::INFO,
            Severity::Warning => Level::WARN,
            Severity::Error | Severity::Critical => Level::ERROR,
        }
    }

    pub fn from_tracing(level: Level) -> Severity {
        match level {
            Level::TRACE | Level::DEBUG => Severity::Debug,
            Level::INFO => Severity::Info,
            Level::WARN => Severity::Warning,
            Level::ERROR => Severity::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Severity {
    type Err = FatalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Severity::Debug),
            "INFO" => Ok(Severity::Info),
            "WARNING" | "WARN" => Ok(Severity::Warning),
            "ERROR" => Ok(Severity::Error),
            "CRITICAL" | "FATAL" => Ok(Severity::Critical),
            _ => Err(FatalError::InvalidLogLevel {
                value: s.to_string(),
            }),
        }
    }
}

/// Atomic minimum-severity gate shared by the sinks of one registry.
#[derive(Debug)]
pub struct LevelGate(AtomicU8);

impl LevelGate {
    pub fn new(level: Severity) -> Self {
        Self(AtomicU8::new(level.rank()))
    }

    pub fn get(&self) -> Severity {
        Severity::from_rank(self.0.load(Ordering::Relaxed)).unwrap_or(Severity::Info)
    }

    pub fn set(&self, level: Severity) {
        self.0.store(level.rank(), Ordering::Relaxed);
    }

    /// Check if a record at the given severity passes the gate.
    pub fn admits(&self, level: Severity) -> bool {
        level.rank() >= self.0.load(Ordering::Relaxed)
    }
}

impl Default for LevelGate {
    fn default() -> Self {
        Self::new(Severity::Info)
    }
}
