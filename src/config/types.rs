//! Typed views over the logging-related configuration sections.
//!
//! The resolver stores untyped sections; these structs are what the logging
//! manager consumes. Every field has a default so that partial files work.

use super::document::{APP_NAME, ConfigDocument};
use crate::error::{FatalError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Section names read by [`LoggingSettings::from_document`].
pub const LOGGER_SECTION: &str = "logger";
pub const CONSOLE_HANDLER_SECTION: &str = "console_handler";
pub const FILE_HANDLER_SECTION: &str = "file_handler";
pub const LIMITED_FILE_HANDLER_SECTION: &str = "limited_file_handler";

/// The `logger` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerSection {
    /// Severity name; validated by the logging manager, not here.
    #[serde(default = "default_level")]
    pub level: String,

    /// Line template. Kept for compatibility, not interpreted.
    #[serde(default = "default_format")]
    pub format: String,

    /// Directory for log files. Required whenever a file sink is enabled.
    #[serde(default)]
    pub log_directory: Option<PathBuf>,

    /// `"json"` selects JSON lines; anything else selects console rendering.
    #[serde(default = "default_output_format")]
    pub output_format: String,
}

impl Default for LoggerSection {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
            log_directory: None,
            output_format: default_output_format(),
        }
    }
}

fn default_level() -> String {
    "INFO".to_string()
}

fn default_format() -> String {
    "%(asctime)s - %(name)s - %(levelname)s - %(message)s".to_string()
}

fn default_output_format() -> String {
    "console".to_string()
}

/// The `console_handler` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsoleHandlerSection {
    #[serde(default)]
    pub enabled: bool,
}

/// The `file_handler` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileHandlerSection {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_file_name")]
    pub file_name: String,
}

impl Default for FileHandlerSection {
    fn default() -> Self {
        Self {
            enabled: false,
            file_name: default_file_name(),
        }
    }
}

fn default_file_name() -> String {
    format!("{}.log", APP_NAME)
}

/// The `limited_file_handler` section: a size-rotated file that only
/// receives ERROR and above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitedFileHandlerSection {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_limited_file_name")]
    pub file_name: String,

    /// Size at which the file rotates. 0 disables rotation.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,

    /// Number of rotated files to keep.
    #[serde(default = "default_backup_count")]
    pub backup_count: u32,
}

impl Default for LimitedFileHandlerSection {
    fn default() -> Self {
        Self {
            enabled: false,
            file_name: default_limited_file_name(),
            max_bytes: default_max_bytes(),
            backup_count: default_backup_count(),
        }
    }
}

fn default_limited_file_name() -> String {
    format!("limited_{}.log", APP_NAME)
}

fn default_max_bytes() -> u64 {
    1024
}

fn default_backup_count() -> u32 {
    5
}

/// Everything the logging manager needs from the configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default)]
    pub logger: LoggerSection,
    #[serde(default)]
    pub console_handler: ConsoleHandlerSection,
    #[serde(default)]
    pub file_handler: FileHandlerSection,
    #[serde(default)]
    pub limited_file_handler: LimitedFileHandlerSection,
}

impl LoggingSettings {
    /// Extract the logging sections from a document.
    ///
    /// Missing sections and keys take their defaults. A present value of the
    /// wrong type (e.g. `max_bytes: lots`) is an error.
    pub fn from_document(doc: &ConfigDocument) -> Result<Self> {
        Ok(Self {
            logger: typed_section(doc, LOGGER_SECTION)?,
            console_handler: typed_section(doc, CONSOLE_HANDLER_SECTION)?,
            file_handler: typed_section(doc, FILE_HANDLER_SECTION)?,
            limited_file_handler: typed_section(doc, LIMITED_FILE_HANDLER_SECTION)?,
        })
    }
}

fn typed_section<T: DeserializeOwned>(doc: &ConfigDocument, name: &str) -> Result<T> {
    serde_json::from_value(doc.section_value(name)).map_err(|source| FatalError::InvalidSection {
        section: name.to_string(),
        source,
    })
}
