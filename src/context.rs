//! Runtime context: the resolver and translator downstream code works with.
//!
//! Building a context never touches logging; the caller configures the
//! logging manager from [`RuntimeContext::logging_settings`].

use crate::config::{ConfigResolver, LoggingSettings};
use crate::error::Result;
use crate::guard::AutoConstruct;
use crate::i18n::{MessageCatalog, Translator};
use crate::logger::Logger;
use std::fmt;
use std::sync::Arc;

/// Section and key holding the preferred language.
pub const LANGUAGE_SECTION: &str = "general";
pub const LANGUAGE_KEY: &str = "default_language";

#[derive(Clone)]
pub struct RuntimeContext {
    settings: Arc<ConfigResolver>,
    translator: Arc<dyn Translator>,
}

impl RuntimeContext {
    /// Compose a context, filling in defaults for what is not supplied.
    ///
    /// Without a resolver, one is opened at the standard locations; its load
    /// errors propagate.
    pub fn create(
        settings: Option<Arc<ConfigResolver>>,
        translator: Option<Arc<dyn Translator>>,
    ) -> Result<Self> {
        let settings = match settings {
            Some(settings) => settings,
            None => Arc::new(ConfigResolver::open(None)?),
        };
        let translator =
            translator.unwrap_or_else(|| Arc::new(MessageCatalog::construct_default()));
        Ok(Self {
            settings,
            translator,
        })
    }

    pub fn settings(&self) -> &Arc<ConfigResolver> {
        &self.settings
    }

    pub fn translator(&self) -> Arc<dyn Translator> {
        Arc::clone(&self.translator)
    }

    pub fn get_logger(&self, name: impl Into<String>) -> Logger {
        Logger::new(name)
    }

    pub fn translate(&self, message: &str) -> String {
        self.translator.translate(message)
    }

    /// Typed logging sections of the current document.
    pub fn logging_settings(&self) -> Result<LoggingSettings> {
        LoggingSettings::from_document(&self.settings.as_dict())
    }

    /// `general.default_language`, if set to a string.
    pub fn configured_language(&self) -> Option<String> {
        configured_language(&self.settings)
    }
}

pub(crate) fn configured_language(settings: &ConfigResolver) -> Option<String> {
    settings
        .get(LANGUAGE_SECTION, LANGUAGE_KEY, serde_json::Value::Null)
        .as_str()
        .map(str::to_string)
}

impl fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
