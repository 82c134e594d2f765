//! Message translation.
//!
//! The catalog is keyed by the English text of a message, so a missing
//! entry simply yields the English original. Placeholders use `{name}` and
//! are substituted after translation with [`format_message`].

use crate::error::{AdvisoryError, ErrorKind, Result};
use crate::guard::{AutoConstruct, Managed};
use crate::lock_unpoisoned;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, RwLock};

/// Translation capability consumed by the logging manager and the context.
pub trait Translator: Send + Sync {
    fn translate(&self, message: &str) -> String;
}

/// Supported locales.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    De,
}

impl Locale {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::De => "de",
        }
    }

    /// Parse a language tag (case-insensitive, tolerant of region and
    /// encoding suffixes such as `de_DE.UTF-8`).
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        let lang = normalized.split(['-', '_', '.', '@']).next().unwrap_or("");
        match lang {
            "en" => Some(Self::En),
            "de" => Some(Self::De),
            _ => None,
        }
    }

    /// Locale from `LC_ALL`, `LC_MESSAGES` or `LANG`, first non-empty wins.
    pub fn from_env() -> Option<Self> {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .into_iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|v| !v.trim().is_empty())
            .and_then(|v| Self::parse(&v))
    }
}

/// A named value substituted into a `{name}` placeholder.
#[derive(Debug, Clone)]
pub struct MessageArg {
    pub key: &'static str,
    pub value: String,
}

impl MessageArg {
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

/// Substitute `{name}` placeholders in an already translated template.
pub fn format_message(template: &str, args: &[MessageArg]) -> String {
    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

const CATALOG_DE: &[(&str, &str)] = &[
    (
        "Invalid log level '{level}' in configuration; falling back to INFO.",
        "Ungültige Protokollstufe '{level}' in der Konfiguration; verwende INFO.",
    ),
    (
        "Failed to add console handler: {error}",
        "Konsolen-Handler konnte nicht hinzugefügt werden: {error}",
    ),
    (
        "Failed to set up {sink} log sink: {error}",
        "Protokollziel {sink} konnte nicht eingerichtet werden: {error}",
    ),
    (
        "log_directory is not set in the logger section",
        "log_directory ist im Abschnitt logger nicht gesetzt",
    ),
    ("Logging configured", "Protokollierung konfiguriert"),
    (
        "Unsupported language '{language}'; using English.",
        "Nicht unterstützte Sprache '{language}'; verwende Englisch.",
    ),
];

fn catalog_for(locale: Locale) -> Option<&'static HashMap<&'static str, &'static str>> {
    static CATALOG_DE_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    match locale {
        Locale::En => None,
        Locale::De => Some(CATALOG_DE_MAP.get_or_init(|| CATALOG_DE.iter().copied().collect())),
    }
}

/// Built-in translator backed by static catalogs.
#[derive(Debug)]
pub struct MessageCatalog {
    locale: RwLock<Locale>,
    errors: Mutex<Vec<String>>,
}

impl MessageCatalog {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale: RwLock::new(locale),
            errors: Mutex::new(Vec::new()),
        }
    }

    pub fn locale(&self) -> Locale {
        *self.locale.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_locale(&self, locale: Locale) {
        *self.locale.write().unwrap_or_else(|e| e.into_inner()) = locale;
    }

    /// Pick the locale for the given selection.
    ///
    /// The explicit language wins over the configured one; the environment
    /// is consulted only when neither is given. A given but unsupported
    /// language yields English plus an advisory.
    pub fn resolve_locale(selection: &LanguageSelection) -> (Locale, Option<AdvisoryError>) {
        let requested = [selection.explicit.as_deref(), selection.configured.as_deref()]
            .into_iter()
            .flatten()
            .find(|v| !v.trim().is_empty());

        match requested {
            Some(value) => match Locale::parse(value) {
                Some(locale) => (locale, None),
                None => {
                    let message = format_message(
                        "Unsupported language '{language}'; using English.",
                        &[MessageArg::new("language", value)],
                    );
                    (
                        Locale::En,
                        Some(AdvisoryError::new(ErrorKind::InvalidLanguage, message)),
                    )
                }
            },
            None => (Locale::from_env().unwrap_or_default(), None),
        }
    }
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self::new(Locale::default())
    }
}

impl Translator for MessageCatalog {
    fn translate(&self, message: &str) -> String {
        catalog_for(self.locale())
            .and_then(|catalog| catalog.get(message).copied())
            .unwrap_or(message)
            .to_string()
    }
}

/// Language inputs for configuring a [`MessageCatalog`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageSelection {
    /// From the command line.
    pub explicit: Option<String>,
    /// `general.default_language` from the configuration.
    pub configured: Option<String>,
}

impl Managed for MessageCatalog {
    type Args = LanguageSelection;
    const NAME: &'static str = "TranslationManager";

    fn construct(_args: &Self::Args) -> Result<Self> {
        Ok(Self::default())
    }

    fn configure(&self, args: Self::Args) -> Result<()> {
        let mut errors = lock_unpoisoned(&self.errors);
        errors.clear();

        let (locale, advisory) = Self::resolve_locale(&args);
        if let Some(advisory) = advisory {
            tracing::warn!("{}", advisory);
            errors.push(advisory.to_string());
        }
        self.set_locale(locale);
        Ok(())
    }

    fn instance_errors(&self) -> Vec<String> {
        lock_unpoisoned(&self.errors).clone()
    }
}

impl AutoConstruct for MessageCatalog {
    fn construct_default() -> Self {
        Self::new(Locale::from_env().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_parse() {
        assert_eq!(Locale::parse("de"), Some(Locale::De));
        assert_eq!(Locale::parse("de_DE.UTF-8"), Some(Locale::De));
        assert_eq!(Locale::parse("EN-us"), Some(Locale::En));
        assert_eq!(Locale::parse("C"), None);
        assert_eq!(Locale::parse(""), None);
    }

    #[test]
    fn translate_falls_back_to_original() {
        let catalog = MessageCatalog::new(Locale::De);
        assert_eq!(
            catalog.translate("Logging configured"),
            "Protokollierung konfiguriert"
        );
        assert_eq!(catalog.translate("not in catalog"), "not in catalog");

        catalog.set_locale(Locale::En);
        assert_eq!(catalog.translate("Logging configured"), "Logging configured");
    }

    #[test]
    fn format_message_after_translation() {
        let catalog = MessageCatalog::new(Locale::De);
        let text = format_message(
            &catalog.translate("Invalid log level '{level}' in configuration; falling back to INFO."),
            &[MessageArg::new("level", "LOUD")],
        );
        assert_eq!(
            text,
            "Ungültige Protokollstufe 'LOUD' in der Konfiguration; verwende INFO."
        );
    }

    #[test]
    fn resolve_locale_precedence() {
        let selection = LanguageSelection {
            explicit: Some("de".into()),
            configured: Some("en".into()),
        };
        assert_eq!(MessageCatalog::resolve_locale(&selection), (Locale::De, None));

        let selection = LanguageSelection {
            explicit: None,
            configured: Some("de_AT".into()),
        };
        assert_eq!(MessageCatalog::resolve_locale(&selection).0, Locale::De);
    }

    #[test]
    fn unknown_language_records_advisory() {
        let catalog = MessageCatalog::default();
        catalog
            .configure(LanguageSelection {
                explicit: Some("tlh".into()),
                configured: None,
            })
            .unwrap();

        assert_eq!(catalog.locale(), Locale::En);
        let errors = catalog.instance_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("tlh"));
    }
}
