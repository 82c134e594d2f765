//! Integration tests for the lifecycle guard, the runtime context and the
//! process bootstrap.
//!
//! Most tests use guards local to the test. Only
//! `bootstrap_wires_process_guards` touches the process-wide statics,
//! and it resets them before returning.

use checkconnect::bootstrap::{self, BootstrapOptions, LOGGING, SETTINGS, TRANSLATOR};
use checkconnect::config::{ConfigPaths, ConfigResolver, LoggingSettings, ResolverArgs};
use checkconnect::context::RuntimeContext;
use checkconnect::error::{ErrorKind, FatalError};
use checkconnect::guard::Guard;
use checkconnect::i18n::{LanguageSelection, Locale, MessageCatalog, Translator};
use checkconnect::logging::{
    BoxedWriter, ConsoleWriterFactory, LoggingArgs, LoggingManager, Severity, SinkRegistry,
};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuffer {
    fn factory(&self) -> ConsoleWriterFactory {
        let buffer = self.clone();
        Arc::new(move || Ok(Box::new(buffer.clone()) as BoxedWriter))
    }
}

fn english() -> Arc<dyn Translator> {
    Arc::new(MessageCatalog::new(Locale::En))
}

fn console_settings() -> LoggingSettings {
    let mut settings = LoggingSettings::default();
    settings.console_handler.enabled = true;
    settings
}

fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("config.yaml");
    fs::write(&path, content).unwrap();
    path
}

fn already_configured_count(errors: &[String]) -> usize {
    errors
        .iter()
        .filter(|e| e.contains("already configured"))
        .count()
}

#[test]
fn get_instance_before_initialize_fails() {
    let guard: Guard<LoggingManager> = Guard::new();

    let err = guard.get_instance().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotInitialized);
    assert!(!guard.is_configured());
}

#[test]
fn second_initialize_is_recorded_once() {
    let guard: Guard<LoggingManager> = Guard::new();
    let registry = Arc::new(SinkRegistry::default());
    let args = || {
        LoggingArgs::new(console_settings(), english())
            .registry(Arc::clone(&registry))
            .console_writer(SharedBuffer::default().factory())
    };

    let first = guard.initialize_from_context(args()).unwrap();
    assert!(guard.is_configured());
    assert_eq!(already_configured_count(&guard.get_initialization_errors()), 0);

    let second = guard
        .initialize_from_context(args().cli_level(Some(Severity::Debug)))
        .unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    // The second call changed nothing.
    assert_eq!(second.effective_level(), Severity::Info);

    let errors = guard.get_initialization_errors();
    assert_eq!(already_configured_count(&errors), 1);
    assert!(
        errors
            .iter()
            .any(|e| e == "LoggingManager already configured. Cannot re-configure.")
    );
}

#[test]
fn reset_leaves_no_sinks() {
    let guard: Guard<LoggingManager> = Guard::new();
    let registry = Arc::new(SinkRegistry::default());
    guard
        .initialize_from_context(
            LoggingArgs::new(console_settings(), english())
                .enable_console(true)
                .registry(Arc::clone(&registry))
                .console_writer(SharedBuffer::default().factory()),
        )
        .unwrap();
    assert_eq!(registry.len(), 1);

    guard.reset();

    assert!(registry.is_empty());
    assert!(!guard.is_configured());
    assert!(guard.get_instance().is_err());
    assert!(guard.get_initialization_errors().is_empty());
}

#[test]
fn failed_configure_can_be_retried() {
    let temp = TempDir::new().unwrap();
    let guard: Guard<ConfigResolver> = Guard::new();
    let missing = temp.path().join("config.yaml");
    let args = || {
        ResolverArgs::new(Some(missing.clone()))
            .with_paths(ConfigPaths::with_candidates(Vec::<PathBuf>::new()))
    };

    let err = guard.initialize_from_context(args()).unwrap_err();
    assert!(matches!(err, FatalError::WriteConfiguration { .. }));
    assert!(!guard.is_configured());
    assert!(guard.get_instance().is_ok());

    let errors = guard.get_initialization_errors();
    assert!(errors.iter().any(|e| e.contains("not found")));

    fs::write(&missing, "gui:\n  enabled: false\n").unwrap();
    let resolver = guard.initialize_from_context(args()).unwrap();
    assert!(guard.is_configured());
    assert_eq!(resolver.loaded_config_file(), Some(missing));
}

#[test]
fn translator_guard_records_unsupported_language() {
    let guard: Guard<MessageCatalog> = Guard::new();
    let catalog = guard
        .initialize_from_context(LanguageSelection {
            explicit: Some("fr".into()),
            configured: Some("de".into()),
        })
        .unwrap();

    assert_eq!(catalog.locale(), Locale::En);
    let errors = guard.get_initialization_errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("'fr'"));
}

#[test]
fn translator_uses_configured_language() {
    let guard: Guard<MessageCatalog> = Guard::new();
    let catalog = guard
        .initialize_from_context(LanguageSelection {
            explicit: None,
            configured: Some("de".into()),
        })
        .unwrap();

    assert_eq!(catalog.locale(), Locale::De);
    assert_eq!(
        catalog.translate("Logging configured"),
        "Protokollierung konfiguriert"
    );
}

#[test]
fn get_or_construct_does_not_configure() {
    let guard: Guard<MessageCatalog> = Guard::new();

    let first = guard.get_or_construct();
    let second = guard.get_or_construct();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(!guard.is_configured());

    let configured = guard
        .initialize_from_context(LanguageSelection {
            explicit: Some("de".into()),
            configured: None,
        })
        .unwrap();
    assert!(Arc::ptr_eq(&first, &configured));
    assert_eq!(first.locale(), Locale::De);
}

#[test]
fn context_exposes_settings_and_translation() {
    let temp = TempDir::new().unwrap();
    let path = write_config(
        temp.path(),
        "general:\n  default_language: de\nlogger:\n  level: DEBUG\n",
    );
    let resolver = ConfigResolver::new(ConfigPaths::with_candidates([path]), None);
    resolver.load().unwrap();

    let german: Arc<dyn Translator> = Arc::new(MessageCatalog::new(Locale::De));
    let context = RuntimeContext::create(Some(Arc::new(resolver)), Some(german)).unwrap();

    assert_eq!(context.configured_language().as_deref(), Some("de"));
    assert_eq!(context.logging_settings().unwrap().logger.level, "DEBUG");
    assert_eq!(
        context.translate("Logging configured"),
        "Protokollierung konfiguriert"
    );
    assert_eq!(context.translate("untranslated"), "untranslated");
    assert_eq!(context.get_logger("checkconnect.gui").name(), "checkconnect.gui");
}

#[test]
fn context_reports_invalid_logging_section() {
    let temp = TempDir::new().unwrap();
    let path = write_config(temp.path(), "limited_file_handler:\n  max_bytes: lots\n");
    let resolver = ConfigResolver::new(ConfigPaths::with_candidates([path]), None);
    resolver.load().unwrap();

    let context = RuntimeContext::create(Some(Arc::new(resolver)), None).unwrap();
    let err = context.logging_settings().unwrap_err();
    assert!(matches!(
        &err,
        FatalError::InvalidSection { section, .. } if section == "limited_file_handler"
    ));
}

#[test]
fn bootstrap_wires_process_guards() {
    let temp = TempDir::new().unwrap();
    let path = write_config(
        temp.path(),
        "general:\n  default_language: en\nlogger:\n  level: WARNING\n  output_format: json\n",
    );
    let options = BootstrapOptions {
        config_path: Some(path.clone()),
        language: None,
        cli_level: Some(Severity::Debug),
        enable_console: false,
    };
    let registry = Arc::new(SinkRegistry::default());

    let context = bootstrap::bootstrap(&options, Arc::clone(&registry)).unwrap();

    assert_eq!(context.settings().loaded_config_file(), Some(path));
    assert!(SETTINGS.is_configured());
    assert!(TRANSLATOR.is_configured());
    assert_eq!(TRANSLATOR.get_instance().unwrap().locale(), Locale::En);

    let logging = LOGGING.get_instance().unwrap();
    assert!(Arc::ptr_eq(logging.registry(), &registry));
    assert_eq!(logging.effective_level(), Severity::Debug);
    assert!(bootstrap::initialization_errors().is_empty());

    // A second bootstrap reuses everything and records one entry per guard.
    bootstrap::bootstrap(&options, Arc::new(SinkRegistry::default())).unwrap();
    let errors = bootstrap::initialization_errors();
    assert_eq!(errors.len(), 3);
    assert!(errors.iter().all(|(_, e)| e.contains("already configured")));
    assert!(Arc::ptr_eq(LOGGING.get_instance().unwrap().registry(), &registry));

    bootstrap::reset();
    assert!(registry.is_empty());
    assert!(SETTINGS.get_instance().is_err());
    assert!(LOGGING.get_instance().is_err());

    // A failed bootstrap leaves the console sink attached until logging is
    // shut down explicitly.
    let broken = write_config(temp.path(), "file_handler:\n  enabled: true\n");
    let options = BootstrapOptions {
        config_path: Some(broken),
        language: None,
        cli_level: None,
        enable_console: true,
    };
    let registry = Arc::new(SinkRegistry::default());

    let err = bootstrap::bootstrap(&options, Arc::clone(&registry)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LogHandler);
    assert!(!LOGGING.is_configured());
    assert_eq!(registry.len(), 1);

    bootstrap::shutdown_logging();
    assert!(registry.is_empty());

    bootstrap::reset();
    assert!(LOGGING.get_instance().is_err());
}
