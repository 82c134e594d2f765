//! Process bootstrap: settings, then translator, then context, then logging.

use crate::config::{ConfigResolver, ResolverArgs};
use crate::context::{RuntimeContext, configured_language};
use crate::error::Result;
use crate::guard::Guard;
use crate::i18n::{LanguageSelection, MessageCatalog, Translator};
use crate::logging::{
    LoggingArgs, LoggingManager, Pipeline, Renderer, Severity, Sink, SinkKind, SinkRegistry,
    Threshold, stderr_writer,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Process-wide configuration resolver.
pub static SETTINGS: Guard<ConfigResolver> = Guard::new();
/// Process-wide translator.
pub static TRANSLATOR: Guard<MessageCatalog> = Guard::new();
/// Process-wide logging manager.
pub static LOGGING: Guard<LoggingManager> = Guard::new();

/// Inputs from the command line.
#[derive(Debug, Clone, Default)]
pub struct BootstrapOptions {
    pub config_path: Option<PathBuf>,
    pub language: Option<String>,
    pub cli_level: Option<Severity>,
    pub enable_console: bool,
}

/// A registry holding only a stderr sink at WARNING.
///
/// Install it globally before [`bootstrap`] so that warnings raised while
/// loading configuration are visible. Configuration replaces the sink.
pub fn bootstrap_registry() -> Arc<SinkRegistry> {
    let registry = Arc::new(SinkRegistry::new(Severity::Warning));
    if let Ok(writer) = stderr_writer()() {
        registry.attach(Sink::new(
            SinkKind::Console,
            Threshold::FollowGate,
            Arc::new(Pipeline::new(Renderer::Console)),
            writer,
        ));
    }
    registry
}

/// Initialize the three process-wide guards in order and return the
/// context. The logging manager takes over `registry`.
pub fn bootstrap(options: &BootstrapOptions, registry: Arc<SinkRegistry>) -> Result<RuntimeContext> {
    let settings = SETTINGS.initialize_from_context(ResolverArgs::new(options.config_path.clone()))?;
    debug!(file = ?settings.loaded_config_file(), "Settings initialized");

    let translator = TRANSLATOR.initialize_from_context(LanguageSelection {
        explicit: options.language.clone(),
        configured: configured_language(&settings),
    })?;
    debug!(locale = translator.locale().as_str(), "Translator initialized");

    let translator: Arc<dyn Translator> = translator;
    let context = RuntimeContext::create(Some(settings), Some(translator))?;

    let args = LoggingArgs::new(context.logging_settings()?, context.translator())
        .cli_level(options.cli_level)
        .enable_console(options.enable_console)
        .registry(registry);
    LOGGING.initialize_from_context(args)?;

    Ok(context)
}

/// Initialization diagnostics of all three guards, tagged by component.
pub fn initialization_errors() -> Vec<(&'static str, String)> {
    let tag = |name: &'static str, errors: Vec<String>| {
        errors.into_iter().map(move |e| (name, e)).collect::<Vec<_>>()
    };
    let mut all = tag("settings", SETTINGS.get_initialization_errors());
    all.extend(tag("translator", TRANSLATOR.get_initialization_errors()));
    all.extend(tag("logging", LOGGING.get_initialization_errors()));
    all
}

/// Flush and detach every sink of the process-wide logging manager.
///
/// Safe to call whether or not [`bootstrap`] succeeded.
pub fn shutdown_logging() {
    if let Ok(logging) = LOGGING.get_instance() {
        logging.shutdown();
    }
}

/// Tear everything down, logging first.
pub fn reset() {
    LOGGING.reset();
    TRANSLATOR.reset();
    SETTINGS.reset();
}
