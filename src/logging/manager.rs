//! The logging pipeline manager.
//!
//! `apply_configuration` rebuilds the sink set of one [`SinkRegistry`] from
//! the typed logging settings:
//! 1. Detach whatever is attached.
//! 2. Resolve the effective level (invalid names fall back to INFO).
//! 3. Choose the renderer and build the shared processor chain.
//! 4. Attach console, primary file and limited file sinks as enabled.
//! 5. Emit queued diagnostics and a confirmation record.
//!
//! The limited sink only ever receives ERROR and above.

use super::layer::PipelineLayer;
use super::level::Severity;
use super::record::{Pipeline, RawEvent, Renderer};
use super::rotating::RotatingFileWriter;
use super::sink::{BoxedWriter, Sink, SinkKind, SinkRegistry, Threshold};
use crate::config::{APP_NAME, LoggingSettings};
use crate::error::{AdvisoryError, ErrorKind, FatalError, Result};
use crate::guard::Managed;
use crate::i18n::{MessageArg, MessageCatalog, Translator, format_message};
use crate::lock_unpoisoned;
use crate::logger::Logger;
use serde_json::Value;
use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::Subscriber;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;

const MSG_INVALID_LEVEL: &str = "Invalid log level '{level}' in configuration; falling back to INFO.";
const MSG_CONSOLE_FAILED: &str = "Failed to add console handler: {error}";
const MSG_SINK_FAILED: &str = "Failed to set up {sink} log sink: {error}";
const MSG_NO_LOG_DIRECTORY: &str = "log_directory is not set in the logger section";
const MSG_CONFIGURED: &str = "Logging configured";

/// Produces the writer for the console sink.
pub type ConsoleWriterFactory = Arc<dyn Fn() -> io::Result<BoxedWriter> + Send + Sync>;

pub fn stderr_writer() -> ConsoleWriterFactory {
    Arc::new(|| Ok(Box::new(io::stderr()) as BoxedWriter))
}

/// Build a subscriber that routes every event into `registry`.
pub fn subscriber_for(registry: Arc<SinkRegistry>) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::registry().with(PipelineLayer::new(registry))
}

pub struct LoggingManager {
    registry: Arc<SinkRegistry>,
    console_writer: ConsoleWriterFactory,
    translator: Mutex<Arc<dyn Translator>>,
    errors: Mutex<Vec<String>>,
    logger: Logger,
}

impl LoggingManager {
    /// A manager over a fresh registry, with console output on stderr.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(SinkRegistry::default()))
    }

    pub fn with_registry(registry: Arc<SinkRegistry>) -> Self {
        Self {
            registry,
            console_writer: stderr_writer(),
            translator: Mutex::new(Arc::new(MessageCatalog::default())),
            errors: Mutex::new(Vec::new()),
            logger: Logger::new(APP_NAME),
        }
    }

    /// Replace the console writer factory.
    pub fn with_console_writer(mut self, factory: ConsoleWriterFactory) -> Self {
        self.console_writer = factory;
        self
    }

    /// The registry the sinks are attached to.
    pub fn registry(&self) -> &Arc<SinkRegistry> {
        &self.registry
    }

    /// A subscriber over this manager's registry, for installing globally
    /// or for `tracing::subscriber::with_default`.
    pub fn subscriber(&self) -> impl Subscriber + Send + Sync + 'static {
        subscriber_for(Arc::clone(&self.registry))
    }

    /// Level currently applied to console and primary file sinks.
    pub fn effective_level(&self) -> Severity {
        self.registry.level()
    }

    /// Rebuild the sink set from `settings`.
    ///
    /// A missing log directory or an unopenable file is fatal; sinks attached
    /// before the failure stay attached. A console failure is only recorded.
    pub fn apply_configuration(
        &self,
        cli_level: Option<Severity>,
        enable_console: bool,
        settings: &LoggingSettings,
        translator: Arc<dyn Translator>,
    ) -> Result<()> {
        lock_unpoisoned(&self.errors).clear();
        *lock_unpoisoned(&self.translator) = Arc::clone(&translator);
        self.registry.clear();

        let mut pending: Vec<AdvisoryError> = Vec::new();

        let configured = match settings.logger.level.parse::<Severity>() {
            Ok(level) => level,
            Err(_) => {
                let advisory = AdvisoryError::invalid_log_level(format_message(
                    &translator.translate(MSG_INVALID_LEVEL),
                    &[MessageArg::new("level", settings.logger.level.as_str())],
                ));
                self.record(&advisory.to_string());
                pending.push(advisory);
                Severity::Info
            }
        };
        let effective = Severity::effective(configured, cli_level);
        self.registry.set_level(effective);

        let renderer = Renderer::from_output_format(&settings.logger.output_format);
        let pipeline = Arc::new(Pipeline::new(renderer));

        if enable_console || settings.console_handler.enabled {
            match (self.console_writer)() {
                Ok(writer) => self.registry.attach(Sink::new(
                    SinkKind::Console,
                    Threshold::FollowGate,
                    Arc::clone(&pipeline),
                    writer,
                )),
                Err(e) => {
                    let advisory = AdvisoryError::new(
                        ErrorKind::LogHandler,
                        format_message(
                            &translator.translate(MSG_CONSOLE_FAILED),
                            &[MessageArg::new("error", e.to_string())],
                        ),
                    );
                    self.record(&advisory.to_string());
                    pending.push(advisory);
                }
            }
        }

        let file_sinks = self
            .attach_file_sink(settings, &pipeline, translator.as_ref())
            .and_then(|()| self.attach_limited_sink(settings, &pipeline, translator.as_ref()));

        for advisory in &pending {
            self.emit_own(Severity::Warning, &advisory.message);
        }

        if let Err(e) = file_sinks {
            let (sink, reason) = match &e {
                FatalError::LogHandler { sink, reason } => (sink.clone(), reason.clone()),
                other => (String::new(), other.to_string()),
            };
            let message = format_message(
                &translator.translate(MSG_SINK_FAILED),
                &[MessageArg::new("sink", sink), MessageArg::new("error", reason)],
            );
            self.record(&message);
            self.emit_own(Severity::Error, &message);
            return Err(e);
        }

        self.registry.dispatch(
            &self
                .own_event(Severity::Info, &translator.translate(MSG_CONFIGURED))
                .with_field("effective_level", effective.name())
                .with_field("renderer", renderer.name())
                .with_field("sinks", self.registry.len()),
        );
        Ok(())
    }

    fn attach_file_sink(
        &self,
        settings: &LoggingSettings,
        pipeline: &Arc<Pipeline>,
        translator: &dyn Translator,
    ) -> Result<()> {
        if !settings.file_handler.enabled {
            return Ok(());
        }
        let dir = log_directory(settings, SinkKind::File, translator)?;
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::NEVER)
            .filename_prefix(settings.file_handler.file_name.as_str())
            .build(&dir)
            .map_err(|e| FatalError::log_handler(SinkKind::File, e))?;

        self.registry.attach(Sink::new(
            SinkKind::File,
            Threshold::FollowGate,
            Arc::clone(pipeline),
            Box::new(appender),
        ));
        Ok(())
    }

    fn attach_limited_sink(
        &self,
        settings: &LoggingSettings,
        pipeline: &Arc<Pipeline>,
        translator: &dyn Translator,
    ) -> Result<()> {
        let limited = &settings.limited_file_handler;
        if !limited.enabled {
            return Ok(());
        }
        let dir = log_directory(settings, SinkKind::Limited, translator)?;
        let writer = RotatingFileWriter::open(
            dir.join(&limited.file_name),
            limited.max_bytes,
            limited.backup_count,
        )
        .map_err(|e| FatalError::log_handler(SinkKind::Limited, e))?;

        self.registry.attach(Sink::new(
            SinkKind::Limited,
            Threshold::Fixed(Severity::Error),
            Arc::clone(pipeline),
            Box::new(writer),
        ));
        Ok(())
    }

    /// Flush, close and detach every sink.
    pub fn shutdown(&self) {
        self.registry.clear();
    }

    /// Diagnostics from the most recent `apply_configuration`.
    pub fn instance_errors(&self) -> Vec<String> {
        lock_unpoisoned(&self.errors).clone()
    }

    pub fn get_logger(&self, name: impl Into<String>) -> Logger {
        Logger::new(name)
    }

    fn record(&self, message: &str) {
        lock_unpoisoned(&self.errors).push(message.to_string());
    }

    fn own_event(&self, severity: Severity, message: &str) -> RawEvent {
        RawEvent::new(module_path!(), severity, message).with_field("logger", APP_NAME)
    }

    /// Write straight into the registry; works before any subscriber is
    /// installed.
    fn emit_own(&self, severity: Severity, message: &str) {
        self.registry.dispatch(&self.own_event(severity, message));
    }

    fn translate(&self, message: &str) -> String {
        lock_unpoisoned(&self.translator).translate(message)
    }

    // Facade: translate, then log under the application logger.

    pub fn debug(&self, msg: &str) {
        self.logger.debug(&self.translate(msg));
    }

    pub fn info(&self, msg: &str) {
        self.logger.info(&self.translate(msg));
    }

    pub fn warning(&self, msg: &str) {
        self.logger.warning(&self.translate(msg));
    }

    pub fn error(&self, msg: &str) {
        self.logger.error(&self.translate(msg));
    }

    pub fn critical(&self, msg: &str) {
        self.logger.critical(&self.translate(msg));
    }

    /// Log at ERROR with the error and its causes attached.
    pub fn exception(&self, msg: &str, err: &(dyn Error + 'static)) {
        self.logger.exception(&self.translate(msg), err);
    }

    /// Log with structured fields merged into the record.
    pub fn log_with_data(&self, severity: Severity, msg: &str, data: Value) {
        self.logger.log_with_data(severity, &self.translate(msg), data);
    }
}

impl Default for LoggingManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LoggingManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingManager")
            .field("registry", &self.registry)
            .field("errors", &self.instance_errors())
            .finish_non_exhaustive()
    }
}

fn log_directory(
    settings: &LoggingSettings,
    kind: SinkKind,
    translator: &dyn Translator,
) -> Result<PathBuf> {
    let dir = settings
        .logger
        .log_directory
        .clone()
        .filter(|d| !d.as_os_str().is_empty())
        .ok_or_else(|| FatalError::log_handler(kind, translator.translate(MSG_NO_LOG_DIRECTORY)))?;
    std::fs::create_dir_all(&dir).map_err(|e| FatalError::log_handler(kind, e))?;
    Ok(dir)
}

/// Everything needed to build and configure a manager through a guard.
pub struct LoggingArgs {
    pub cli_level: Option<Severity>,
    pub enable_console: bool,
    pub settings: LoggingSettings,
    pub translator: Arc<dyn Translator>,
    /// Registry to use when the guard constructs the manager.
    pub registry: Option<Arc<SinkRegistry>>,
    pub console_writer: Option<ConsoleWriterFactory>,
}

impl LoggingArgs {
    pub fn new(settings: LoggingSettings, translator: Arc<dyn Translator>) -> Self {
        Self {
            cli_level: None,
            enable_console: false,
            settings,
            translator,
            registry: None,
            console_writer: None,
        }
    }

    pub fn cli_level(mut self, level: Option<Severity>) -> Self {
        self.cli_level = level;
        self
    }

    pub fn enable_console(mut self, enabled: bool) -> Self {
        self.enable_console = enabled;
        self
    }

    pub fn registry(mut self, registry: Arc<SinkRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn console_writer(mut self, factory: ConsoleWriterFactory) -> Self {
        self.console_writer = Some(factory);
        self
    }
}

impl Managed for LoggingManager {
    type Args = LoggingArgs;
    const NAME: &'static str = "LoggingManager";

    fn construct(args: &Self::Args) -> Result<Self> {
        let manager = match &args.registry {
            Some(registry) => Self::with_registry(Arc::clone(registry)),
            None => Self::new(),
        };
        Ok(match &args.console_writer {
            Some(factory) => manager.with_console_writer(Arc::clone(factory)),
            None => manager,
        })
    }

    fn configure(&self, args: Self::Args) -> Result<()> {
        self.apply_configuration(
            args.cli_level,
            args.enable_console,
            &args.settings,
            args.translator,
        )
    }

    fn shutdown(&self) {
        LoggingManager::shutdown(self);
    }

    fn instance_errors(&self) -> Vec<String> {
        LoggingManager::instance_errors(self)
    }
}
