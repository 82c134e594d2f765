//! Log records, the shared processor chain and the renderers.
//!
//! Every sink runs the same chain over a [`RawEvent`] to build an event
//! dictionary, then hands it to the renderer chosen by `logger.output_format`.

use super::level::Severity;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::fmt::Write as _;

/// Field carrying the logger name.
pub const LOGGER_FIELD: &str = "logger";
/// Field overriding the tracing level (used for CRITICAL).
pub const SEVERITY_FIELD: &str = "severity";
/// Field holding a JSON object to merge into the record.
pub const DATA_FIELD: &str = "data";
/// Field holding an attached error.
pub const ERROR_FIELD: &str = "error";

/// An event as captured from tracing, before any processing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    /// tracing target; used as logger name when no `logger` field is set.
    pub target: String,
    pub severity: Severity,
    pub message: String,
    /// Caller-supplied fields, excluding the message.
    pub fields: Map<String, Value>,
    /// Display chain of an attached error, one cause per line.
    pub error: Option<String>,
}

impl RawEvent {
    pub fn new(target: impl Into<String>, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            severity,
            message: message.into(),
            fields: Map::new(),
            error: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_error(mut self, chain: impl Into<String>) -> Self {
        self.error = Some(chain.into());
        self
    }

    /// Logger name: the `logger` field if present, else the target.
    pub fn logger_name(&self) -> &str {
        self.fields
            .get(LOGGER_FIELD)
            .and_then(Value::as_str)
            .unwrap_or(&self.target)
    }
}

/// The record being built.
pub type EventDict = Map<String, Value>;

/// One step of the chain.
pub type Processor = fn(&RawEvent, &mut EventDict);

pub fn add_logger_name(event: &RawEvent, dict: &mut EventDict) {
    dict.insert(LOGGER_FIELD.into(), event.logger_name().into());
}

pub fn add_log_level(event: &RawEvent, dict: &mut EventDict) {
    dict.insert("level".into(), event.severity.record_name().into());
}

/// ISO-8601 UTC with microseconds.
pub fn add_timestamp(_event: &RawEvent, dict: &mut EventDict) {
    dict.insert(
        "timestamp".into(),
        Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true).into(),
    );
}

pub fn format_exc_info(event: &RawEvent, dict: &mut EventDict) {
    if let Some(chain) = &event.error {
        dict.insert("exception".into(), chain.clone().into());
    }
}

/// Chain applied before every renderer, in order.
pub const SHARED_PROCESSORS: [Processor; 4] = [
    add_logger_name,
    add_log_level,
    add_timestamp,
    format_exc_info,
];

/// Final formatting step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Renderer {
    /// One JSON object per line.
    Json,
    /// `<timestamp> [<level>] <event> key=value ...`
    Console,
}

impl Renderer {
    /// `"json"` selects JSON; anything else selects console output.
    pub fn from_output_format(format: &str) -> Self {
        if format.trim().eq_ignore_ascii_case("json") {
            Renderer::Json
        } else {
            Renderer::Console
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Renderer::Json => "json",
            Renderer::Console => "console",
        }
    }

    /// Render one record, including the trailing newline.
    pub fn render(self, dict: &EventDict) -> String {
        match self {
            Renderer::Json => {
                let mut line = Value::Object(dict.clone()).to_string();
                line.push('\n');
                line
            }
            Renderer::Console => render_console(dict),
        }
    }
}

const CONSOLE_HEAD_KEYS: [&str; 4] = ["timestamp", "level", "event", "exception"];

fn render_console(dict: &EventDict) -> String {
    let text = |key: &str| dict.get(key).map(display_value).unwrap_or_default();

    let mut line = format!(
        "{} [{:<8}] {}",
        text("timestamp"),
        text("level"),
        text("event")
    );
    for (key, value) in dict {
        if CONSOLE_HEAD_KEYS.contains(&key.as_str()) {
            continue;
        }
        let _ = write!(line, " {}={}", key, console_value(value));
    }
    line.push('\n');

    if let Some(exception) = dict.get("exception") {
        line.push_str(&display_value(exception));
        line.push('\n');
    }
    line
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Bare strings stay bare unless they contain whitespace or quotes.
fn console_value(value: &Value) -> String {
    match value {
        Value::String(s) if !s.is_empty() && !s.contains([' ', '\t', '\n', '"', '=']) => {
            s.clone()
        }
        other => other.to_string(),
    }
}

/// Processor chain plus renderer, shared by every sink of one configuration.
#[derive(Debug, Clone)]
pub struct Pipeline {
    processors: Vec<Processor>,
    renderer: Renderer,
}

impl Pipeline {
    pub fn new(renderer: Renderer) -> Self {
        Self {
            processors: SHARED_PROCESSORS.to_vec(),
            renderer,
        }
    }

    pub fn renderer(&self) -> Renderer {
        self.renderer
    }

    /// Build the event dictionary for one event.
    pub fn process(&self, event: &RawEvent) -> EventDict {
        let mut dict = EventDict::new();
        dict.insert("event".into(), event.message.clone().into());

        for (key, value) in &event.fields {
            match key.as_str() {
                LOGGER_FIELD | SEVERITY_FIELD => {}
                DATA_FIELD => merge_data(&mut dict, value),
                _ => {
                    dict.insert(key.clone(), value.clone());
                }
            }
        }

        for processor in &self.processors {
            processor(event, &mut dict);
        }
        dict
    }

    /// Process and render one event.
    pub fn format(&self, event: &RawEvent) -> String {
        self.renderer.render(&self.process(event))
    }
}

/// Flatten a `data` field holding a JSON object (or its string encoding).
/// Anything else is kept as-is under `data`.
fn merge_data(dict: &mut EventDict, value: &Value) {
    let parsed = match value {
        Value::String(s) => serde_json::from_str::<Value>(s).ok(),
        other => Some(other.clone()),
    };
    match parsed {
        Some(Value::Object(map)) => dict.extend(map),
        _ => {
            dict.insert(DATA_FIELD.into(), value.clone());
        }
    }
}
