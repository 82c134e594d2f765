//! Bridge from `tracing` to a [`SinkRegistry`].

use super::level::Severity;
use super::record::{ERROR_FIELD, RawEvent, SEVERITY_FIELD};
use super::sink::SinkRegistry;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{self, Write as _};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::subscriber::Interest;
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// A `tracing_subscriber` layer that feeds every event into one registry.
#[derive(Debug, Clone)]
pub struct PipelineLayer {
    registry: Arc<SinkRegistry>,
}

impl PipelineLayer {
    pub fn new(registry: Arc<SinkRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<SinkRegistry> {
        &self.registry
    }
}

impl<S: Subscriber> Layer<S> for PipelineLayer {
    // The gate and the attached sinks change at runtime; never let tracing
    // cache a verdict per callsite.
    fn register_callsite(&self, _metadata: &'static Metadata<'static>) -> Interest {
        Interest::sometimes()
    }

    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        // ERROR events may carry severity=CRITICAL; the precise check happens
        // per sink in dispatch.
        let severity = match Severity::from_tracing(*metadata.level()) {
            Severity::Error => Severity::Critical,
            other => other,
        };
        self.registry.admits(severity)
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let severity = visitor
            .severity
            .unwrap_or_else(|| Severity::from_tracing(*metadata.level()));
        let raw = RawEvent {
            target: metadata.target().to_string(),
            severity,
            message: visitor.message,
            fields: visitor.fields,
            error: visitor.error,
        };
        self.registry.dispatch(&raw);
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    severity: Option<Severity>,
    fields: Map<String, Value>,
    error: Option<String>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            SEVERITY_FIELD => self.severity = value.parse().ok(),
            _ => self.insert(field, Value::from(value)),
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        if field.name() == ERROR_FIELD {
            self.error = Some(error_chain(value));
        } else {
            self.insert(field, Value::from(value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let text = format!("{:?}", value);
        match field.name() {
            "message" => self.message = text,
            SEVERITY_FIELD => self.severity = text.trim_matches('"').parse().ok(),
            _ => self.insert(field, Value::from(text)),
        }
    }
}

/// Display an error and its sources, one per line.
fn error_chain(err: &(dyn Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let _ = write!(out, "\ncaused by: {}", cause);
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::record::{Pipeline, Renderer};
    use crate::logging::sink::{Sink, SinkKind, Threshold};
    use std::io::{self, Write};
    use std::sync::Mutex;
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Buffer {
        fn records(&self) -> Vec<Value> {
            String::from_utf8(self.0.lock().unwrap().clone())
                .unwrap()
                .lines()
                .map(|l| serde_json::from_str(l).unwrap())
                .collect()
        }
    }

    fn registry_with(level: Severity, buf: &Buffer) -> Arc<SinkRegistry> {
        let registry = Arc::new(SinkRegistry::new(level));
        registry.attach(Sink::new(
            SinkKind::Console,
            Threshold::FollowGate,
            Arc::new(Pipeline::new(Renderer::Json)),
            Box::new(buf.clone()),
        ));
        registry
    }

    #[test]
    fn events_reach_registry() {
        let buf = Buffer::default();
        let registry = registry_with(Severity::Info, &buf);
        let subscriber = tracing_subscriber::registry().with(PipelineLayer::new(registry));

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("filtered out");
            tracing::info!(logger = "checkconnect", attempts = 3u64, "Checking {}", "ntp");
            tracing::error!(severity = "CRITICAL", "out of options");
        });

        let records = buf.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["event"], "Checking ntp");
        assert_eq!(records[0]["logger"], "checkconnect");
        assert_eq!(records[0]["attempts"], 3);
        assert_eq!(records[1]["level"], "critical");
        assert!(records[1].get("severity").is_none());
    }

    #[test]
    fn gate_change_applies_without_reinstall() {
        let buf = Buffer::default();
        let registry = registry_with(Severity::Warning, &buf);
        let subscriber =
            tracing_subscriber::registry().with(PipelineLayer::new(Arc::clone(&registry)));

        tracing::subscriber::with_default(subscriber, || {
            for _ in 0..2 {
                tracing::info!("tick");
                registry.set_level(Severity::Debug);
            }
        });

        assert_eq!(buf.records().len(), 1);
    }

    #[test]
    fn error_chain_is_recorded() {
        #[derive(Debug)]
        struct Outer(io::Error);
        impl fmt::Display for Outer {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "save failed")
            }
        }
        impl Error for Outer {
            fn source(&self) -> Option<&(dyn Error + 'static)> {
                Some(&self.0)
            }
        }

        let buf = Buffer::default();
        let registry = registry_with(Severity::Debug, &buf);
        let subscriber = tracing_subscriber::registry().with(PipelineLayer::new(registry));
        let err = Outer(io::Error::other("disk full"));

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(error = &err as &(dyn Error + 'static), "could not save");
        });

        let records = buf.records();
        assert_eq!(records[0]["exception"], "save failed\ncaused by: disk full");
    }
}
