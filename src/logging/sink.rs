//! Log sinks and the registry they are attached to.
//!
//! A [`SinkRegistry`] is what a process-wide logging surface would be: the
//! set of attached sinks plus the minimum-severity gate. It is an ordinary
//! object, so tests can create as many as they like.

use super::level::{LevelGate, Severity};
use super::record::{Pipeline, RawEvent};
use crate::lock_unpoisoned;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Which of the configurable sinks this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SinkKind {
    Console,
    /// Primary log file
    File,
    /// Size-bounded rotating error trail
    Limited,
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkKind::Console => write!(f, "console"),
            SinkKind::File => write!(f, "file"),
            SinkKind::Limited => write!(f, "limited file"),
        }
    }
}

/// Minimum severity a sink accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Threshold {
    /// Whatever the registry gate currently says.
    FollowGate,
    /// A fixed level, independent of the gate.
    Fixed(Severity),
}

impl Threshold {
    pub fn resolve(self, gate: &LevelGate) -> Severity {
        match self {
            Threshold::FollowGate => gate.get(),
            Threshold::Fixed(level) => level,
        }
    }
}

/// Writer type every sink wraps.
pub type BoxedWriter = Box<dyn Write + Send>;

pub struct Sink {
    kind: SinkKind,
    threshold: Threshold,
    pipeline: Arc<Pipeline>,
    writer: Mutex<BoxedWriter>,
}

impl Sink {
    pub fn new(
        kind: SinkKind,
        threshold: Threshold,
        pipeline: Arc<Pipeline>,
        writer: BoxedWriter,
    ) -> Self {
        Self {
            kind,
            threshold,
            pipeline,
            writer: Mutex::new(writer),
        }
    }

    /// Which configured handler this sink serves.
    pub fn kind(&self) -> SinkKind {
        self.kind
    }

    /// Minimum severity the sink accepts.
    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    fn accepts(&self, severity: Severity, gate: &LevelGate) -> bool {
        severity >= self.threshold.resolve(gate)
    }

    fn emit(&self, event: &RawEvent) -> io::Result<()> {
        let line = self.pipeline.format(event);
        let mut writer = lock_unpoisoned(&self.writer);
        writer.write_all(line.as_bytes())?;
        writer.flush()
    }

    fn flush(&self) -> io::Result<()> {
        lock_unpoisoned(&self.writer).flush()
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("kind", &self.kind)
            .field("threshold", &self.threshold)
            .field("renderer", &self.pipeline.renderer())
            .finish_non_exhaustive()
    }
}

/// Summary of an attached sink, for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkDescriptor {
    pub kind: SinkKind,
    pub threshold: Threshold,
}

#[derive(Debug)]
pub struct SinkRegistry {
    gate: LevelGate,
    sinks: Mutex<Vec<Sink>>,
}

impl SinkRegistry {
    pub fn new(level: Severity) -> Self {
        Self {
            gate: LevelGate::new(level),
            sinks: Mutex::new(Vec::new()),
        }
    }

    pub fn level(&self) -> Severity {
        self.gate.get()
    }

    pub fn set_level(&self, level: Severity) {
        self.gate.set(level);
    }

    /// Start routing events to `sink`.
    pub fn attach(&self, sink: Sink) {
        lock_unpoisoned(&self.sinks).push(sink);
    }

    /// Flush and detach every sink. Files are closed when their writers drop.
    pub fn clear(&self) {
        let detached: Vec<Sink> = std::mem::take(&mut *lock_unpoisoned(&self.sinks));
        for sink in &detached {
            let _ = sink.flush();
        }
    }

    /// Number of attached sinks.
    pub fn len(&self) -> usize {
        lock_unpoisoned(&self.sinks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn descriptors(&self) -> Vec<SinkDescriptor> {
        lock_unpoisoned(&self.sinks)
            .iter()
            .map(|s| SinkDescriptor {
                kind: s.kind,
                threshold: s.threshold,
            })
            .collect()
    }

    /// Whether at least one attached sink would accept this severity.
    pub fn admits(&self, severity: Severity) -> bool {
        lock_unpoisoned(&self.sinks)
            .iter()
            .any(|s| s.accepts(severity, &self.gate))
    }

    /// Deliver an event to every sink that accepts it.
    ///
    /// Write failures are dropped; there is nowhere left to report them.
    pub fn dispatch(&self, event: &RawEvent) {
        let sinks = lock_unpoisoned(&self.sinks);
        for sink in sinks.iter().filter(|s| s.accepts(event.severity, &self.gate)) {
            let _ = sink.emit(event);
        }
    }
}

impl Default for SinkRegistry {
    fn default() -> Self {
        Self::new(Severity::Info)
    }
}
