//! Structured logging pipeline.
//!
//! Events flow `tracing` -> [`PipelineLayer`] -> [`SinkRegistry`] -> sinks.
//! Each sink runs the shared processor chain and the configured renderer:
//! - **Console** - stderr (or an injected writer), follows the level gate
//! - **File** - `<log_directory>/<file_name>`, follows the level gate
//! - **Limited** - size-rotated `<log_directory>/<file_name>`, ERROR and above only

mod layer;
mod level;
mod manager;
mod record;
mod rotating;
mod sink;

pub use layer::PipelineLayer;
pub use level::{LevelGate, Severity};
pub use manager::{ConsoleWriterFactory, LoggingArgs, LoggingManager, stderr_writer, subscriber_for};
pub use record::{
    EventDict, Pipeline, Processor, RawEvent, Renderer, SHARED_PROCESSORS, add_log_level,
    add_logger_name, add_timestamp, format_exc_info,
};
pub use rotating::RotatingFileWriter;
pub use sink::{BoxedWriter, Sink, SinkDescriptor, SinkKind, SinkRegistry, Threshold};
