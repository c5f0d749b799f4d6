//! Core logbook types and traits

pub mod context_stack;
pub mod error;
pub mod fields;
pub mod format;
pub mod formatter;
pub mod group;
pub mod handler;
pub mod level;
pub mod logger;
pub mod metrics;
pub mod processor;
pub mod record;
pub mod setup;
pub mod timestamp;

pub use context_stack::{ContextStack, MAX_CONTEXT_OBJECT_CACHE};
pub use error::{LoggerError, Result};
pub use fields::{ExtraMap, FieldValue};
pub use format::{format_message, Template};
pub use formatter::{Formatter, JsonFormatter, StringFormatter, DEFAULT_FORMAT_STRING};
pub use group::LoggerGroup;
pub use handler::{
    context_handlers, passes_filter, shared, FilterFn, Handler, HandlerExt, HandlerOptions,
};
pub use level::{get_level_name, lookup_level, Level};
pub use logger::{dispatch_record, LogArgs, Logger, LoggerBuilder, UNCAUGHT_EXCEPTION_MESSAGE};
pub use metrics::HandlerMetrics;
pub use processor::{context_processors, Processor, ProcessorFn};
pub use record::{ExceptionInfo, LogRecord};
pub use setup::{ApplicationBound, NestedSetup, StackedObject, ThreadBound};
pub use timestamp::TimestampFormat;
