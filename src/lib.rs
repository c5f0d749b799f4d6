//! # Rust Logbook
//!
//! A logging library built around context stacks: handlers and
//! processors are bound to the current thread or to the whole application
//! instead of being configured globally, and records travel from the most
//! recently bound handler outwards until one handles them.
//!
//! ## Features
//!
//! - **Context stacks**: bind handlers and processors per thread or per
//!   application with RAII guards
//! - **Lazy records**: time and process data are only collected when some
//!   handler will actually see the record
//! - **Bubbling**: a handler that handled a record stops dispatch unless it
//!   bubbles
//! - **Handlers**: stream, file, rotating file, fingers-crossed, threaded
//!   and group handlers, plus a test handler
//!
//! ## Example
//!
//! ```
//! use rust_logbook::prelude::*;
//!
//! let handler = TestHandler::new();
//! let bound = handler.clone().into_shared();
//! let _guard = bound.threadbound();
//!
//! let logger = Logger::new("app");
//! logger.warn(LogArgs::new("disk {} is {}% full").arg("/var").arg(93));
//! assert!(handler.has_warning("disk /var is 93% full"));
//! ```

pub mod core;
pub mod handlers;
pub mod macros;

pub mod prelude {
    #[cfg(feature = "console")]
    pub use crate::handlers::ColorizedStderrHandler;
    #[cfg(feature = "file")]
    pub use crate::handlers::{FileHandler, RotatingFileHandler, TimedRotatingFileHandler};
    pub use crate::handlers::{
        FingersCrossedHandler, GroupHandler, NullHandler, StderrHandler, StreamHandler,
        TestHandler, ThreadedWrapperHandler,
    };
    pub use crate::core::{
        dispatch_record, ExceptionInfo, ExtraMap, FieldValue, Formatter, Handler, HandlerExt,
        JsonFormatter, Level, LogArgs, LogRecord, Logger, LoggerBuilder, LoggerError,
        LoggerGroup, NestedSetup, Processor, Result, StackedObject, StringFormatter,
        TimestampFormat,
    };
}

pub use core::{
    dispatch_record, ExceptionInfo, FieldValue, Handler, HandlerExt, Level, LogArgs, LogRecord,
    Logger, LoggerBuilder, LoggerError, LoggerGroup, NestedSetup, Processor, Result,
    StackedObject,
};
