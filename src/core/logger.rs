//! Loggers: record creation and dispatch to handlers
//!
//! A [`Logger`] is a named channel. It creates records, checks its level
//! (possibly inherited from a [`LoggerGroup`]) and hands records to its own
//! handlers and then to the handlers bound on the context stacks.

use super::{
    error::Result,
    fields::{ExtraMap, FieldValue},
    group::LoggerGroup,
    handler::{passes_filter, Handler, HANDLER_STACK},
    level::Level,
    processor::PROCESSOR_STACK,
    record::{ExceptionInfo, LogRecord},
};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::panic::{catch_unwind, AssertUnwindSafe, Location};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, LazyLock};

/// Message used by [`Logger::catch_exceptions`]
pub const UNCAUGHT_EXCEPTION_MESSAGE: &str = "Uncaught exception occurred";

/// Nameless dispatcher used by [`dispatch_record`]
static DEFAULT_DISPATCHER: LazyLock<Logger> = LazyLock::new(|| Logger::builder().build());

/// Everything a log call can pass besides the level
///
/// # Example
///
/// ```
/// use rust_logbook::prelude::*;
///
/// let logger = Logger::new("app");
/// logger.warn(
///     LogArgs::new("{user} failed to log in {} times")
///         .arg(3)
///         .kwarg("user", "alice")
///         .extra("ip", "10.1.2.3"),
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogArgs {
    msg: String,
    args: Vec<FieldValue>,
    kwargs: BTreeMap<String, FieldValue>,
    extra: ExtraMap,
    exc_info: Option<ExceptionInfo>,
    location: Option<(&'static str, u32, &'static str)>,
    func_name: Option<String>,
}

impl LogArgs {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            ..Self::default()
        }
    }

    /// Append a positional format argument
    #[must_use]
    pub fn arg(mut self, value: impl Into<FieldValue>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Set a keyword format argument
    #[must_use]
    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    /// Attach extra data to the record
    #[must_use]
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.extra.insert(key, value);
        self
    }

    #[must_use]
    pub fn exc_info(mut self, exc_info: ExceptionInfo) -> Self {
        self.exc_info = Some(exc_info);
        self
    }

    /// Attach an error as exception information
    #[must_use]
    pub fn error<E>(self, error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.exc_info(ExceptionInfo::new(error))
    }

    /// Record the call site (used by the logging macros)
    #[must_use]
    pub fn location(mut self, file: &'static str, line: u32, module: &'static str) -> Self {
        self.location = Some((file, line, module));
        self
    }

    #[must_use]
    pub fn func_name(mut self, name: impl Into<String>) -> Self {
        self.func_name = Some(name.into());
        self
    }

    fn has_exc_info(&self) -> bool {
        self.exc_info.is_some()
    }
}

impl From<&str> for LogArgs {
    fn from(msg: &str) -> Self {
        LogArgs::new(msg)
    }
}

impl From<String> for LogArgs {
    fn from(msg: String) -> Self {
        LogArgs::new(msg)
    }
}

impl From<&String> for LogArgs {
    fn from(msg: &String) -> Self {
        LogArgs::new(msg.clone())
    }
}

pub(crate) struct LoggerInner {
    name: Option<String>,
    handlers: RwLock<Vec<Arc<dyn Handler>>>,
    group: RwLock<Option<LoggerGroup>>,
    level: AtomicU8,
    /// `None` means "inherit from the group"
    disabled: RwLock<Option<bool>>,
    suppress_dispatcher: AtomicBool,
}

/// A logging channel.
///
/// Cloning is cheap and yields a handle to the same logger.
///
/// # Example
///
/// ```
/// use rust_logbook::prelude::*;
///
/// let logger = Logger::new("app");
/// let handler = TestHandler::new();
/// let bound = handler.clone().into_shared();
/// let _guard = bound.threadbound();
///
/// logger.info("service started");
/// assert!(handler.has_info("service started"));
/// ```
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

impl Logger {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::builder().name(name).build()
    }

    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    pub(crate) fn from_inner(inner: Arc<LoggerInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &Arc<LoggerInner> {
        &self.inner
    }

    pub(crate) fn downgrade(&self) -> std::sync::Weak<LoggerInner> {
        Arc::downgrade(&self.inner)
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Whether two handles point to the same logger
    pub fn same_logger(&self, other: &Logger) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Effective level: own level unless `NotSet`, else the group's level
    pub fn level(&self) -> Level {
        let own = Level::from_u8(self.inner.level.load(Ordering::Relaxed)).unwrap_or_default();
        if own != Level::NotSet {
            return own;
        }
        self.group().map_or(Level::NotSet, |g| g.level())
    }

    pub fn set_level(&self, level: Level) {
        self.inner.level.store(level as u8, Ordering::Relaxed);
    }

    /// Effective disabled flag: own flag if set, else the group's flag
    pub fn disabled(&self) -> bool {
        if let Some(disabled) = *self.inner.disabled.read() {
            return disabled;
        }
        self.group().is_some_and(|g| g.disabled())
    }

    pub fn set_disabled(&self, disabled: bool) {
        *self.inner.disabled.write() = Some(disabled);
    }

    /// Forget the own disabled flag and inherit from the group again
    pub fn reset_disabled(&self) {
        *self.inner.disabled.write() = None;
    }

    pub fn disable(&self) {
        self.set_disabled(true);
    }

    pub fn enable(&self) {
        self.set_disabled(false);
    }

    pub fn suppress_dispatcher(&self) -> bool {
        self.inner.suppress_dispatcher.load(Ordering::Relaxed)
    }

    pub fn set_suppress_dispatcher(&self, suppress: bool) {
        self.inner.suppress_dispatcher.store(suppress, Ordering::Relaxed);
    }

    pub fn group(&self) -> Option<LoggerGroup> {
        self.inner.group.read().clone()
    }

    pub(crate) fn set_group(&self, group: Option<LoggerGroup>) {
        *self.inner.group.write() = group;
    }

    /// Sets the group unless one is set already; check and set happen
    /// under one lock
    pub(crate) fn join_group(&self, group: &LoggerGroup) -> bool {
        let mut slot = self.inner.group.write();
        if slot.is_some() {
            return false;
        }
        *slot = Some(group.clone());
        true
    }

    /// Attach a handler to this logger only. Logger handlers run before the
    /// context handlers.
    pub fn add_handler(&self, handler: Arc<dyn Handler>) {
        self.inner.handlers.write().push(handler);
    }

    pub fn handlers(&self) -> Vec<Arc<dyn Handler>> {
        self.inner.handlers.read().clone()
    }

    pub fn clear_handlers(&self) {
        self.inner.handlers.write().clear();
    }

    #[track_caller]
    pub fn debug(&self, args: impl Into<LogArgs>) {
        self.log_at(Level::Debug, args.into());
    }

    #[track_caller]
    pub fn info(&self, args: impl Into<LogArgs>) {
        self.log_at(Level::Info, args.into());
    }

    #[track_caller]
    pub fn notice(&self, args: impl Into<LogArgs>) {
        self.log_at(Level::Notice, args.into());
    }

    #[track_caller]
    pub fn warn(&self, args: impl Into<LogArgs>) {
        self.log_at(Level::Warning, args.into());
    }

    /// Alias for [`warn`](Logger::warn)
    #[track_caller]
    pub fn warning(&self, args: impl Into<LogArgs>) {
        self.log_at(Level::Warning, args.into());
    }

    #[track_caller]
    pub fn error(&self, args: impl Into<LogArgs>) {
        self.log_at(Level::Error, args.into());
    }

    #[track_caller]
    pub fn critical(&self, args: impl Into<LogArgs>) {
        self.log_at(Level::Critical, args.into());
    }

    /// Log at a level chosen at runtime
    #[track_caller]
    pub fn log(&self, level: Level, args: impl Into<LogArgs>) {
        self.log_at(level, args.into());
    }

    /// Log an error at `Error` level with the error attached as exception
    /// information
    #[track_caller]
    pub fn exception<E>(&self, error: E, args: impl Into<LogArgs>)
    where
        E: StdError + Send + Sync + 'static,
    {
        let args = args.into();
        let args = if args.has_exc_info() {
            args
        } else {
            args.error(error)
        };
        self.log_at(Level::Error, args);
    }

    /// Runs `f`; an `Err` is logged through [`exception`](Logger::exception)
    /// with a default message and swallowed.
    #[track_caller]
    pub fn catch_exceptions<T, E, F>(&self, f: F) -> Option<T>
    where
        F: FnOnce() -> std::result::Result<T, E>,
        E: StdError + Send + Sync + 'static,
    {
        self.catch_exceptions_with(UNCAUGHT_EXCEPTION_MESSAGE, f)
    }

    /// Like [`catch_exceptions`](Logger::catch_exceptions) with a custom
    /// message
    #[track_caller]
    pub fn catch_exceptions_with<T, E, F>(&self, args: impl Into<LogArgs>, f: F) -> Option<T>
    where
        F: FnOnce() -> std::result::Result<T, E>,
        E: StdError + Send + Sync + 'static,
    {
        match f() {
            Ok(value) => Some(value),
            Err(error) => {
                self.exception(error, args);
                None
            }
        }
    }

    #[track_caller]
    fn log_at(&self, level: Level, args: LogArgs) {
        if level < self.level() {
            return;
        }
        let args = if args.location.is_none() {
            let caller = Location::caller();
            LogArgs {
                location: Some((caller.file(), caller.line(), "")),
                ..args
            }
        } else {
            args
        };
        self.make_record_and_handle(level, args);
    }

    /// Creates a record and hands it to the handling system. The record is
    /// closed afterwards unless a handler asked to keep it open.
    pub fn make_record_and_handle(&self, level: Level, args: LogArgs) {
        let mut record = LogRecord::new(self.inner.name.clone(), level, args.msg)
            .with_args(args.args)
            .with_kwargs(args.kwargs)
            .with_extra(args.extra);
        record.exc_info = args.exc_info;
        record.func_name = args.func_name;
        if let Some((file, line, module)) = args.location {
            record.file = Some(file.to_string());
            record.line = Some(line);
            if !module.is_empty() {
                record.module = Some(module.to_string());
            }
        }
        if !self.suppress_dispatcher() {
            record.set_dispatcher(&self.inner);
        }

        let mut guard = CloseOnExit(&mut record);
        self.handle(&mut *guard.0);
    }

    /// Calls the handlers if the logger is enabled and the record is at or
    /// above the logger's level
    pub fn handle(&self, record: &mut LogRecord) {
        if !self.disabled() && record.level >= self.level() {
            self.call_handlers(record);
        }
    }

    /// Passes a record to the logger's own handlers, then to the context
    /// handlers (most recently bound first).
    ///
    /// The record is heavy-initialized and processed only once a handler
    /// is actually about to see it. A blackhole handler ends dispatch
    /// before that; a handler that handles the record without bubbling
    /// ends it after.
    pub fn call_handlers(&self, record: &mut LogRecord) {
        let own = self.inner.handlers.read().clone();
        let context = HANDLER_STACK.iter_context_objects();
        let mut record_initialized = false;

        for handler in own.iter().chain(context.iter()) {
            if !handler.should_handle(record) {
                continue;
            }

            if handler.blackhole() {
                break;
            }

            if !record_initialized {
                if let Err(e) = record.heavy_init() {
                    eprintln!("[LOGBOOK ERROR] Cannot dispatch record: {}", e);
                    return;
                }
                self.process_record(record);
                record_initialized = true;
            }

            if !passes_filter(handler.as_ref(), record) {
                continue;
            }

            let handled = catch_unwind(AssertUnwindSafe(|| handler.handle(record)));
            match handled {
                Ok(true) if !handler.bubble() => break,
                Ok(_) => {}
                Err(panic_info) => {
                    let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                        s.to_string()
                    } else if let Some(s) = panic_info.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "Unknown panic".to_string()
                    };
                    eprintln!(
                        "[LOGBOOK CRITICAL] Handler '{}' panicked: {}. \
                         Other handlers continue to function.",
                        handler.name(),
                        panic_msg
                    );
                }
            }
        }
    }

    /// Runs the group processor, then the context processors
    pub fn process_record(&self, record: &mut LogRecord) {
        if let Some(group) = self.group() {
            group.process_record(record);
        }
        for processor in PROCESSOR_STACK.iter_context_objects().iter() {
            processor.process(record);
        }
    }

    /// Flush this logger's own handlers
    pub fn flush(&self) -> Result<()> {
        for handler in self.inner.handlers.read().iter() {
            handler.flush()?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.inner.name)
            .field("level", &self.level())
            .field("disabled", &self.disabled())
            .field("handlers", &self.inner.handlers.read().len())
            .finish()
    }
}

/// Marks a record late when dispatch ends, on unwind too, and closes it
/// unless a handler asked to keep it open
struct CloseOnExit<'a>(&'a mut LogRecord);

impl Drop for CloseOnExit<'_> {
    fn drop(&mut self) {
        self.0.mark_late();
        if !self.0.keep_open {
            self.0.close();
        }
    }
}

/// Passes a record to the context handlers without any logger.
///
/// Useful for records created programmatically, for example records
/// restored with [`LogRecord::from_dict`].
pub fn dispatch_record(record: &mut LogRecord) {
    DEFAULT_DISPATCHER.call_handlers(record);
}

/// Builder for constructing a Logger with a fluent API
///
/// # Example
/// ```
/// use rust_logbook::prelude::*;
///
/// let group = LoggerGroup::new();
/// let logger = Logger::builder()
///     .name("worker")
///     .level(Level::Notice)
///     .handler(StderrHandler::new().into_shared())
///     .group(&group)
///     .build();
/// assert_eq!(logger.level(), Level::Notice);
/// ```
pub struct LoggerBuilder {
    name: Option<String>,
    level: Level,
    handlers: Vec<Arc<dyn Handler>>,
    group: Option<LoggerGroup>,
    disabled: Option<bool>,
    suppress_dispatcher: bool,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            name: None,
            level: Level::NotSet,
            handlers: Vec::new(),
            group: None,
            disabled: None,
            suppress_dispatcher: false,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn group(mut self, group: &LoggerGroup) -> Self {
        self.group = Some(group.clone());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }

    /// Records from this logger carry no reference back to it
    #[must_use = "builder methods return a new value"]
    pub fn suppress_dispatcher(mut self, suppress: bool) -> Self {
        self.suppress_dispatcher = suppress;
        self
    }

    pub fn build(self) -> Logger {
        let logger = Logger {
            inner: Arc::new(LoggerInner {
                name: self.name,
                handlers: RwLock::new(self.handlers),
                group: RwLock::new(None),
                level: AtomicU8::new(self.level as u8),
                disabled: RwLock::new(self.disabled),
                suppress_dispatcher: AtomicBool::new(self.suppress_dispatcher),
            }),
        };

        if let Some(group) = self.group {
            // A fresh logger belongs to no group yet
            if let Err(e) = group.add_logger(&logger) {
                eprintln!("[LOGBOOK WARNING] Failed to add logger to group: {}", e);
            }
        }

        logger
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
