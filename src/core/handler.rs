//! The handler contract used by the dispatcher

use super::context_stack::ContextStack;
use super::error::{LoggerError, Result};
use super::formatter::{Formatter, StringFormatter};
use super::level::Level;
use super::record::LogRecord;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, LazyLock};

/// Veto callback: returning `false` keeps the record away from the handler
pub type FilterFn = Arc<dyn Fn(&LogRecord, &dyn Handler) -> bool + Send + Sync>;

/// Handlers bound to the application or to a thread
pub(crate) static HANDLER_STACK: LazyLock<ContextStack<dyn Handler>> =
    LazyLock::new(|| ContextStack::new("handler"));

/// Settings shared by all handlers, adjustable while the handler is bound
pub struct HandlerOptions {
    level: AtomicU8,
    bubble: AtomicBool,
    filter: RwLock<Option<FilterFn>>,
    formatter: RwLock<Arc<dyn Formatter>>,
}

impl HandlerOptions {
    pub fn new(level: Level, bubble: bool) -> Self {
        Self {
            level: AtomicU8::new(level as u8),
            bubble: AtomicBool::new(bubble),
            filter: RwLock::new(None),
            formatter: RwLock::new(Arc::new(StringFormatter::default())),
        }
    }

    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed)).unwrap_or_default()
    }

    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    pub fn bubble(&self) -> bool {
        self.bubble.load(Ordering::Relaxed)
    }

    pub fn set_bubble(&self, bubble: bool) {
        self.bubble.store(bubble, Ordering::Relaxed);
    }

    pub fn filter(&self) -> Option<FilterFn> {
        self.filter.read().clone()
    }

    pub fn set_filter(&self, filter: Option<FilterFn>) {
        *self.filter.write() = filter;
    }

    pub fn formatter(&self) -> Arc<dyn Formatter> {
        Arc::clone(&self.formatter.read())
    }

    pub fn set_formatter(&self, formatter: Arc<dyn Formatter>) {
        *self.formatter.write() = formatter;
    }
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self::new(Level::NotSet, false)
    }
}

impl std::fmt::Debug for HandlerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerOptions")
            .field("level", &self.level())
            .field("bubble", &self.bubble())
            .field("filter", &self.filter.read().is_some())
            .finish()
    }
}

/// A destination for records.
///
/// The dispatcher consults `level`, `blackhole` and the filter, then calls
/// `handle`. A `true` return means the record was handled; unless the
/// handler bubbles, dispatch stops there.
///
/// Implementations guard their own output with a lock: one handler may be
/// called from many threads at once.
pub trait Handler: Send + Sync {
    fn options(&self) -> &HandlerOptions;

    fn name(&self) -> &str;

    /// Writes the record. Errors are reported by `handle`, never returned
    /// to the logging call.
    fn emit(&self, record: &LogRecord) -> Result<()>;

    fn level(&self) -> Level {
        self.options().level()
    }

    fn bubble(&self) -> bool {
        self.options().bubble()
    }

    /// A blackhole handler stops dispatch before the record is initialized
    fn blackhole(&self) -> bool {
        false
    }

    fn should_handle(&self, record: &LogRecord) -> bool {
        record.level >= self.level()
    }

    fn format(&self, record: &LogRecord) -> Result<String> {
        self.options().formatter().format(record)
    }

    fn handle(&self, record: &LogRecord) -> bool {
        if let Err(e) = self.emit(record) {
            self.handle_error(record, &e);
        }
        true
    }

    fn handle_error(&self, record: &LogRecord, error: &LoggerError) {
        eprintln!(
            "[LOGBOOK ERROR] Handler '{}' failed to emit record from channel {:?}: {}",
            self.name(),
            record.channel.as_deref().unwrap_or("<none>"),
            error
        );
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Called after the handler was popped from a context stack
    fn on_pop(&self) -> Result<()> {
        Ok(())
    }
}

/// Runs the handler's filter, if any
pub fn passes_filter(handler: &dyn Handler, record: &LogRecord) -> bool {
    match handler.options().filter() {
        Some(filter) => filter(record, handler),
        None => true,
    }
}

/// Boxes a handler for use on the context stacks or a logger
pub fn shared<H: Handler + 'static>(handler: H) -> Arc<dyn Handler> {
    Arc::new(handler)
}

/// Every handler visible from the calling thread, most recently bound first
pub fn context_handlers() -> Arc<[Arc<dyn Handler>]> {
    HANDLER_STACK.iter_context_objects()
}

/// Fluent setters shared by all handlers
pub trait HandlerExt: Handler + Sized {
    #[must_use]
    fn with_level(self, level: Level) -> Self {
        self.options().set_level(level);
        self
    }

    #[must_use]
    fn with_bubble(self, bubble: bool) -> Self {
        self.options().set_bubble(bubble);
        self
    }

    #[must_use]
    fn with_filter<F>(self, filter: F) -> Self
    where
        F: Fn(&LogRecord, &dyn Handler) -> bool + Send + Sync + 'static,
    {
        self.options().set_filter(Some(Arc::new(filter)));
        self
    }

    #[must_use]
    fn with_formatter<F: Formatter + 'static>(self, formatter: F) -> Self {
        self.options().set_formatter(Arc::new(formatter));
        self
    }

    /// # Errors
    ///
    /// Returns `FormatSyntax` if the template does not parse.
    fn with_format_string(self, format_string: &str) -> Result<Self> {
        let formatter = StringFormatter::new(format_string)?;
        self.options().set_formatter(Arc::new(formatter));
        Ok(self)
    }

    fn into_shared(self) -> Arc<dyn Handler>
    where
        Self: 'static,
    {
        Arc::new(self)
    }
}

impl<H: Handler + Sized> HandlerExt for H {}
