//! In-memory handler for tests

use crate::core::{
    Handler, HandlerOptions, Level, LogRecord, Result, StringFormatter,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Template used by [`TestHandler`] for `formatted_records`
pub const TEST_FORMAT_STRING: &str = "[{record.level_name}] {record.channel}: {record.message}";

struct TestState {
    options: HandlerOptions,
    records: Mutex<Vec<LogRecord>>,
    formatted: Mutex<Vec<String>>,
}

/// Stores every record it handles so tests can assert on them.
///
/// Clones share the same storage, so one clone can be bound while the
/// other is queried.
///
/// # Example
///
/// ```
/// use rust_logbook::prelude::*;
///
/// let handler = TestHandler::new();
/// let bound = handler.clone().into_shared();
/// {
///     let _guard = bound.threadbound();
///     Logger::new("db").warn(LogArgs::new("slow query: {}ms").arg(1200));
/// }
/// assert!(handler.has_warning("slow query: 1200ms"));
/// assert_eq!(handler.formatted_records(), vec!["[WARNING] db: slow query: 1200ms"]);
/// ```
#[derive(Clone)]
pub struct TestHandler {
    state: Arc<TestState>,
}

impl TestHandler {
    pub fn new() -> Self {
        Self::with_options(HandlerOptions::new(Level::NotSet, false))
    }

    fn with_options(options: HandlerOptions) -> Self {
        if let Ok(formatter) = StringFormatter::new(TEST_FORMAT_STRING) {
            options.set_formatter(Arc::new(formatter));
        }
        Self {
            state: Arc::new(TestState {
                options,
                records: Mutex::new(Vec::new()),
                formatted: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Pulled copies of every handled record, oldest first
    pub fn records(&self) -> Vec<LogRecord> {
        self.state.records.lock().clone()
    }

    /// Formatted lines, one per handled record
    pub fn formatted_records(&self) -> Vec<String> {
        self.state.formatted.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.state.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.records.lock().is_empty()
    }

    pub fn clear(&self) {
        self.state.records.lock().clear();
        self.state.formatted.lock().clear();
    }

    /// Whether a record with this level and formatted message was handled,
    /// optionally restricted to one channel
    pub fn has_record(&self, level: Level, message: &str, channel: Option<&str>) -> bool {
        self.state.records.lock().iter().any(|record| {
            record.level == level
                && record.message().is_ok_and(|m| m == message)
                && channel.map_or(true, |c| record.channel.as_deref() == Some(c))
        })
    }

    fn has_level(&self, level: Level) -> bool {
        self.state.records.lock().iter().any(|r| r.level == level)
    }

    pub fn has_debug(&self, message: &str) -> bool {
        self.has_record(Level::Debug, message, None)
    }

    pub fn has_info(&self, message: &str) -> bool {
        self.has_record(Level::Info, message, None)
    }

    pub fn has_notice(&self, message: &str) -> bool {
        self.has_record(Level::Notice, message, None)
    }

    pub fn has_warning(&self, message: &str) -> bool {
        self.has_record(Level::Warning, message, None)
    }

    pub fn has_error(&self, message: &str) -> bool {
        self.has_record(Level::Error, message, None)
    }

    pub fn has_critical(&self, message: &str) -> bool {
        self.has_record(Level::Critical, message, None)
    }

    pub fn has_debugs(&self) -> bool {
        self.has_level(Level::Debug)
    }

    pub fn has_infos(&self) -> bool {
        self.has_level(Level::Info)
    }

    pub fn has_notices(&self) -> bool {
        self.has_level(Level::Notice)
    }

    pub fn has_warnings(&self) -> bool {
        self.has_level(Level::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.has_level(Level::Error)
    }

    pub fn has_criticals(&self) -> bool {
        self.has_level(Level::Critical)
    }
}

impl Default for TestHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for TestHandler {
    fn options(&self) -> &HandlerOptions {
        &self.state.options
    }

    fn name(&self) -> &str {
        "test"
    }

    fn emit(&self, record: &LogRecord) -> Result<()> {
        let line = self.format(record)?;
        let mut stored = record.clone();
        stored.pull_information();

        self.state.records.lock().push(stored);
        self.state.formatted.lock().push(line);
        Ok(())
    }
}

impl std::fmt::Debug for TestHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestHandler")
            .field("options", &self.state.options)
            .field("records", &self.len())
            .finish()
    }
}
