//! Collect records while bound and emit them together on unbind

use crate::core::{passes_filter, Handler, HandlerOptions, Level, LogRecord, Result};
use parking_lot::Mutex;
use std::sync::Arc;

/// Buffers every record while it is bound and hands them to the wrapped
/// handler in one go when it is popped from its stack.
///
/// Useful to keep the output of one unit of work together when several
/// threads log at once.
///
/// # Example
///
/// ```
/// use rust_logbook::handlers::{GroupHandler, TestHandler};
/// use rust_logbook::prelude::*;
///
/// let sink = TestHandler::new();
/// let group = GroupHandler::new(sink.clone().into_shared()).into_shared();
/// {
///     let _bound = group.threadbound();
///     Logger::new("batch").info("part 1");
///     assert!(sink.is_empty());
/// }
/// assert!(sink.has_info("part 1"));
/// ```
pub struct GroupHandler {
    options: HandlerOptions,
    handler: Arc<dyn Handler>,
    buffer: Mutex<Vec<LogRecord>>,
}

impl GroupHandler {
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self {
            options: HandlerOptions::new(Level::NotSet, false),
            handler,
            buffer: Mutex::new(Vec::new()),
        }
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.lock().len()
    }

    /// Passes the buffered records to the wrapped handler and clears the
    /// buffer
    pub fn rollover(&self) -> Result<()> {
        let records = std::mem::take(&mut *self.buffer.lock());
        for record in &records {
            if self.handler.should_handle(record) && passes_filter(self.handler.as_ref(), record) {
                self.handler.handle(record);
            }
        }
        self.handler.flush()
    }
}

impl Handler for GroupHandler {
    fn options(&self) -> &HandlerOptions {
        &self.options
    }

    fn name(&self) -> &str {
        "group"
    }

    fn emit(&self, record: &LogRecord) -> Result<()> {
        let mut stored = record.clone();
        stored.pull_information();
        self.buffer.lock().push(stored);
        Ok(())
    }

    fn on_pop(&self) -> Result<()> {
        self.rollover()
    }

    fn close(&self) -> Result<()> {
        self.rollover()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Logger, StackedObject};
    use crate::handlers::TestHandler;
    use crate::HandlerExt;

    #[test]
    fn test_rollover_respects_wrapped_level() {
        let sink = TestHandler::new().with_level(Level::Warning);
        let group = GroupHandler::new(sink.clone().into_shared());

        group.emit(&LogRecord::new(None, Level::Info, "chatter")).unwrap();
        group.emit(&LogRecord::new(None, Level::Error, "failure")).unwrap();
        assert_eq!(group.buffered_len(), 2);

        group.rollover().unwrap();
        assert_eq!(group.buffered_len(), 0);
        assert!(!sink.has_info("chatter"));
        assert!(sink.has_error("failure"));
    }

    #[test]
    fn test_records_keep_order_across_unbind() {
        let sink = TestHandler::new();
        let group = GroupHandler::new(sink.clone().into_shared()).into_shared();
        {
            let _bound = group.threadbound();
            let logger = Logger::new("batch");
            logger.info("first");
            logger.warn("second");
        }
        let messages: Vec<String> = sink.records().iter().map(|r| r.message().unwrap()).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }
}
