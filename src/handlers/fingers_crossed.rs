//! Buffer records until something goes wrong

use crate::core::{passes_filter, Handler, HandlerOptions, Level, LogRecord, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

struct Buffer {
    records: VecDeque<LogRecord>,
    triggered: bool,
}

/// Holds back records until one at or above `action_level` arrives, then
/// passes the buffered records and every later one to the wrapped handler.
///
/// Quiet runs produce no output at all; a failing run gets the full
/// context that led up to the failure.
///
/// # Example
///
/// ```
/// use rust_logbook::handlers::{FingersCrossedHandler, TestHandler};
/// use rust_logbook::prelude::*;
///
/// let sink = TestHandler::new();
/// let handler = FingersCrossedHandler::new(sink.clone().into_shared())
///     .with_action_level(Level::Error)
///     .into_shared();
/// let _bound = handler.threadbound();
///
/// let logger = Logger::new("job");
/// logger.info("step 1");
/// assert!(sink.is_empty());
///
/// logger.error("step 2 failed");
/// assert!(sink.has_info("step 1"));
/// assert!(sink.has_error("step 2 failed"));
/// ```
pub struct FingersCrossedHandler {
    options: HandlerOptions,
    handler: Arc<dyn Handler>,
    action_level: Level,
    buffer_size: usize,
    reset: bool,
    buffer: Mutex<Buffer>,
    forwarding: Mutex<()>,
}

impl FingersCrossedHandler {
    /// Wraps `handler` with action level `Error`, an unbounded buffer and
    /// no reset
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self {
            options: HandlerOptions::new(Level::NotSet, false),
            handler,
            action_level: Level::Error,
            buffer_size: 0,
            reset: false,
            buffer: Mutex::new(Buffer {
                records: VecDeque::new(),
                triggered: false,
            }),
            forwarding: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_action_level(mut self, level: Level) -> Self {
        self.action_level = level;
        self
    }

    /// Keep at most `size` records, dropping the oldest. 0 means unbounded.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Re-arm after each trigger instead of passing everything through
    #[must_use]
    pub fn with_reset(mut self, reset: bool) -> Self {
        self.reset = reset;
        self
    }

    pub fn action_level(&self) -> Level {
        self.action_level
    }

    /// Whether the handler currently passes records straight through
    pub fn triggered(&self) -> bool {
        self.buffer.lock().triggered
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.lock().records.len()
    }

    fn forward(&self, record: &LogRecord) {
        if self.handler.should_handle(record) && passes_filter(self.handler.as_ref(), record) {
            self.handler.handle(record);
        }
    }
}

impl Handler for FingersCrossedHandler {
    fn options(&self) -> &HandlerOptions {
        &self.options
    }

    fn name(&self) -> &str {
        "fingers_crossed"
    }

    fn emit(&self, record: &LogRecord) -> Result<()> {
        let mut buffer = self.buffer.lock();
        if !buffer.triggered && record.level < self.action_level {
            let mut stored = record.clone();
            stored.pull_information();
            buffer.records.push_back(stored);
            if self.buffer_size > 0 && buffer.records.len() > self.buffer_size {
                buffer.records.pop_front();
            }
            return Ok(());
        }

        let replay = if buffer.triggered {
            VecDeque::new()
        } else {
            buffer.triggered = !self.reset;
            std::mem::take(&mut buffer.records)
        };
        // Taken before the buffer is released: later records wait until
        // the replay is done
        let _forwarding = self.forwarding.lock();
        drop(buffer);

        for buffered in &replay {
            self.forward(buffered);
        }
        self.forward(record);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.handler.flush()
    }

    fn close(&self) -> Result<()> {
        self.buffer.lock().records.clear();
        self.handler.close()
    }
}
