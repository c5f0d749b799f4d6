//! Handler that swallows records

use crate::core::{Handler, HandlerOptions, Level, LogRecord, Result};

/// Swallows every record at or above its level.
///
/// Bound as the innermost handler it keeps records away from outer
/// handlers. Records are not even initialized, which makes it the cheapest
/// way to silence a part of the application.
#[derive(Debug, Default)]
pub struct NullHandler {
    options: HandlerOptions,
}

impl NullHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_level(level: Level) -> Self {
        Self {
            options: HandlerOptions::new(level, false),
        }
    }
}

impl Handler for NullHandler {
    fn options(&self) -> &HandlerOptions {
        &self.options
    }

    fn name(&self) -> &str {
        "null"
    }

    fn emit(&self, _record: &LogRecord) -> Result<()> {
        Ok(())
    }

    fn blackhole(&self) -> bool {
        true
    }
}
