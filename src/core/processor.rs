//! Processors inject context information into records

use super::context_stack::ContextStack;
use super::record::LogRecord;
use std::sync::{Arc, LazyLock};

pub type ProcessorFn = Arc<dyn Fn(&mut LogRecord) + Send + Sync>;

/// Processors bound to the application or to a thread
pub(crate) static PROCESSOR_STACK: LazyLock<ContextStack<Processor>> =
    LazyLock::new(|| ContextStack::new("processor"));

/// A stackable callback that may modify records before handlers see them.
///
/// # Example
///
/// ```
/// use rust_logbook::prelude::*;
///
/// let inject_ip = Processor::new(|record: &mut LogRecord| {
///     record.extra.insert("ip", "127.0.0.1");
/// });
/// let _bound = inject_ip.threadbound();
/// ```
pub struct Processor {
    callback: Option<ProcessorFn>,
}

impl Processor {
    pub fn new<F>(callback: F) -> Arc<Self>
    where
        F: Fn(&mut LogRecord) + Send + Sync + 'static,
    {
        Arc::new(Self {
            callback: Some(Arc::new(callback)),
        })
    }

    /// A processor without callback
    pub fn noop() -> Arc<Self> {
        Arc::new(Self { callback: None })
    }

    pub fn process(&self, record: &mut LogRecord) {
        if let Some(ref callback) = self.callback {
            callback(record);
        }
    }
}

impl std::fmt::Debug for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Processor")
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// Every processor visible from the calling thread, most recently bound
/// first
pub fn context_processors() -> Arc<[Arc<Processor>]> {
    PROCESSOR_STACK.iter_context_objects()
}
