//! Handler that hands records to a background thread
//!
//! The logging thread only pulls the record's context information and
//! queues it; a worker thread does the actual I/O through the wrapped
//! handler. When the queue is full, records are dropped and counted.

use crate::core::{
    passes_filter, Handler, HandlerMetrics, HandlerOptions, Level, LogRecord, LoggerError, Result,
};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default timeout for draining the queue on close (5 seconds)
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Default queue capacity
pub const DEFAULT_QUEUE_SIZE: usize = 1024;

enum Message {
    Record(Box<LogRecord>),
    /// Acknowledged once every record queued before it was handled
    Flush(Sender<()>),
}

/// Runs the wrapped handler on a background thread.
///
/// # Example
///
/// ```
/// use rust_logbook::handlers::{TestHandler, ThreadedWrapperHandler};
/// use rust_logbook::prelude::*;
///
/// let sink = TestHandler::new();
/// let threaded = ThreadedWrapperHandler::new(sink.clone().into_shared()).unwrap();
/// threaded.emit(&LogRecord::new(Some("api".into()), Level::Info, "queued")).unwrap();
/// threaded.flush().unwrap();
/// assert!(sink.has_info("queued"));
/// ```
pub struct ThreadedWrapperHandler {
    options: HandlerOptions,
    handler: Arc<dyn Handler>,
    sender: Mutex<Option<Sender<Message>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    metrics: Arc<HandlerMetrics>,
    shutdown_timeout: Duration,
}

impl ThreadedWrapperHandler {
    /// # Errors
    ///
    /// Returns `IoError` if the worker thread cannot be spawned.
    pub fn new(handler: Arc<dyn Handler>) -> Result<Self> {
        Self::with_queue_size(handler, DEFAULT_QUEUE_SIZE)
    }

    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for a zero queue size and `IoError`
    /// if the worker thread cannot be spawned.
    pub fn with_queue_size(handler: Arc<dyn Handler>, queue_size: usize) -> Result<Self> {
        if queue_size == 0 {
            return Err(LoggerError::config(
                "ThreadedWrapperHandler",
                "queue size must be positive",
            ));
        }

        let (sender, receiver) = bounded(queue_size);
        let metrics = Arc::new(HandlerMetrics::new());
        let worker_handler = Arc::clone(&handler);
        let worker_metrics = Arc::clone(&metrics);

        let worker = thread::Builder::new()
            .name("logbook-threaded-wrapper".to_string())
            .spawn(move || Self::run_worker(receiver, worker_handler, worker_metrics))?;

        Ok(Self {
            options: HandlerOptions::new(Level::NotSet, false),
            handler,
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
            metrics,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        })
    }

    /// How long `close` waits for the queue to drain
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn metrics(&self) -> &HandlerMetrics {
        &self.metrics
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    fn run_worker(receiver: Receiver<Message>, handler: Arc<dyn Handler>, metrics: Arc<HandlerMetrics>) {
        // Ends when every sender is gone and the queue is drained
        for message in receiver.iter() {
            match message {
                Message::Record(record) => {
                    if !handler.should_handle(&record) || !passes_filter(handler.as_ref(), &record) {
                        continue;
                    }
                    // `handle` reports its own emit errors
                    let result = catch_unwind(AssertUnwindSafe(|| handler.handle(&record)));
                    match result {
                        Ok(true) => {
                            metrics.record_handled();
                        }
                        Ok(false) => {}
                        Err(_) => {
                            metrics.record_error();
                            eprintln!(
                                "[LOGBOOK CRITICAL] Handler '{}' panicked on the worker thread. \
                                 The worker keeps running.",
                                handler.name()
                            );
                        }
                    }
                }
                Message::Flush(ack) => {
                    if let Err(e) = handler.flush() {
                        eprintln!("[LOGBOOK ERROR] Failed to flush '{}': {}", handler.name(), e);
                    }
                    let _ = ack.send(());
                }
            }
        }
    }

    fn sender(&self) -> Result<Sender<Message>> {
        self.sender
            .lock()
            .clone()
            .ok_or_else(|| LoggerError::HandlerClosed(self.name().to_string()))
    }
}

impl Handler for ThreadedWrapperHandler {
    fn options(&self) -> &HandlerOptions {
        &self.options
    }

    fn name(&self) -> &str {
        "threaded_wrapper"
    }

    fn emit(&self, record: &LogRecord) -> Result<()> {
        let mut queued = record.clone();
        queued.pull_information();

        match self.sender()?.try_send(Message::Record(Box::new(queued))) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.metrics.record_queue_full();
                self.metrics.record_dropped();
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => {
                self.metrics.record_dropped();
                Err(LoggerError::ChannelSendError)
            }
        }
    }

    /// Blocks until every record queued so far was handled, or the
    /// shutdown timeout passed
    fn flush(&self) -> Result<()> {
        let (ack_sender, ack_receiver) = bounded(1);
        self.sender()?
            .send_timeout(Message::Flush(ack_sender), self.shutdown_timeout)
            .map_err(|_| LoggerError::ChannelSendError)?;
        ack_receiver
            .recv_timeout(self.shutdown_timeout)
            .map_err(|_| LoggerError::other("timed out waiting for the worker to flush"))
    }

    /// Drains the queue and stops the worker, waiting at most the shutdown
    /// timeout
    fn close(&self) -> Result<()> {
        // Dropping the only sender lets the worker finish the queue and exit
        drop(self.sender.lock().take());

        let Some(handle) = self.worker.lock().take() else {
            return Ok(());
        };
        let start = Instant::now();
        loop {
            if handle.is_finished() {
                if handle.join().is_err() {
                    eprintln!("[LOGBOOK ERROR] Worker thread panicked during shutdown");
                }
                break;
            }
            if start.elapsed() >= self.shutdown_timeout {
                // The detached worker may still be emitting, so the wrapped
                // handler stays open
                eprintln!(
                    "[LOGBOOK WARNING] Worker thread did not finish within {:?}. \
                     Some records may be lost; '{}' is left open.",
                    self.shutdown_timeout,
                    self.handler.name()
                );
                return Ok(());
            }
            thread::sleep(Duration::from_millis(10));
        }

        let dropped = self.metrics.dropped_count();
        if dropped > 0 {
            eprintln!(
                "[LOGBOOK WARNING] {} records were dropped because the queue was full",
                dropped
            );
        }
        self.handler.close()
    }
}

impl Drop for ThreadedWrapperHandler {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            eprintln!("[LOGBOOK ERROR] Failed to close threaded handler: {}", e);
        }
    }
}
