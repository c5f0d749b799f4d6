//! Handlers writing formatted lines to a stream

use crate::core::{Handler, HandlerOptions, Level, LogRecord, LoggerError, Result};
use parking_lot::Mutex;
use std::io::{self, Write};

/// Writes one formatted line per record to any `Write` implementation.
///
/// # Example
///
/// ```
/// use rust_logbook::handlers::StreamHandler;
/// use rust_logbook::prelude::*;
///
/// let handler = StreamHandler::with_writer(Vec::new())
///     .with_format_string("{record.level_name}: {record.message}")
///     .unwrap();
/// let record = LogRecord::new(None, Level::Info, "hello");
/// handler.emit(&record).unwrap();
/// assert_eq!(handler.into_inner(), b"INFO: hello\n");
/// ```
pub struct StreamHandler<W: Write + Send> {
    options: HandlerOptions,
    stream: Mutex<W>,
    name: String,
    autoflush: bool,
}

/// Stream handler writing to stderr
pub type StderrHandler = StreamHandler<io::Stderr>;

/// Stream handler writing to stdout
pub type StdoutHandler = StreamHandler<io::Stdout>;

impl<W: Write + Send> StreamHandler<W> {
    pub fn with_writer(writer: W) -> Self {
        Self {
            options: HandlerOptions::new(Level::NotSet, false),
            stream: Mutex::new(writer),
            name: "stream".to_string(),
            autoflush: true,
        }
    }

    /// Flush the stream after every record (default `true`)
    #[must_use]
    pub fn with_autoflush(mut self, autoflush: bool) -> Self {
        self.autoflush = autoflush;
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Consumes the handler and returns the stream
    pub fn into_inner(self) -> W {
        self.stream.into_inner()
    }

    /// Write an already formatted line
    pub(crate) fn write_line(&self, line: &str) -> Result<()> {
        let mut stream = self.stream.lock();
        stream
            .write_all(line.as_bytes())
            .and_then(|_| stream.write_all(b"\n"))
            .map_err(|e| {
                LoggerError::io_operation("write log line", format!("handler '{}'", self.name), e)
            })?;
        if self.autoflush {
            stream.flush()?;
        }
        Ok(())
    }
}

impl StreamHandler<io::Stderr> {
    pub fn new() -> Self {
        Self::with_writer(io::stderr()).with_name("stderr")
    }
}

impl StreamHandler<io::Stdout> {
    pub fn new() -> Self {
        Self::with_writer(io::stdout()).with_name("stdout")
    }
}

impl Default for StreamHandler<io::Stderr> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> Handler for StreamHandler<W> {
    fn options(&self) -> &HandlerOptions {
        &self.options
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn emit(&self, record: &LogRecord) -> Result<()> {
        let line = self.format(record)?;
        self.write_line(&line)
    }

    fn flush(&self) -> Result<()> {
        self.stream.lock().flush()?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.flush()
    }
}

/// Stderr handler that colors each line by level
#[cfg(feature = "console")]
pub struct ColorizedStderrHandler {
    inner: StderrHandler,
}

#[cfg(feature = "console")]
impl ColorizedStderrHandler {
    pub fn new() -> Self {
        Self {
            inner: StderrHandler::new().with_name("colorized_stderr"),
        }
    }

    /// Whether colors are emitted regardless of terminal detection
    pub fn force_colors(force: bool) {
        colored::control::set_override(force);
    }
}

#[cfg(feature = "console")]
impl Default for ColorizedStderrHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "console")]
impl Handler for ColorizedStderrHandler {
    fn options(&self) -> &HandlerOptions {
        self.inner.options()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn emit(&self, record: &LogRecord) -> Result<()> {
        use colored::Colorize;

        let line = self.format(record)?;
        let colored = line.color(record.level.color_code()).to_string();
        self.inner.write_line(&colored)
    }

    fn flush(&self) -> Result<()> {
        self.inner.flush()
    }
}
