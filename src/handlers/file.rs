//! File handler implementation

use crate::core::{Handler, HandlerOptions, Level, LogRecord, LoggerError, Result};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Opens `path` for logging, creating parent directories as needed
pub(crate) fn open_log_file(path: &Path, append: bool) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            LoggerError::io_operation(
                "create log directory",
                format!("Failed to create directory '{}'", parent.display()),
                e,
            )
        })?;
    }

    let mut options = OpenOptions::new();
    options.create(true);
    if append {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }
    let file = options.open(path).map_err(|e| {
        LoggerError::file_handler(path.display().to_string(), format!("Failed to open: {}", e))
    })?;
    Ok(BufWriter::new(file))
}

/// Writes records to a file, one formatted line each.
///
/// The file is always written as UTF-8. With `delay` the file is opened
/// only when the first record arrives.
///
/// # Example
///
/// ```no_run
/// use rust_logbook::handlers::FileHandler;
/// use rust_logbook::prelude::*;
///
/// let handler = FileHandler::builder("/var/log/app.log")
///     .append(false)
///     .delay(true)
///     .build()
///     .unwrap()
///     .with_level(Level::Info);
/// let handler = handler.into_shared();
/// let _bound = handler.applicationbound();
/// ```
pub struct FileHandler {
    options: HandlerOptions,
    path: PathBuf,
    append: bool,
    state: Mutex<FileState>,
}

struct FileState {
    writer: Option<BufWriter<File>>,
    /// Once the file was opened, reopening never truncates
    opened: bool,
}

impl FileHandler {
    /// Opens `path` in append mode
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        Self::builder(path).build()
    }

    pub fn builder(path: impl Into<PathBuf>) -> FileHandlerBuilder {
        FileHandlerBuilder {
            path: path.into(),
            append: true,
            delay: false,
            level: Level::NotSet,
            bubble: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().writer.is_some()
    }

    /// Opens the file if needed and writes one line
    fn write_line(&self, line: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.writer.is_none() {
            state.writer = Some(open_log_file(&self.path, self.append || state.opened)?);
            state.opened = true;
        }
        let writer = state
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::file_handler(self.path.display().to_string(), "not open"))?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

impl Handler for FileHandler {
    fn options(&self) -> &HandlerOptions {
        &self.options
    }

    fn name(&self) -> &str {
        "file"
    }

    fn emit(&self, record: &LogRecord) -> Result<()> {
        let line = self.format(record)?;
        self.write_line(&line)
    }

    fn flush(&self) -> Result<()> {
        if let Some(ref mut writer) = self.state.lock().writer {
            writer.flush()?;
        }
        Ok(())
    }

    /// Flushes and closes the file. A later record reopens it in append
    /// mode.
    fn close(&self) -> Result<()> {
        let writer = self.state.lock().writer.take();
        if let Some(mut writer) = writer {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for FileHandler {
    fn drop(&mut self) {
        // Ensure all buffered data is flushed to disk
        let _ = self.flush();
    }
}

/// Builder for [`FileHandler`]
#[derive(Debug, Clone)]
pub struct FileHandlerBuilder {
    path: PathBuf,
    append: bool,
    delay: bool,
    level: Level,
    bubble: bool,
}

impl FileHandlerBuilder {
    /// Append to an existing file (default) or truncate it
    #[must_use = "builder methods return a new value"]
    pub fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    /// Postpone opening the file until the first record
    #[must_use = "builder methods return a new value"]
    pub fn delay(mut self, delay: bool) -> Self {
        self.delay = delay;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn bubble(mut self, bubble: bool) -> Self {
        self.bubble = bubble;
        self
    }

    /// # Errors
    ///
    /// Returns `FileHandlerError` if the file cannot be opened right away.
    pub fn build(self) -> Result<FileHandler> {
        let writer = if self.delay {
            None
        } else {
            Some(open_log_file(&self.path, self.append)?)
        };
        let opened = writer.is_some();
        Ok(FileHandler {
            options: HandlerOptions::new(self.level, self.bubble),
            append: self.append,
            path: self.path,
            state: Mutex::new(FileState { writer, opened }),
        })
    }
}
