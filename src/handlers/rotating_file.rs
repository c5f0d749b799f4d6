//! File handlers that rotate their files
//!
//! - `RotatingFileHandler` rotates by size: `app.log` becomes `app.log.1`,
//!   older backups shift up to `app.log.<backup_count>` (gzipped with the
//!   `compression` feature if enabled in the policy).
//! - `TimedRotatingFileHandler` writes to date-stamped files
//!   (`app-2025-01-08.log`) and keeps the newest `backup_count` of them.

use super::file::open_log_file;
use crate::core::{Handler, HandlerOptions, Level, LogRecord, LoggerError, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const MAX_DELETION_FAILURES: usize = 5;

/// When and how a [`RotatingFileHandler`] rotates
///
/// # Examples
///
/// ```
/// use rust_logbook::handlers::RotationPolicy;
///
/// // 50 MB per file, seven gzipped backups
/// let policy = RotationPolicy::new()
///     .with_max_size(50 * 1024 * 1024)
///     .with_backup_count(7)
///     .with_compression(true);
/// assert_eq!(policy.backup_count, 7);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RotationPolicy {
    /// Size in bytes a file may reach before it is rotated
    pub max_size: u64,
    /// Number of rotated files to keep
    pub backup_count: usize,
    /// Whether to gzip rotated files
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_size: 1024 * 1024,
            backup_count: 5,
            compress: false,
        }
    }
}

impl RotationPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_backup_count(mut self, count: usize) -> Self {
        self.backup_count = count;
        self
    }

    /// Enable compression (needs the `compression` feature)
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }
}

struct RotatingState {
    writer: Option<BufWriter<File>>,
    current_size: u64,
    /// Consecutive failures to delete the oldest backup
    deletion_failure_count: usize,
}

/// Size-based rotating file handler
///
/// # Examples
///
/// ```no_run
/// use rust_logbook::handlers::{RotatingFileHandler, RotationPolicy};
/// use rust_logbook::prelude::*;
///
/// let policy = RotationPolicy::new().with_max_size(10 * 1024 * 1024).with_backup_count(3);
/// let handler = RotatingFileHandler::with_policy("/var/log/app.log", policy)
///     .unwrap()
///     .into_shared();
/// let _bound = handler.applicationbound();
/// ```
pub struct RotatingFileHandler {
    options: HandlerOptions,
    base_path: PathBuf,
    policy: RotationPolicy,
    state: Mutex<RotatingState>,
}

impl RotatingFileHandler {
    /// Create a handler with the default policy
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be created or opened
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_policy(path, RotationPolicy::default())
    }

    /// # Errors
    ///
    /// Returns error if the policy is unusable or the file cannot be opened
    pub fn with_policy<P: AsRef<Path>>(path: P, policy: RotationPolicy) -> Result<Self> {
        if policy.max_size == 0 {
            return Err(LoggerError::config("RotationPolicy", "max_size must be positive"));
        }
        if policy.compress && !cfg!(feature = "compression") {
            return Err(LoggerError::config(
                "RotationPolicy",
                "compression requested but the `compression` feature is disabled",
            ));
        }

        let base_path = path.as_ref().to_path_buf();
        let writer = open_log_file(&base_path, true)?;
        let current_size = writer
            .get_ref()
            .metadata()
            .map_err(|e| {
                LoggerError::file_handler(
                    base_path.display().to_string(),
                    format!("Cannot access file metadata: {}", e),
                )
            })?
            .len();

        Ok(Self {
            options: HandlerOptions::new(Level::NotSet, false),
            base_path,
            policy,
            state: Mutex::new(RotatingState {
                writer: Some(writer),
                current_size,
                deletion_failure_count: 0,
            }),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    #[must_use]
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.state.lock().current_size
    }

    /// Path of the backup with the given index, `app.log.<index>`
    pub fn backup_path(&self, index: usize) -> PathBuf {
        let mut path = self.base_path.clone();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("app.log")
            .to_string();
        path.set_file_name(format!("{}.{}", filename, index));
        path
    }

    fn compressed(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".gz");
        PathBuf::from(name)
    }

    /// Remove the backup that would exceed `backup_count`
    fn remove_oldest(&self, state: &mut RotatingState) -> Result<()> {
        let oldest = self.backup_path(self.policy.backup_count);
        let mut deletion_failed = false;

        for candidate in [Self::compressed(&oldest), oldest] {
            if candidate.exists() {
                if let Err(e) = fs::remove_file(&candidate) {
                    deletion_failed = true;
                    eprintln!(
                        "[LOGBOOK WARNING] Failed to remove oldest backup {}: {} (failure #{}/{})",
                        candidate.display(),
                        e,
                        state.deletion_failure_count + 1,
                        MAX_DELETION_FAILURES
                    );
                }
            }
        }

        if deletion_failed {
            state.deletion_failure_count += 1;
            if state.deletion_failure_count >= MAX_DELETION_FAILURES {
                return Err(LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!(
                        "Rotation aborted: failed to delete old backup files {} consecutive times",
                        state.deletion_failure_count
                    ),
                ));
            }
        } else {
            state.deletion_failure_count = 0;
        }
        Ok(())
    }

    fn rotate(&self, state: &mut RotatingState) -> Result<()> {
        if let Some(mut writer) = state.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to flush before rotation: {}", e),
                )
            })?;
        }

        if self.policy.backup_count > 0 {
            self.remove_oldest(state)?;

            for i in (1..self.policy.backup_count).rev() {
                let old_path = self.backup_path(i);
                let new_path = self.backup_path(i + 1);
                for (from, to) in [
                    (Self::compressed(&old_path), Self::compressed(&new_path)),
                    (old_path, new_path),
                ] {
                    if from.exists() {
                        fs::rename(&from, &to).map_err(|e| {
                            LoggerError::file_rotation(
                                from.display().to_string(),
                                format!("Failed to rotate backup files: {}", e),
                            )
                        })?;
                    }
                }
            }

            let backup_path = self.backup_path(1);
            if self.base_path.exists() {
                fs::rename(&self.base_path, &backup_path).map_err(|e| {
                    LoggerError::file_rotation(
                        self.base_path.display().to_string(),
                        format!("Failed to rotate current log file: {}", e),
                    )
                })?;
                if self.policy.compress {
                    compress_file(&backup_path)?;
                }
            }
        }

        // Without backups the current file is simply truncated
        state.writer = Some(open_log_file(&self.base_path, false)?);
        state.current_size = 0;
        Ok(())
    }
}

impl Handler for RotatingFileHandler {
    fn options(&self) -> &HandlerOptions {
        &self.options
    }

    fn name(&self) -> &str {
        "rotating_file"
    }

    fn emit(&self, record: &LogRecord) -> Result<()> {
        let mut line = self.format(record)?;
        line.push('\n');
        let len = line.len() as u64;

        let mut state = self.state.lock();
        if state.current_size > 0 && state.current_size + len > self.policy.max_size {
            if let Err(e) = self.rotate(&mut state) {
                // Keep logging into the current file rather than losing records
                eprintln!(
                    "[LOGBOOK WARNING] Log rotation failed: {}. Continuing with current file.",
                    e
                );
                if state.writer.is_none() {
                    state.writer = Some(open_log_file(&self.base_path, true)?);
                }
            }
        }

        let writer = state.writer.as_mut().ok_or_else(|| {
            LoggerError::file_handler(self.base_path.display().to_string(), "not open")
        })?;
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        state.current_size += len;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        if let Some(ref mut writer) = self.state.lock().writer {
            writer.flush()?;
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let writer = self.state.lock().writer.take();
        if let Some(mut writer) = writer {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for RotatingFileHandler {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// Gzips `path` into `path.gz` through a temporary file; the original is
/// removed only after compression succeeded.
#[cfg(feature = "compression")]
fn compress_file(path: &Path) -> Result<()> {
    use std::io::{BufReader, Read};

    let gz_path = RotatingFileHandler::compressed(path);
    let mut temp_name = gz_path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_gz_path = PathBuf::from(temp_name);

    let input = File::open(path).map_err(|e| {
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to open file for compression: {}", path.display()),
            e,
        )
    })?;
    let mut reader = BufReader::with_capacity(64 * 1024, input);

    let output = File::create(&temp_gz_path).map_err(|e| {
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to create temporary file: {}", temp_gz_path.display()),
            e,
        )
    })?;
    let mut encoder = flate2::write::GzEncoder::new(
        BufWriter::with_capacity(64 * 1024, output),
        flate2::Compression::default(),
    );

    let mut buffer = vec![0u8; 64 * 1024];
    let streamed: std::io::Result<()> = (|| {
        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            encoder.write_all(&buffer[..bytes_read])?;
        }
        encoder.finish()?.flush()
    })();

    if let Err(e) = streamed.and_then(|_| fs::rename(&temp_gz_path, &gz_path)) {
        let _ = fs::remove_file(&temp_gz_path);
        return Err(LoggerError::io_operation(
            "compress log file",
            format!("Failed to compress {}", path.display()),
            e,
        ));
    }

    if let Err(e) = fs::remove_file(path) {
        eprintln!(
            "[LOGBOOK WARNING] Compression succeeded but failed to remove original file {}: {}",
            path.display(),
            e
        );
    }
    Ok(())
}

#[cfg(not(feature = "compression"))]
fn compress_file(_path: &Path) -> Result<()> {
    Ok(())
}

struct TimedState {
    writer: Option<BufWriter<File>>,
    current_path: String,
}

/// Writes into one file per period, named after the record time.
///
/// `app.log` with the default `%Y-%m-%d` date format gives
/// `app-2025-01-08.log`. After switching files, only the newest
/// `backup_count` matching files are kept (0 keeps everything).
///
/// # Examples
///
/// ```no_run
/// use rust_logbook::handlers::TimedRotatingFileHandler;
///
/// let handler = TimedRotatingFileHandler::new("/var/log/app.log")
///     .unwrap()
///     .with_backup_count(14);
/// ```
pub struct TimedRotatingFileHandler {
    options: HandlerOptions,
    base_path: PathBuf,
    date_format: String,
    backup_count: usize,
    state: Mutex<TimedState>,
}

impl TimedRotatingFileHandler {
    pub const DEFAULT_DATE_FORMAT: &'static str = "%Y-%m-%d";

    /// # Errors
    ///
    /// Never fails with the default date format; kept fallible for symmetry
    /// with [`with_date_format`](TimedRotatingFileHandler::with_date_format).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_date_format(path, Self::DEFAULT_DATE_FORMAT)
    }

    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if `date_format` is not a valid
    /// strftime pattern.
    pub fn with_date_format<P: AsRef<Path>>(path: P, date_format: &str) -> Result<Self> {
        use chrono::format::{Item, StrftimeItems};

        if date_format.is_empty()
            || StrftimeItems::new(date_format).any(|item| matches!(item, Item::Error))
        {
            return Err(LoggerError::config(
                "TimedRotatingFileHandler",
                format!("invalid date format '{}'", date_format),
            ));
        }

        Ok(Self {
            options: HandlerOptions::new(Level::NotSet, false),
            base_path: path.as_ref().to_path_buf(),
            date_format: date_format.to_string(),
            backup_count: 0,
            state: Mutex::new(TimedState {
                writer: None,
                current_path: String::new(),
            }),
        })
    }

    #[must_use]
    pub fn with_backup_count(mut self, backup_count: usize) -> Self {
        self.backup_count = backup_count;
        self
    }

    fn stem_and_extension(&self) -> (String, String) {
        let stem = self
            .base_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("app")
            .to_string();
        let extension = self
            .base_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();
        (stem, extension)
    }

    /// The file a record with this time goes to
    pub fn path_for(&self, time: &DateTime<Utc>) -> Result<PathBuf> {
        use std::fmt::Write as _;

        let mut date = String::new();
        write!(date, "{}", time.format(&self.date_format)).map_err(|_| {
            LoggerError::config(
                "TimedRotatingFileHandler",
                format!("cannot format date with '{}'", self.date_format),
            )
        })?;
        let (stem, extension) = self.stem_and_extension();
        Ok(self
            .base_path
            .with_file_name(format!("{}-{}{}", stem, date, extension)))
    }

    /// Whether `date` has exactly the shape `date_format` produces
    fn is_date_stamp(&self, date: &str) -> bool {
        use chrono::format::{parse, Parsed, StrftimeItems};

        !date.is_empty()
            && parse(&mut Parsed::default(), date, StrftimeItems::new(&self.date_format)).is_ok()
    }

    /// Deletes all but the newest `backup_count` files of this handler
    fn remove_old_files(&self) {
        if self.backup_count == 0 {
            return;
        }
        let (stem, extension) = self.stem_and_extension();
        let prefix = format!("{}-", stem);
        let directory = match self.base_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let entries = match fs::read_dir(&directory) {
            Ok(entries) => entries,
            Err(e) => {
                eprintln!(
                    "[LOGBOOK WARNING] Cannot list {} for cleanup: {}",
                    directory.display(),
                    e
                );
                return;
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .and_then(|n| n.strip_prefix(&prefix))
                    .and_then(|rest| rest.strip_suffix(&extension))
                    .is_some_and(|date| self.is_date_stamp(date))
            })
            .collect();
        // Date stamps sort chronologically
        files.sort();

        let excess = files.len().saturating_sub(self.backup_count);
        for path in &files[..excess] {
            if let Err(e) = fs::remove_file(path) {
                eprintln!(
                    "[LOGBOOK WARNING] Failed to remove old log file {}: {}",
                    path.display(),
                    e
                );
            }
        }
    }
}

impl Handler for TimedRotatingFileHandler {
    fn options(&self) -> &HandlerOptions {
        &self.options
    }

    fn name(&self) -> &str {
        "timed_rotating_file"
    }

    fn emit(&self, record: &LogRecord) -> Result<()> {
        let line = self.format(record)?;
        let time = record.time.unwrap_or_else(Utc::now);
        let path = self.path_for(&time)?;
        let path_key = path.to_string_lossy().into_owned();

        let mut state = self.state.lock();
        if state.writer.is_none() || state.current_path != path_key {
            if let Some(mut previous) = state.writer.take() {
                previous.flush()?;
            }
            state.writer = Some(open_log_file(&path, true)?);
            state.current_path = path_key;
            self.remove_old_files();
        }

        let writer = state.writer.as_mut().ok_or_else(|| {
            LoggerError::file_handler(path.display().to_string(), "not open")
        })?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        if let Some(ref mut writer) = self.state.lock().writer {
            writer.flush()?;
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let writer = self.state.lock().writer.take();
        if let Some(mut writer) = writer {
            writer.flush()?;
        }
        Ok(())
    }
}
