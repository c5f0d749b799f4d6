//! Log records and their lifecycle
//!
//! A record is created for every log call that passes the logger's level
//! check. Expensive initialization (`heavy_init`) only happens when at least
//! one handler is about to see the record, and everything that depends on
//! the creating context can be pulled into the record (`pull_information`)
//! before it is closed or moved to another thread.

use super::error::{LoggerError, Result};
use super::fields::{ExtraMap, FieldValue};
use super::format::format_message;
use super::level::Level;
use super::logger::{Logger, LoggerInner};
use chrono::{DateTime, Utc};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::sync::{Arc, LazyLock, Weak};

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

static PROCESS_NAME: LazyLock<Option<String>> = LazyLock::new(|| {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
});

/// Get cached thread ID, computing and caching it on first access
fn current_thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| format!("{:?}", std::thread::current().id()))
            .clone()
    })
}

/// Get cached thread name, computing and caching it on first access
fn current_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(String::from))
            .clone()
    })
}

/// A live error attached to a record.
///
/// The error object itself is dropped when the record is closed; its name,
/// message and rendering survive only if the record was pulled first.
#[derive(Debug, Clone)]
pub struct ExceptionInfo {
    error: Arc<dyn StdError + Send + Sync + 'static>,
    type_name: String,
    backtrace: Option<Arc<Backtrace>>,
}

impl ExceptionInfo {
    /// Capture an error. A backtrace is captured when enabled through
    /// `RUST_BACKTRACE`.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::from_arc(Arc::new(error), std::any::type_name::<E>())
    }

    pub fn from_arc(
        error: Arc<dyn StdError + Send + Sync + 'static>,
        type_name: impl Into<String>,
    ) -> Self {
        let backtrace = Backtrace::capture();
        let backtrace = match backtrace.status() {
            BacktraceStatus::Captured => Some(Arc::new(backtrace)),
            _ => None,
        };
        Self {
            error,
            type_name: type_name.into(),
            backtrace,
        }
    }

    pub fn from_boxed(error: Box<dyn StdError + Send + Sync + 'static>) -> Self {
        Self::from_arc(Arc::from(error), "Box<dyn Error>")
    }

    pub fn error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.error.as_ref()
    }

    /// Full type path of the error
    pub fn name(&self) -> &str {
        &self.type_name
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }

    /// Name, message, the chain of sources and the backtrace if captured
    pub fn format(&self) -> String {
        let mut out = format!("{}: {}", self.type_name, self.error);
        let mut source = self.error.source();
        while let Some(cause) = source {
            out.push_str("\nCaused by: ");
            out.push_str(&cause.to_string());
            source = cause.source();
        }
        if let Some(ref backtrace) = self.backtrace {
            out.push_str("\nBacktrace:\n");
            out.push_str(&backtrace.to_string());
        }
        out.trim_end().to_string()
    }
}

/// Values computed from the creating context and cached by
/// [`LogRecord::pull_information`]
#[derive(Debug, Clone, Default)]
struct PulledInfo {
    message: Option<String>,
    thread: Option<String>,
    thread_name: Option<Option<String>>,
    process_name: Option<Option<String>>,
    formatted_exception: Option<Option<String>>,
    exception_name: Option<Option<String>>,
    exception_message: Option<Option<String>>,
}

/// A single event being logged
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// Name of the logger that created the record, or any other textual
    /// channel description. Descriptive only, not meant for filtering.
    pub channel: Option<String>,
    /// Message as brace-style format string
    pub msg: String,
    pub args: Vec<FieldValue>,
    pub kwargs: BTreeMap<String, FieldValue>,
    pub level: Level,
    pub exc_info: Option<ExceptionInfo>,
    /// Context data attached by callers and processors
    pub extra: ExtraMap,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub module: Option<String>,
    pub func_name: Option<String>,
    /// Creation time, set by heavy init
    pub time: Option<DateTime<Utc>>,
    /// Process id, set by heavy init
    pub process: Option<u32>,
    /// Set by a handler that wants the record left open after dispatch
    pub keep_open: bool,
    heavy_initialized: bool,
    late: bool,
    information_pulled: bool,
    pulled: PulledInfo,
    dispatcher: Option<Weak<LoggerInner>>,
}

impl LogRecord {
    pub fn new(channel: Option<String>, level: Level, msg: impl Into<String>) -> Self {
        Self {
            channel,
            msg: msg.into(),
            args: Vec::new(),
            kwargs: BTreeMap::new(),
            level,
            exc_info: None,
            extra: ExtraMap::new(),
            file: None,
            line: None,
            module: None,
            func_name: None,
            time: None,
            process: None,
            keep_open: false,
            heavy_initialized: false,
            late: false,
            information_pulled: false,
            pulled: PulledInfo::default(),
            dispatcher: None,
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: Vec<FieldValue>) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn with_kwargs(mut self, kwargs: BTreeMap<String, FieldValue>) -> Self {
        self.kwargs = kwargs;
        self
    }

    #[must_use]
    pub fn with_extra(mut self, extra: ExtraMap) -> Self {
        self.extra = extra;
        self
    }

    #[must_use]
    pub fn with_exc_info(mut self, exc_info: ExceptionInfo) -> Self {
        self.exc_info = Some(exc_info);
        self
    }

    #[must_use]
    pub fn with_location(mut self, file: &str, line: u32, module: &str) -> Self {
        self.file = Some(file.to_string());
        self.line = Some(line);
        self.module = Some(module.to_string());
        self
    }

    pub(crate) fn set_dispatcher(&mut self, dispatcher: &Arc<LoggerInner>) {
        self.dispatcher = Some(Arc::downgrade(dispatcher));
    }

    /// Does the expensive initialization (time and process id).
    ///
    /// # Errors
    ///
    /// Returns `RecordLate` if the record was already closed.
    pub fn heavy_init(&mut self) -> Result<()> {
        if self.heavy_initialized {
            return Ok(());
        }
        if self.late {
            return Err(LoggerError::RecordLate);
        }
        self.heavy_initialized = true;
        self.process = Some(std::process::id());
        self.time = Some(Utc::now());
        Ok(())
    }

    /// Caches every context-dependent value so it stays available after
    /// close and when the record is moved to another thread.
    ///
    /// A message that fails to format is left uncached; [`message`]
    /// keeps reporting the error.
    ///
    /// [`message`]: LogRecord::message
    pub fn pull_information(&mut self) {
        if self.information_pulled {
            return;
        }
        self.pulled = PulledInfo {
            message: self.message().ok(),
            thread: Some(self.thread()),
            thread_name: Some(self.thread_name()),
            process_name: Some(self.process_name()),
            formatted_exception: Some(self.formatted_exception()),
            exception_name: Some(self.exception_name()),
            exception_message: Some(self.exception_message()),
        };
        self.information_pulled = true;
    }

    /// Drops the live error and marks the record late.
    pub fn close(&mut self) {
        self.exc_info = None;
        self.late = true;
    }

    pub(crate) fn mark_late(&mut self) {
        self.late = true;
    }

    pub fn heavy_initialized(&self) -> bool {
        self.heavy_initialized
    }

    pub fn is_late(&self) -> bool {
        self.late
    }

    pub fn information_pulled(&self) -> bool {
        self.information_pulled
    }

    /// The formatted message.
    ///
    /// # Errors
    ///
    /// Returns `LoggerError::Format` naming the message, the arguments and
    /// the call site when the arguments do not fit the format string.
    pub fn message(&self) -> Result<String> {
        if let Some(ref message) = self.pulled.message {
            return Ok(message.clone());
        }
        if self.args.is_empty() && self.kwargs.is_empty() {
            return Ok(self.msg.clone());
        }
        format_message(&self.msg, &self.args, &self.kwargs).map_err(|cause| {
            LoggerError::Format {
                cause,
                msg: self.msg.clone(),
                args: format!(
                    "({})",
                    self.args.iter().map(FieldValue::repr).collect::<Vec<_>>().join(", ")
                ),
                kwargs: format!(
                    "{{{}}}",
                    self.kwargs
                        .iter()
                        .map(|(k, v)| format!("'{}': {}", k, v.repr()))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                file: self.file.clone().unwrap_or_else(|| "<unknown>".to_string()),
                line: self
                    .line
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| "?".to_string()),
            }
        })
    }

    pub fn level_name(&self) -> &'static str {
        self.level.name()
    }

    /// Identifier of the thread; evaluated late unless pulled
    pub fn thread(&self) -> String {
        self.pulled.thread.clone().unwrap_or_else(current_thread_id)
    }

    pub fn thread_name(&self) -> Option<String> {
        self.pulled
            .thread_name
            .clone()
            .unwrap_or_else(current_thread_name)
    }

    pub fn process_name(&self) -> Option<String> {
        self.pulled
            .process_name
            .clone()
            .unwrap_or_else(|| PROCESS_NAME.clone())
    }

    pub fn formatted_exception(&self) -> Option<String> {
        match self.pulled.formatted_exception {
            Some(ref pulled) => pulled.clone(),
            None => self.exc_info.as_ref().map(ExceptionInfo::format),
        }
    }

    pub fn exception_name(&self) -> Option<String> {
        match self.pulled.exception_name {
            Some(ref pulled) => pulled.clone(),
            None => self.exc_info.as_ref().map(|e| e.name().to_string()),
        }
    }

    /// Exception name without its module path
    pub fn exception_shortname(&self) -> Option<String> {
        self.exception_name()
            .map(|name| name.rsplit("::").next().unwrap_or(&name).to_string())
    }

    pub fn exception_message(&self) -> Option<String> {
        match self.pulled.exception_message {
            Some(ref pulled) => pulled.clone(),
            None => self.exc_info.as_ref().map(ExceptionInfo::message),
        }
    }

    /// The logger that created the record, if it still exists and did not
    /// suppress dispatcher information
    pub fn dispatcher(&self) -> Option<Logger> {
        self.dispatcher
            .as_ref()
            .and_then(Weak::upgrade)
            .map(Logger::from_inner)
    }

    /// Exports the record without the live error.
    ///
    /// # Errors
    ///
    /// Returns `LoggerError::Format` if the message cannot be formatted.
    pub fn to_dict(&self) -> Result<serde_json::Value> {
        use serde_json::{json, Value};

        let opt = |v: Option<String>| v.map(Value::String).unwrap_or(Value::Null);

        Ok(json!({
            "channel": self.channel,
            "msg": self.msg,
            "args": self.args.iter().map(FieldValue::to_json_value).collect::<Vec<_>>(),
            "kwargs": self
                .kwargs
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json_value()))
                .collect::<serde_json::Map<_, _>>(),
            "level": self.level as u8,
            "level_name": self.level.name(),
            "extra": self.extra.to_json_value(),
            "time": self.time.map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)),
            "process": self.process,
            "heavy_initialized": self.heavy_initialized,
            "late": self.late,
            "information_pulled": true,
            "filename": self.file,
            "lineno": self.line,
            "module": self.module,
            "func_name": self.func_name,
            "thread": self.thread(),
            "thread_name": opt(self.thread_name()),
            "process_name": opt(self.process_name()),
            "formatted_exception": opt(self.formatted_exception()),
            "exception_name": opt(self.exception_name()),
            "exception_message": opt(self.exception_message()),
            "message": self.message()?,
        }))
    }

    /// Serializes [`to_dict`](LogRecord::to_dict) as a JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_dict()?)?)
    }

    /// Creates a record from an exported dictionary.
    ///
    /// # Errors
    ///
    /// Returns an error if the level or time cannot be parsed.
    pub fn from_dict(dict: &serde_json::Value) -> Result<Self> {
        let mut record = LogRecord::new(None, Level::NotSet, String::new());
        record.update_from_dict(dict)?;
        Ok(record)
    }

    /// Like [`from_dict`](LogRecord::from_dict) but updates in place. The
    /// record is treated as pulled; it is late only if the export was.
    pub fn update_from_dict(&mut self, dict: &serde_json::Value) -> Result<()> {
        use serde_json::Value;

        let obj = dict
            .as_object()
            .ok_or_else(|| LoggerError::other("record export must be a JSON object"))?;
        let string = |key: &str| obj.get(key).and_then(Value::as_str).map(String::from);
        let nullable = |key: &str| obj.get(key).map(|v| v.as_str().map(String::from));

        if let Some(value) = obj.get("channel") {
            self.channel = value.as_str().map(String::from);
        }
        if let Some(msg) = string("msg") {
            self.msg = msg;
        }
        if let Some(args) = obj.get("args").and_then(Value::as_array) {
            self.args = args.iter().map(FieldValue::from_json_value).collect();
        }
        if let Some(kwargs) = obj.get("kwargs").and_then(Value::as_object) {
            self.kwargs = kwargs
                .iter()
                .map(|(k, v)| (k.clone(), FieldValue::from_json_value(v)))
                .collect();
        }
        if let Some(level) = obj.get("level") {
            self.level = serde_json::from_value(level.clone())?;
        }
        if let Some(extra) = obj.get("extra").and_then(Value::as_object) {
            self.extra = extra
                .iter()
                .map(|(k, v)| (k.clone(), FieldValue::from_json_value(v)))
                .collect();
        }
        if let Some(time) = string("time") {
            let parsed = DateTime::parse_from_rfc3339(&time)
                .map_err(|e| LoggerError::other(format!("invalid record time '{}': {}", time, e)))?;
            self.time = Some(parsed.with_timezone(&Utc));
        }
        if let Some(process) = obj.get("process").and_then(Value::as_u64) {
            self.process = u32::try_from(process).ok();
        }
        if let Some(flag) = obj.get("heavy_initialized").and_then(Value::as_bool) {
            self.heavy_initialized = flag;
        }
        self.late = obj.get("late").and_then(Value::as_bool).unwrap_or(false);
        self.file = string("filename").or(self.file.take());
        self.line = obj
            .get("lineno")
            .and_then(Value::as_u64)
            .and_then(|l| u32::try_from(l).ok())
            .or(self.line);
        self.module = string("module").or(self.module.take());
        self.func_name = string("func_name").or(self.func_name.take());

        self.pulled = PulledInfo {
            message: string("message"),
            thread: string("thread"),
            thread_name: nullable("thread_name"),
            process_name: nullable("process_name"),
            formatted_exception: Some(string("formatted_exception")),
            exception_name: Some(string("exception_name")),
            exception_message: Some(string("exception_message")),
        };
        self.exc_info = None;
        self.dispatcher = None;
        self.information_pulled = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_message_without_arguments_is_verbatim() {
        let record = LogRecord::new(None, Level::Info, "{not a field}");
        assert_eq!(record.message().unwrap(), "{not a field}");
    }

    #[test]
    fn test_message_formatting_error_mentions_location() {
        let record = LogRecord::new(Some("app".into()), Level::Info, "{} and {}")
            .with_args(vec![FieldValue::from(1)])
            .with_location("src/main.rs", 12, "app");

        let err = record.message().unwrap_err();
        let text = err.to_string();
        assert!(text.contains("msg='{} and {}'"));
        assert!(text.contains("args=(1)"));
        assert!(text.contains("src/main.rs, line 12"));
    }

    #[test]
    fn test_heavy_init_is_idempotent_and_refused_when_late() {
        let mut record = LogRecord::new(None, Level::Info, "x");
        record.heavy_init().unwrap();
        let time = record.time;
        record.heavy_init().unwrap();
        assert_eq!(record.time, time);
        assert_eq!(record.process, Some(std::process::id()));

        let mut late = LogRecord::new(None, Level::Info, "x");
        late.close();
        assert!(matches!(late.heavy_init(), Err(LoggerError::RecordLate)));
    }

    #[test]
    fn test_close_drops_exception_unless_pulled() {
        let err = io::Error::new(io::ErrorKind::NotFound, "config missing");

        let mut unpulled = LogRecord::new(None, Level::Error, "boom")
            .with_exc_info(ExceptionInfo::new(err));
        let mut pulled = unpulled.clone();

        unpulled.close();
        assert!(unpulled.exception_message().is_none());

        pulled.pull_information();
        pulled.close();
        assert_eq!(pulled.exception_message().as_deref(), Some("config missing"));
        assert_eq!(pulled.exception_shortname().as_deref(), Some("Error"));
        assert!(pulled
            .formatted_exception()
            .unwrap()
            .starts_with("std::io::error::Error: config missing"));
    }

    #[test]
    fn test_pulled_thread_survives_thread_change() {
        let mut record = LogRecord::new(None, Level::Info, "x");
        record.pull_information();
        let origin = record.thread();

        let moved = std::thread::spawn(move || record.thread()).join().unwrap();
        assert_eq!(moved, origin);
    }

    #[test]
    fn test_dict_round_trip() {
        let mut record = LogRecord::new(Some("db".into()), Level::Warning, "slow query {ms}ms")
            .with_kwargs([("ms".to_string(), FieldValue::from(250))].into_iter().collect());
        record.extra.insert("host", "db-1");
        record.heavy_init().unwrap();

        let exported = record.to_dict().unwrap();
        assert_eq!(exported["message"], "slow query 250ms");
        assert_eq!(exported["level_name"], "WARNING");

        let restored = LogRecord::from_dict(&exported).unwrap();
        assert_eq!(restored.channel.as_deref(), Some("db"));
        assert_eq!(restored.level, Level::Warning);
        assert_eq!(restored.message().unwrap(), "slow query 250ms");
        assert_eq!(restored.extra.get("host").to_string(), "db-1");
        assert_eq!(restored.time, record.time);
        assert!(!restored.is_late());
        assert!(restored.dispatcher().is_none());
    }

    #[test]
    fn test_dict_keeps_late_flag() {
        let fresh = LogRecord::new(Some("w".into()), Level::Warning, "x");
        let restored = LogRecord::from_dict(&fresh.to_dict().unwrap()).unwrap();
        assert!(!restored.is_late());
        assert!(!restored.heavy_initialized());

        let mut closed = LogRecord::new(Some("w".into()), Level::Warning, "x");
        closed.close();
        let restored = LogRecord::from_dict(&closed.to_dict().unwrap()).unwrap();
        assert!(restored.is_late());
    }
}
