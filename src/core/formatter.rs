//! Record formatters
//!
//! Provides:
//! - `StringFormatter`: brace template over record attributes (default)
//! - `JsonFormatter`: one JSON object per record

use super::error::Result;
use super::fields::FieldValue;
use super::format::Template;
use super::record::LogRecord;
use super::timestamp::TimestampFormat;

/// Template used by text handlers unless configured otherwise
///
/// Example output: `[2025-01-08 10:30:45.123456] WARNING: app: disk almost full`
pub const DEFAULT_FORMAT_STRING: &str =
    "[{record.time}] {record.level_name}: {record.channel}: {record.message}";

/// Turns a record into the text a handler writes
pub trait Formatter: Send + Sync {
    fn format(&self, record: &LogRecord) -> Result<String>;
}

impl<F> Formatter for F
where
    F: Fn(&LogRecord) -> Result<String> + Send + Sync,
{
    fn format(&self, record: &LogRecord) -> Result<String> {
        self(record)
    }
}

/// Formats records with a brace template over `record.*` attributes.
///
/// Available names: `channel`, `level`, `level_name`, `msg`, `message`,
/// `time`, `process`, `process_name`, `thread`, `thread_name`, `filename`,
/// `lineno`, `module`, `func_name`, `exception_name`,
/// `exception_shortname`, `exception_message`, `extra[key]`,
/// `kwargs[key]`.
///
/// # Example
///
/// ```
/// use rust_logbook::core::{Formatter, Level, LogRecord, StringFormatter};
///
/// let formatter = StringFormatter::new("{record.level_name:<8}|{record.message}").unwrap();
/// let record = LogRecord::new(Some("app".into()), Level::Info, "ready");
/// assert_eq!(formatter.format(&record).unwrap(), "INFO    |ready");
/// ```
#[derive(Debug, Clone)]
pub struct StringFormatter {
    template: Template,
    timestamp_format: TimestampFormat,
    needs_message: bool,
}

impl StringFormatter {
    /// # Errors
    ///
    /// Returns `FormatSyntax` if the template does not parse.
    pub fn new(format_string: &str) -> Result<Self> {
        let template = Template::parse(format_string)?;
        let needs_message = template.field_names().any(|n| n == "record.message");
        Ok(Self {
            template,
            timestamp_format: TimestampFormat::default(),
            needs_message,
        })
    }

    /// Set the timestamp format used for `{record.time}`
    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    pub fn format_string(&self) -> &str {
        self.template.source()
    }

    fn lookup(&self, record: &LogRecord, message: Option<&str>, key: &str) -> Option<FieldValue> {
        let attr = key.strip_prefix("record.")?;
        if let Some(inner) = attr.strip_prefix("extra[").and_then(|s| s.strip_suffix(']')) {
            return Some(record.extra.get(inner).clone());
        }
        if let Some(inner) = attr.strip_prefix("kwargs[").and_then(|s| s.strip_suffix(']')) {
            return Some(record.kwargs.get(inner).cloned().unwrap_or(FieldValue::Null));
        }

        let value = match attr {
            "channel" => record.channel.clone().into(),
            "level" => FieldValue::Int(record.level as i64),
            "level_name" => record.level_name().into(),
            "msg" => record.msg.clone().into(),
            "message" => message.map(String::from).into(),
            "time" => FieldValue::String(
                record
                    .time
                    .map(|t| self.timestamp_format.format(&t))
                    .unwrap_or_default(),
            ),
            "process" => record.process.into(),
            "process_name" => record.process_name().into(),
            "thread" => record.thread().into(),
            "thread_name" => record.thread_name().into(),
            "filename" => record.file.clone().into(),
            "lineno" => record.line.into(),
            "module" => record.module.clone().into(),
            "func_name" => record.func_name.clone().into(),
            "exception_name" => record.exception_name().into(),
            "exception_shortname" => record.exception_shortname().into(),
            "exception_message" => record.exception_message().into(),
            "formatted_exception" => record.formatted_exception().into(),
            _ => return None,
        };
        Some(value)
    }
}

impl Default for StringFormatter {
    fn default() -> Self {
        // The default template is known to parse
        Self {
            template: Template::parse(DEFAULT_FORMAT_STRING)
                .unwrap_or_else(|_| unreachable!("default format string parses")),
            timestamp_format: TimestampFormat::default(),
            needs_message: true,
        }
    }
}

impl Formatter for StringFormatter {
    fn format(&self, record: &LogRecord) -> Result<String> {
        let message = if self.needs_message {
            Some(record.message()?)
        } else {
            None
        };

        let mut line = self
            .template
            .render(&[], |key| self.lookup(record, message.as_deref(), key))
            .map_err(|cause| {
                super::error::LoggerError::format_syntax(self.template.source(), cause)
            })?;

        if let Some(exception) = record.formatted_exception() {
            line.push('\n');
            line.push_str(&exception);
        }
        Ok(line)
    }
}

/// Formats each record as one line of JSON (the record export)
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, record: &LogRecord) -> Result<String> {
        let dict = record.to_dict()?;
        let json = if self.pretty {
            serde_json::to_string_pretty(&dict)?
        } else {
            serde_json::to_string(&dict)?
        };
        Ok(json)
    }
}
