//! Error types for the logbook

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Integer does not name a level
    #[error("unknown level {0}")]
    UnknownLevel(u8),

    /// String does not name a level
    #[error("unknown level name {0}")]
    UnknownLevelName(String),

    /// The record message could not be formatted with its arguments
    #[error(
        "Could not format message with provided arguments: {cause}\n  msg='{msg}'\n  \
         args={args} \n  kwargs={kwargs}.\nHappened in file {file}, line {line}"
    )]
    Format {
        cause: String,
        msg: String,
        args: String,
        kwargs: String,
        file: String,
        line: String,
    },

    /// Template syntax error found while parsing a format string
    #[error("invalid format string '{template}': {message}")]
    FormatSyntax { template: String, message: String },

    /// Heavy initialization requested after the record was closed
    #[error("heavy init is no longer possible")]
    RecordLate,

    /// Pop on an empty context stack
    #[error("no objects on {0} stack")]
    EmptyStack(&'static str),

    /// Pop found a different object on top of the stack
    #[error("popped unexpected object from {0} stack")]
    StackMismatch(&'static str),

    /// Logger is already a member of a group
    #[error("logger '{0}' already belongs to a group")]
    AlreadyInGroup(String),

    /// Logger is not a member of the group it is removed from
    #[error("logger '{0}' is not a member of this group")]
    NotInGroup(String),

    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// File handler error with path
    #[error("File handler error for '{path}': {message}")]
    FileHandlerError { path: String, message: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotationError { path: String, message: String },

    /// Background worker is gone
    #[error("Failed to send log record to background worker")]
    ChannelSendError,

    /// Handler used after close
    #[error("handler '{0}' is closed")]
    HandlerClosed(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a file handler error
    pub fn file_handler(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileHandlerError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a file rotation error
    pub fn file_rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileRotationError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a template syntax error
    pub fn format_syntax(template: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FormatSyntax {
            template: template.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }
}
