//! Logging macros for ergonomic log message formatting.
//!
//! These macros format eagerly like `format!`, but only when the logger
//! would accept the level, and record the call site (file, line and
//! module path).
//!
//! # Examples
//!
//! ```
//! use rust_logbook::prelude::*;
//! use rust_logbook::info;
//!
//! let logger = Logger::new("server");
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//! ```

/// Log a message at a level chosen at runtime.
///
/// # Examples
///
/// ```
/// # use rust_logbook::prelude::*;
/// # let logger = Logger::new("app");
/// use rust_logbook::log;
/// log!(logger, Level::Info, "Simple message");
/// log!(logger, Level::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        let level: $crate::core::Level = $level;
        if level >= logger.level() && !logger.disabled() {
            logger.log(
                level,
                $crate::core::LogArgs::new(format!($($arg)+))
                    .location(file!(), line!(), module_path!()),
            );
        }
    }};
}

/// Log a debug-level message.
///
/// # Examples
///
/// ```
/// # use rust_logbook::prelude::*;
/// # let logger = Logger::new("app");
/// use rust_logbook::debug;
/// debug!(logger, "Counter value: {}", 10);
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::Level::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::Level::Info, $($arg)+)
    };
}

/// Log a notice-level message: normal but significant.
#[macro_export]
macro_rules! notice {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::Level::Notice, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// # use rust_logbook::prelude::*;
/// # let logger = Logger::new("app");
/// use rust_logbook::warn;
/// warn!(logger, "Retry attempt {} of {}", 3, 5);
/// ```
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::Level::Warning, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::Level::Error, $($arg)+)
    };
}

/// Log a critical-level message.
#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::core::Level::Critical, $($arg)+)
    };
}
