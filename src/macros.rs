//! Logging macros for ergonomic log message formatting.
//!
//! These macros provide a convenient interface for logging with automatic
//! string formatting, similar to `println!` and `format!`. A context can be
//! attached with a leading `context:` argument.
//!
//! # Examples
//!
//! ```
//! use structured_logger::prelude::*;
//! use structured_logger::info;
//!
//! let logger = Logger::new();
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With format arguments
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//!
//! // With structured context
//! let ctx = LogContext::new().with_user_id("u-42");
//! info!(logger, context: ctx, "User performed action: {}", "login");
//! ```

/// Log a message at an explicit level.
///
/// # Examples
///
/// ```
/// # use structured_logger::prelude::*;
/// # let logger = Logger::new();
/// use structured_logger::log;
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// log!(logger, LogLevel::Warn, context: LogContext::new().with_field("attempt", 2), "Retrying");
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, context: $ctx:expr, $($arg:tt)+) => {
        $logger.log_with_context($level, format!($($arg)+), $ctx)
    };
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log($level, format!($($arg)+))
    };
}

/// Log a debug-level message.
///
/// # Examples
///
/// ```
/// # use structured_logger::prelude::*;
/// # let logger = Logger::new();
/// use structured_logger::debug;
/// debug!(logger, "Debug information");
/// debug!(logger, "Counter value: {}", 10);
/// ```
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// # use structured_logger::prelude::*;
/// # let logger = Logger::new();
/// use structured_logger::warn;
/// warn!(logger, "Low disk space");
/// warn!(logger, "Retry attempt {} of {}", 3, 5);
/// ```
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}
