//! Error types for the logger system

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
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

    /// Configuration file could not be parsed
    #[error("Config parse error in '{path}': {message}")]
    ConfigParse { path: String, message: String },

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// File transport error with path
    #[error("File transport error for '{path}': {message}")]
    FileTransportError { path: String, message: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotationError { path: String, message: String },

    /// Remote endpoint answered with a non-success status
    #[error("Remote endpoint '{endpoint}' responded with status {status}")]
    RemoteStatus { endpoint: String, status: u16 },

    /// Remote request could not be built or sent
    #[error("Remote delivery to '{endpoint}' failed: {message}")]
    RemoteDelivery { endpoint: String, message: String },

    /// A component needs a tokio runtime but none is available
    #[error("No tokio runtime available for {component}")]
    RuntimeUnavailable { component: String },

    /// Writer error (generic)
    #[error("Writer error: {0}")]
    WriterError(String),

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

    /// Create a config parse error
    pub fn config_parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::ConfigParse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a file transport error
    pub fn file_transport(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileTransportError {
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

    /// Create a remote status error
    pub fn remote_status(endpoint: impl Into<String>, status: u16) -> Self {
        LoggerError::RemoteStatus {
            endpoint: endpoint.into(),
            status,
        }
    }

    /// Create a remote delivery error
    pub fn remote_delivery(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::RemoteDelivery {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a runtime unavailable error
    pub fn runtime_unavailable(component: impl Into<String>) -> Self {
        LoggerError::RuntimeUnavailable {
            component: component.into(),
        }
    }

    /// Create a writer error (generic)
    pub fn writer<S: Into<String>>(msg: S) -> Self {
        LoggerError::WriterError(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// Whether a remote delivery failure may succeed on a later attempt
    ///
    /// Network failures, serialization failures and every non-2xx status are
    /// retried up to the ceiling. Anything else skips straight to the fallback.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            LoggerError::RemoteStatus { .. }
                | LoggerError::RemoteDelivery { .. }
                | LoggerError::JsonError(_)
                | LoggerError::IoError(_)
        )
    }
}
