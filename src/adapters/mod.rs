//! Web framework adapters
//!
//! Both middlewares derive a request-scoped [`Logger`](crate::Logger) with
//! `requestId`, `method`, `path` and trace ids, log the inbound request with
//! sensitive fields redacted, and log exactly one completion entry.

pub mod request;

#[cfg(feature = "actix")]
pub mod actix;
#[cfg(feature = "axum")]
pub mod axum;

pub use request::{
    parse_traceparent, redact_value, resolve_request_id, status_level, RequestCompletion,
    RequestLogger, RequestLoggingConfig, TraceContext, REDACTED, REQUEST_ID_HEADER,
    TRACEPARENT_HEADER,
};
