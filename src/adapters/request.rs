//! Framework-independent pieces of request logging
//!
//! Request ids, W3C trace context parsing, redaction of sensitive fields and
//! the completion guard that guarantees exactly one completion entry per
//! request. The axum and actix-web middlewares are thin glue around these.

use crate::core::{keys, ErrorInfo, FieldValue, LogContext, LogLevel, Logger};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Instant;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const TRACEPARENT_HEADER: &str = "traceparent";
pub const REDACTED: &str = "[REDACTED]";

/// Longest inbound request id that is reused as-is
const MAX_REQUEST_ID_LEN: usize = 128;

/// Logger attached to a request by the request logging middleware
///
/// It carries `requestId`, `method`, `path` and, when the caller sent a
/// `traceparent` header, `traceId`/`spanId`. Handlers extract it to log with
/// that context.
#[derive(Clone, Debug)]
pub struct RequestLogger(pub Logger);

impl std::ops::Deref for RequestLogger {
    type Target = Logger;

    fn deref(&self) -> &Logger {
        &self.0
    }
}

/// What the request middlewares log and what they leave out
#[derive(Debug, Clone)]
pub struct RequestLoggingConfig {
    /// Field names replaced by `[REDACTED]` in headers, query and body
    pub sensitive_fields: Vec<String>,
    pub log_headers: bool,
    pub log_query: bool,
    pub log_body: bool,
    /// Bodies larger than this (or without a declared length) are not buffered
    pub max_body_size: usize,
    /// Paths (and their sub-paths) that are not logged at all
    pub skip_paths: Vec<String>,
}

impl Default for RequestLoggingConfig {
    fn default() -> Self {
        Self {
            sensitive_fields: [
                "password",
                "token",
                "accessToken",
                "refreshToken",
                "authorization",
                "cookie",
                "set-cookie",
                "secret",
                "apiKey",
                "x-api-key",
                "creditCard",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            log_headers: true,
            log_query: true,
            log_body: true,
            max_body_size: 64 * 1024,
            skip_paths: Vec::new(),
        }
    }
}

impl RequestLoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sensitive_field(mut self, name: impl Into<String>) -> Self {
        self.sensitive_fields.push(name.into());
        self
    }

    #[must_use]
    pub fn skip_path(mut self, path: impl Into<String>) -> Self {
        self.skip_paths.push(path.into());
        self
    }

    #[must_use]
    pub fn log_headers(mut self, enabled: bool) -> Self {
        self.log_headers = enabled;
        self
    }

    #[must_use]
    pub fn log_query(mut self, enabled: bool) -> Self {
        self.log_query = enabled;
        self
    }

    #[must_use]
    pub fn log_body(mut self, enabled: bool) -> Self {
        self.log_body = enabled;
        self
    }

    #[must_use]
    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    /// Exact, case-insensitive name match
    pub fn is_sensitive(&self, name: &str) -> bool {
        self.sensitive_fields
            .iter()
            .any(|field| field.eq_ignore_ascii_case(name))
    }

    pub fn should_skip(&self, path: &str) -> bool {
        self.skip_paths.iter().any(|skip| {
            path == skip
                || path
                    .strip_prefix(skip.as_str())
                    .is_some_and(|rest| rest.starts_with('/') || skip.ends_with('/'))
        })
    }

    pub fn redact(&self, value: &Value) -> Value {
        redact_value(value, &self.sensitive_fields)
    }

    /// Header map as a JSON object with sensitive values redacted
    pub fn redact_headers<'a, I>(&self, headers: I) -> Value
    where
        I: IntoIterator<Item = (&'a str, &'a [u8])>,
    {
        let mut map = Map::new();
        for (name, raw) in headers {
            let value = if self.is_sensitive(name) {
                REDACTED.to_string()
            } else {
                match std::str::from_utf8(raw) {
                    Ok(text) => text.to_string(),
                    Err(_) => format!("<{} bytes>", raw.len()),
                }
            };
            map.insert(name.to_string(), Value::String(value));
        }
        Value::Object(map)
    }

    /// Decoded query parameters with sensitive values redacted
    pub fn redact_query(&self, query: &str) -> Value {
        let mut params = BTreeMap::new();
        if let Ok(url) = reqwest::Url::parse(&format!("http://localhost/?{}", query)) {
            for (name, value) in url.query_pairs() {
                params.insert(name.into_owned(), Value::String(value.into_owned()));
            }
        }
        let object: Map<String, Value> = params.into_iter().collect();
        self.redact(&Value::Object(object))
    }

    /// Whether a body with this declared length should be buffered for logging
    pub fn should_buffer_body(&self, content_length: Option<u64>) -> bool {
        self.log_body
            && content_length.is_some_and(|len| len > 0 && len <= self.max_body_size as u64)
    }

    /// Loggable form of a buffered body: redacted JSON, text, or a size note
    pub fn body_for_log(&self, bytes: &[u8]) -> Option<Value> {
        if !self.log_body || bytes.is_empty() {
            return None;
        }
        if bytes.len() > self.max_body_size {
            return Some(Value::String(format!("[{} bytes omitted]", bytes.len())));
        }
        if let Ok(json) = serde_json::from_slice::<Value>(bytes) {
            return Some(self.redact(&json));
        }
        match std::str::from_utf8(bytes) {
            Ok(text) => Some(Value::String(text.to_string())),
            Err(_) => Some(Value::String(format!("[binary {} bytes]", bytes.len()))),
        }
    }
}

/// Replace the value of every sensitive key, at any depth
///
/// ```
/// use structured_logger::adapters::redact_value;
/// use serde_json::json;
///
/// let body = json!({"password": "x", "username": "y"});
/// let redacted = redact_value(&body, &["password".to_string()]);
/// assert_eq!(redacted, json!({"password": "[REDACTED]", "username": "y"}));
/// ```
pub fn redact_value(value: &Value, sensitive: &[String]) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, inner)| {
                    let redacted = if sensitive.iter().any(|s| s.eq_ignore_ascii_case(key)) {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact_value(inner, sensitive)
                    };
                    (key.clone(), redacted)
                })
                .collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| redact_value(item, sensitive)).collect())
        }
        other => other.clone(),
    }
}

/// Trace identifiers from a W3C `traceparent` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: String,
    pub span_id: String,
    pub sampled: bool,
}

/// Parse `version-traceid-spanid-flags`, e.g.
/// `00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01`
///
/// Malformed headers and all-zero ids yield `None`.
pub fn parse_traceparent(header: &str) -> Option<TraceContext> {
    let mut parts = header.trim().split('-');
    let version = parts.next()?;
    let trace_id = parts.next()?;
    let span_id = parts.next()?;
    let flags = parts.next()?;

    if version.len() != 2 || !is_hex(version) || version.eq_ignore_ascii_case("ff") {
        return None;
    }
    // version 00 has exactly four fields
    if version == "00" && parts.next().is_some() {
        return None;
    }
    if trace_id.len() != 32 || !is_hex(trace_id) || trace_id.bytes().all(|b| b == b'0') {
        return None;
    }
    if span_id.len() != 16 || !is_hex(span_id) || span_id.bytes().all(|b| b == b'0') {
        return None;
    }
    if flags.len() != 2 || !is_hex(flags) {
        return None;
    }

    let flags = u8::from_str_radix(flags, 16).ok()?;
    Some(TraceContext {
        trace_id: trace_id.to_ascii_lowercase(),
        span_id: span_id.to_ascii_lowercase(),
        sampled: flags & 0x01 == 0x01,
    })
}

fn is_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Reuse a sane inbound `x-request-id`, otherwise mint a UUID v4
pub fn resolve_request_id(inbound: Option<&str>) -> String {
    inbound
        .map(str::trim)
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_REQUEST_ID_LEN
                && id.chars().all(|c| c.is_ascii_graphic())
        })
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Context every request-scoped logger starts with
pub fn request_context(
    request_id: &str,
    method: &str,
    path: &str,
    trace: Option<&TraceContext>,
) -> LogContext {
    let mut context = LogContext::new()
        .with_request_id(request_id)
        .with_field("method", method)
        .with_field("path", path);
    if let Some(trace) = trace {
        context.add_field(keys::TRACE_ID, trace.trace_id.as_str());
        context.add_field(keys::SPAN_ID, trace.span_id.as_str());
    }
    context
}

/// Details of the inbound request for the `"Incoming request"` entry
pub fn incoming_details(
    config: &RequestLoggingConfig,
    headers: Option<Value>,
    query: Option<&str>,
    body: Option<Value>,
) -> LogContext {
    let mut details = LogContext::new();
    if let Some(headers) = headers.filter(|_| config.log_headers) {
        details.add_field("headers", FieldValue::from(headers));
    }
    if let Some(query) = query.filter(|q| config.log_query && !q.is_empty()) {
        details.add_field("query", FieldValue::from(config.redact_query(query)));
    }
    if let Some(body) = body {
        details.add_field("body", FieldValue::from(body));
    }
    details
}

pub fn status_level(status: u16) -> LogLevel {
    match status {
        500.. => LogLevel::Error,
        400..=499 => LogLevel::Warn,
        _ => LogLevel::Info,
    }
}

/// Logs the end of a request exactly once
///
/// Call [`complete`](Self::complete) or [`fail`](Self::fail). If neither
/// happens (the request future was dropped, e.g. client disconnect or a
/// panic) a `"Request failed"` entry is logged when the guard is dropped.
pub struct RequestCompletion {
    logger: Logger,
    started: Instant,
    finished: bool,
}

impl RequestCompletion {
    /// Start the request clock
    pub fn start(logger: Logger) -> Self {
        Self {
            logger,
            started: Instant::now(),
            finished: false,
        }
    }

    fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    /// `"Request completed"` at info (< 400), warn (4xx) or error (5xx)
    pub fn complete(mut self, status: u16) {
        self.finished = true;
        self.logger
            .entry(status_level(status))
            .message("Request completed")
            .field("statusCode", status)
            .duration_ms(self.elapsed_ms())
            .log();
    }

    /// `"Request failed"` with the failure; `status` when a response exists
    pub fn fail(mut self, status: Option<u16>, reason: &str) {
        self.finished = true;
        self.log_failure(status, reason);
    }

    fn log_failure(&self, status: Option<u16>, reason: &str) {
        let mut entry = self
            .logger
            .error_builder()
            .message("Request failed")
            .error_info(ErrorInfo::new("RequestError", reason))
            .duration_ms(self.elapsed_ms());
        if let Some(status) = status {
            entry = entry.field("statusCode", status);
        }
        entry.log();
    }
}

impl Drop for RequestCompletion {
    fn drop(&mut self) {
        if !self.finished {
            self.log_failure(None, "request dropped before a response was produced");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LogEntry, Result, Transport};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Default)]
    struct Capture(Mutex<Vec<LogEntry>>);

    impl Transport for Capture {
        fn log(&self, entry: &LogEntry) -> Result<()> {
            self.0.lock().push(entry.clone());
            Ok(())
        }

        fn name(&self) -> &str {
            "capture"
        }
    }

    fn capture_logger() -> (Logger, Arc<Capture>) {
        let capture = Arc::new(Capture::default());
        let logger = Logger::builder()
            .level(LogLevel::Debug)
            .shared_transport(capture.clone())
            .build();
        (logger, capture)
    }

    #[test]
    fn test_redaction_is_recursive_and_case_insensitive() {
        let config = RequestLoggingConfig::default();
        let body = json!({
            "user": {"name": "ann", "Password": "hunter2"},
            "sessions": [{"token": "abc"}, {"id": 1}],
            "passwordHint": "pet name"
        });

        let redacted = config.redact(&body);

        assert_eq!(redacted["user"]["Password"], REDACTED);
        assert_eq!(redacted["user"]["name"], "ann");
        assert_eq!(redacted["sessions"][0]["token"], REDACTED);
        assert_eq!(redacted["sessions"][1]["id"], 1);
        // exact name match only
        assert_eq!(redacted["passwordHint"], "pet name");
    }

    #[test]
    fn test_header_and_query_redaction() {
        let config = RequestLoggingConfig::default();
        let headers = config.redact_headers(vec![
            ("authorization", b"Bearer secret".as_slice()),
            ("accept", b"application/json".as_slice()),
        ]);
        assert_eq!(headers["authorization"], REDACTED);
        assert_eq!(headers["accept"], "application/json");

        let query = config.redact_query("page=2&apiKey=k%20y&q=rust+logs");
        assert_eq!(query, json!({"apiKey": REDACTED, "page": "2", "q": "rust logs"}));
    }

    #[test]
    fn test_body_for_log() {
        let config = RequestLoggingConfig::default().max_body_size(32);

        assert_eq!(
            config.body_for_log(br#"{"password":"x","username":"y"}"#),
            Some(json!({"password": REDACTED, "username": "y"}))
        );
        assert_eq!(config.body_for_log(b"plain"), Some(json!("plain")));
        assert_eq!(config.body_for_log(b""), None);
        assert_eq!(config.body_for_log(&[b'a'; 40]), Some(json!("[40 bytes omitted]")));

        assert!(config.should_buffer_body(Some(10)));
        assert!(!config.should_buffer_body(Some(33)));
        assert!(!config.should_buffer_body(None));
    }

    #[test]
    fn test_traceparent() {
        let trace =
            parse_traceparent("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01").unwrap();
        assert_eq!(trace.trace_id, "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(trace.span_id, "00f067aa0ba902b7");
        assert!(trace.sampled);

        assert!(parse_traceparent("00-00000000000000000000000000000000-00f067aa0ba902b7-01").is_none());
        assert!(parse_traceparent("ff-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01").is_none());
        assert!(parse_traceparent("00-4bf92f35-00f067aa0ba902b7-01").is_none());
        assert!(parse_traceparent("garbage").is_none());
    }

    #[test]
    fn test_request_id_reuse_or_generate() {
        assert_eq!(resolve_request_id(Some("abc-123")), "abc-123");

        let generated = resolve_request_id(Some("   "));
        assert!(uuid::Uuid::parse_str(&generated).is_ok());
        assert_ne!(resolve_request_id(None), resolve_request_id(None));
    }

    #[test]
    fn test_skip_paths() {
        let config = RequestLoggingConfig::default().skip_path("/health");
        assert!(config.should_skip("/health"));
        assert!(config.should_skip("/health/live"));
        assert!(!config.should_skip("/healthz"));
        assert!(!config.should_skip("/api"));
    }

    #[test]
    fn test_completion_levels() {
        let (logger, capture) = capture_logger();

        RequestCompletion::start(logger.clone()).complete(201);
        RequestCompletion::start(logger.clone()).complete(404);
        RequestCompletion::start(logger.clone()).complete(503);

        let entries = capture.0.lock();
        let levels: Vec<_> = entries.iter().map(LogEntry::level).collect();
        assert_eq!(levels, vec![LogLevel::Info, LogLevel::Warn, LogLevel::Error]);
        assert!(entries.iter().all(|e| e.message() == "Request completed"));
        assert!(entries.iter().all(|e| e.duration().is_some()));
        assert_eq!(entries[1].context().get("statusCode"), Some(&FieldValue::Int(404)));
    }

    #[test]
    fn test_dropped_completion_logs_failure_once() {
        let (logger, capture) = capture_logger();

        drop(RequestCompletion::start(logger.clone()));
        RequestCompletion::start(logger).fail(Some(500), "handler error");

        let entries = capture.0.lock();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.message() == "Request failed"));
        assert!(entries.iter().all(|e| e.level() == LogLevel::Error));
        assert_eq!(entries[1].error().map(|e| e.message.as_str()), Some("handler error"));
    }
}
