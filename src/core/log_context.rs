//! Structured logging context for key-value fields
//!
//! This module provides:
//! - `FieldValue`: a JSON-like value attached to a context key
//! - `LogContext`: ordered key-value fields carried by every entry
//! - `ContextProvider`: hook that supplies ambient fields (trace ids, ...) at log time

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Context keys with a defined meaning; every other key is passthrough data.
pub mod keys {
    pub const REQUEST_ID: &str = "requestId";
    pub const TRACE_ID: &str = "traceId";
    pub const SPAN_ID: &str = "spanId";
    pub const USER_ID: &str = "userId";
    pub const SESSION_ID: &str = "sessionId";
    pub const ENVIRONMENT: &str = "environment";
    pub const COMPONENT: &str = "component";

    pub const RESERVED: [&str; 7] = [
        REQUEST_ID,
        TRACE_ID,
        SPAN_ID,
        USER_ID,
        SESSION_ID,
        ENVIRONMENT,
        COMPONENT,
    ];

    /// Check whether a key is one of the reserved context keys
    pub fn is_reserved(key: &str) -> bool {
        RESERVED.contains(&key)
    }
}

/// Value type for structured logging fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(fl) => write!(f, "{}", fl),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Null => write!(f, "null"),
            FieldValue::List(_) | FieldValue::Map(_) => {
                write!(f, "{}", self.to_json_value())
            }
        }
    }
}

impl FieldValue {
    /// Convert to serde_json::Value for JSON serialization
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            FieldValue::String(s) => serde_json::Value::String(s.clone()),
            FieldValue::Int(i) => serde_json::Value::Number((*i).into()),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FieldValue::Bool(b) => serde_json::Value::Bool(*b),
            FieldValue::Null => serde_json::Value::Null,
            FieldValue::List(items) => {
                serde_json::Value::Array(items.iter().map(FieldValue::to_json_value).collect())
            }
            FieldValue::Map(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json_value()))
                    .collect(),
            ),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<&String> for FieldValue {
    fn from(s: &String) -> Self {
        FieldValue::String(s.clone())
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i as i64)
    }
}

impl From<u16> for FieldValue {
    fn from(i: u16) -> Self {
        FieldValue::Int(i64::from(i))
    }
}

impl From<u32> for FieldValue {
    fn from(i: u32) -> Self {
        FieldValue::Int(i64::from(i))
    }
}

impl From<u64> for FieldValue {
    fn from(i: u64) -> Self {
        i64::try_from(i)
            .map(FieldValue::Int)
            .unwrap_or(FieldValue::Float(i as f64))
    }
}

impl From<usize> for FieldValue {
    fn from(i: usize) -> Self {
        FieldValue::from(i as u64)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(items: Vec<T>) -> Self {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => FieldValue::Null,
            serde_json::Value::Bool(b) => FieldValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Int(i),
                None => FieldValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => FieldValue::String(s),
            serde_json::Value::Array(items) => {
                FieldValue::List(items.into_iter().map(FieldValue::from).collect())
            }
            serde_json::Value::Object(map) => FieldValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, FieldValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Context for structured logging with key-value fields
///
/// Keys are kept sorted so two contexts with the same fields always render
/// identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogContext {
    fields: BTreeMap<String, FieldValue>,
}

impl LogContext {
    /// Create a new empty log context
    pub fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    /// Add a field to the context
    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Add a field to the context (mutable version)
    pub fn add_field<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.insert(key.into(), value.into());
    }

    pub fn with_request_id(self, id: impl Into<String>) -> Self {
        self.with_field(keys::REQUEST_ID, id.into())
    }

    pub fn with_trace_id(self, id: impl Into<String>) -> Self {
        self.with_field(keys::TRACE_ID, id.into())
    }

    pub fn with_span_id(self, id: impl Into<String>) -> Self {
        self.with_field(keys::SPAN_ID, id.into())
    }

    pub fn with_user_id(self, id: impl Into<String>) -> Self {
        self.with_field(keys::USER_ID, id.into())
    }

    pub fn with_session_id(self, id: impl Into<String>) -> Self {
        self.with_field(keys::SESSION_ID, id.into())
    }

    pub fn with_component(self, component: impl Into<String>) -> Self {
        self.with_field(keys::COMPONENT, component.into())
    }

    /// Get a single field
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Get all fields
    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    /// Check if context has any fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Overlay `other` on top of this context; keys from `other` win.
    pub fn merge(&mut self, other: &LogContext) {
        for (key, value) in &other.fields {
            self.fields.insert(key.clone(), value.clone());
        }
    }

    /// Return a new context with `other` layered over this one
    #[must_use]
    pub fn merged(&self, other: &LogContext) -> LogContext {
        let mut merged = self.clone();
        merged.merge(other);
        merged
    }

    /// Format fields as key=value pairs
    pub fn format_fields(&self) -> String {
        self.fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json_value()))
                .collect(),
        )
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_fields())
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for LogContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Supplies ambient context at the moment an entry is created
///
/// This is the seam for span lookup: an implementation can read the current
/// OpenTelemetry span, a task-local request scope, or anything else.
///
/// Closures work directly:
///
/// ```
/// use structured_logger::core::{ContextProvider, LogContext};
///
/// let provider = || LogContext::new().with_trace_id("4bf92f3577b34da6");
/// assert!(provider.current_context().contains_key("traceId"));
/// ```
pub trait ContextProvider: Send + Sync {
    fn current_context(&self) -> LogContext;
}

impl<F> ContextProvider for F
where
    F: Fn() -> LogContext + Send + Sync,
{
    fn current_context(&self) -> LogContext {
        self()
    }
}
