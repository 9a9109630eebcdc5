use serde::Serialize;
use serde_json::{Map, Value};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error as StdError;
use std::fmt;

/// Property names on an error that are bookkeeping rather than context and
/// never become fields of a record.
pub const INTERNAL_KEYS: [&str; 3] = ["message", "name", "cause"];

/// An error as it is written to the log.
///
/// Carries a class name (`type`), the message, a stack text, extra properties
/// that surface as top-level record fields, and an optional cause that is
/// rendered as a `caused by:` section of the full stack.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRecord {
    kind: String,
    message: String,
    stack: Option<String>,
    properties: Map<String, Value>,
    cause: Option<Box<ErrorRecord>>,
}

impl ErrorRecord {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            stack: None,
            properties: Map::new(),
            cause: None,
        }
    }

    /// Capture a typed error. The class name is the last path segment of the
    /// Rust type name and the cause chain follows `source()`.
    pub fn from_error<E>(err: &E) -> Self
    where
        E: StdError + 'static,
    {
        let as_dyn: &(dyn StdError + 'static) = err;
        if let Some(record) = as_dyn.downcast_ref::<ErrorRecord>() {
            return record.clone();
        }
        Self::capture(short_type_name::<E>(), as_dyn)
    }

    /// Capture a type-erased error. Unless it is an `ErrorRecord`, the class
    /// name is unknown and written as `Error`.
    pub fn from_dyn(err: &(dyn StdError + 'static)) -> Self {
        if let Some(record) = err.downcast_ref::<ErrorRecord>() {
            return record.clone();
        }
        Self::capture("Error".to_string(), err)
    }

    fn capture(kind: String, err: &(dyn StdError + 'static)) -> Self {
        let mut record = ErrorRecord::new(kind, err.to_string());
        record.cause = err.source().map(|src| Box::new(ErrorRecord::from_dyn(src)));
        record
    }

    /// Attach an extra property. Values that fail to serialize are dropped.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.properties.insert(key.into(), value);
        }
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Append a backtrace of the current thread to the stack text, when the
    /// environment enables backtraces (`RUST_BACKTRACE` / `RUST_LIB_BACKTRACE`).
    pub fn with_backtrace(mut self) -> Self {
        let backtrace = Backtrace::capture();
        if backtrace.status() == BacktraceStatus::Captured {
            self.stack = Some(format!("{}\n{}", self.header(), backtrace));
        }
        self
    }

    pub fn with_cause(mut self, cause: ErrorRecord) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&ErrorRecord> {
        self.cause.as_deref()
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    /// Properties that should surface as record fields.
    pub fn visible_properties(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.properties
            .iter()
            .filter(|(k, _)| !INTERNAL_KEYS.contains(&k.as_str()))
    }

    fn header(&self) -> String {
        if self.message.is_empty() {
            self.kind.clone()
        } else {
            format!("{}: {}", self.kind, self.message)
        }
    }

    /// Stack text of this error alone.
    pub fn stack(&self) -> String {
        self.stack.clone().unwrap_or_else(|| self.header())
    }

    /// Stack text including every cause.
    pub fn full_stack(&self) -> String {
        let mut out = self.stack();
        let mut cause = self.cause.as_deref();
        while let Some(err) = cause {
            out.push_str("\ncaused by: ");
            out.push_str(&err.stack());
            cause = err.cause.as_deref();
        }
        out
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for ErrorRecord {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_deref().map(|c| c as &(dyn StdError + 'static))
    }
}

fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, thiserror::Error)]
    #[error("resolver failed")]
    struct ResolverError {
        #[source]
        source: std::io::Error,
    }

    #[test]
    fn stack_defaults_to_type_and_message() {
        let err = ErrorRecord::new("RangeError", "out of range");
        assert_eq!(err.stack(), "RangeError: out of range");
        assert_eq!(err.full_stack(), "RangeError: out of range");
    }

    #[test]
    fn full_stack_walks_the_cause_chain() {
        let err = ErrorRecord::new("HttpError", "HTTP failure")
            .with_stack("HttpError: HTTP failure\n    at fetch (client.rs:10)")
            .with_cause(ErrorRecord::new("RangeError", "You can't give this to me"));
        assert_eq!(
            err.full_stack(),
            "HttpError: HTTP failure\n    at fetch (client.rs:10)\ncaused by: RangeError: You can't give this to me"
        );
    }

    #[test]
    fn from_error_uses_short_type_name_and_source() {
        let err = ResolverError {
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk gone"),
        };
        let record = ErrorRecord::from_error(&err);
        assert_eq!(record.kind(), "ResolverError");
        assert_eq!(record.message(), "resolver failed");
        assert_eq!(record.full_stack(), "ResolverError: resolver failed\ncaused by: Error: disk gone");
    }

    #[test]
    fn from_dyn_keeps_error_record_properties() {
        let original = ErrorRecord::new("MyError", "Custom error").with_property("extra", json!({"a": 1}));
        let erased: &(dyn StdError + 'static) = &original;
        let back = ErrorRecord::from_dyn(erased);
        assert_eq!(back, original);
    }

    #[test]
    fn internal_properties_are_hidden() {
        let err = ErrorRecord::new("E", "m")
            .with_property("name", "E")
            .with_property("code", 42)
            .with_property("cause", "x");
        let visible: Vec<&str> = err.visible_properties().map(|(k, _)| k.as_str()).collect();
        assert_eq!(visible, ["code"]);
    }
}
