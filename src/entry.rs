//! Typed pieces of the Cloud Logging `jsonPayload` schema.
//!
//! All of these serialize into [`Fields`](crate::fields::Fields) values. The
//! encoder owns the keys in [`RESERVED_KEYS`]: each is written at most once,
//! in its fixed slot. `context` is the exception and stays an ordinary
//! payload field.

use serde::{Deserialize, Serialize};

/// Key under which operation metadata is written.
pub const LOGGING_OPERATION: &str = "logging.googleapis.com/operation";

/// Key under which the emitting source location is written.
pub const LOGGING_SOURCE_LOCATION: &str = "logging.googleapis.com/sourceLocation";

/// Field names consumed by specialized rendering downstream.
pub const RESERVED_KEYS: [&str; 11] = [
    "severity",
    "time",
    "message",
    "stack",
    "type",
    "serviceContext",
    LOGGING_OPERATION,
    LOGGING_SOURCE_LOCATION,
    "httpRequest",
    "context",
    "err",
];

/// Service identification, attached to records that error reporting should
/// pick up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceContext {
    pub service: String,
    pub version: String,
}

impl ServiceContext {
    pub fn new(service: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            version: version.into(),
        }
    }
}

/// Build a [`ServiceContext`] from the calling crate's package metadata.
#[macro_export]
macro_rules! service_context {
    () => {
        $crate::entry::ServiceContext::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    };
}

/// Additional information about a potentially long-running operation with
/// which a log entry is associated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Entries with the same identifier belong to the same operation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The combination of `id` and `producer` must be globally unique, e.g.
    /// `"github.com/MyProject/MyApplication"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub first: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub last: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Operation {
    pub fn new(id: impl Into<String>, producer: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            producer: Some(producer.into()),
            ..Self::default()
        }
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Overlay `other` on top of `self`. Set fields of `other` win; flags are
    /// sticky once raised.
    pub fn merge(&mut self, other: &Operation) {
        if other.id.is_some() {
            self.id = other.id.clone();
        }
        if other.producer.is_some() {
            self.producer = other.producer.clone();
        }
        self.first |= other.first;
        self.last |= other.last;
    }
}

/// HTTP request details recognized by the logging agent.
///
/// Fields not listed here stay in `jsonPayload` untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequest {
    /// "GET", "HEAD", "PUT", "POST", ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_method: Option<String>,

    /// Scheme, host, path and query of the requested URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_url: Option<String>,

    /// Size of the request in bytes, headers and body included.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_size: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_size: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// IPv4 or IPv6 address of the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_ip: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_ip: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,

    /// Seconds with up to nine fractional digits, suffixed with `s`, e.g.
    /// `"3.5s"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_lookup: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_hit: Option<bool>,

    /// Only meaningful when `cache_hit` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_validated_with_origin_server: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

/// Location in the source code that emitted a log entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// 1-based; 0 means unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
}

impl SourceLocation {
    pub fn from_caller(location: &std::panic::Location<'_>) -> Self {
        Self {
            file: Some(location.file().to_string()),
            line: Some(location.line()),
            function: None,
        }
    }
}

/// Location reported to error reporting. Its presence under
/// `context.reportLocation` (or at the payload top level) marks an entry as a
/// reportable error even when the message is not a stack trace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
}

/// HTTP request context as understood by error reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequestContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_ip: Option<String>,
}

/// Context in which an error occurred, written under the `context` key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_request: Option<HttpRequestContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_location: Option<ReportLocation>,
}
