use serde_json::{Map, Value};
use std::fmt::Write as _;

use crate::entry::{ServiceContext, LOGGING_OPERATION, LOGGING_SOURCE_LOCATION, RESERVED_KEYS};
use crate::error_record::ErrorRecord;
use crate::fields::is_truthy;
use crate::record::{Message, Payload, Record};

/// Strings longer than this skip the manual escape scan.
const FAST_STRING_MAX: usize = 100;

/// Keys lifted out of the payload into fixed slots after `type`.
const HOISTED_KEYS: [&str; 3] = [LOGGING_OPERATION, "httpRequest", LOGGING_SOURCE_LOCATION];

/// Turns a [`Record`] into one line of output, newline included.
///
/// Implementations must not panic and must not fail: a record that cannot
/// be fully represented is written with the offending parts left out.
pub trait Encode: Send + Sync {
    fn encode(&self, record: &Record<'_>) -> String;
}

/// Encoder for the Cloud Logging structured JSON format.
///
/// Produces compact single-line JSON with the field order `severity`,
/// `time`, `message`, `stack`, `serviceContext`, `type`, operation metadata,
/// `httpRequest`, source location, bound fields, payload fields.
#[derive(Debug, Clone, Default)]
pub struct StackdriverEncoder {
    service_context: Option<ServiceContext>,
}

impl StackdriverEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service_context(service_context: ServiceContext) -> Self {
        Self {
            service_context: Some(service_context),
        }
    }

    pub fn service_context(&self) -> Option<&ServiceContext> {
        self.service_context.as_ref()
    }
}

impl Encode for StackdriverEncoder {
    fn encode(&self, record: &Record<'_>) -> String {
        let mut out = String::with_capacity(256);
        out.push_str("{\"severity\":\"");
        out.push_str(record.level.severity().label());
        out.push_str("\",\"time\":");
        let _ = write!(out, "{}", record.time);

        let (err, err_is_payload) = match (&record.payload, &record.message) {
            (Payload::Error(e), _) => (Some(e), true),
            (_, Message::Error(e)) => (Some(e), false),
            (Payload::Fields(f), _) => (f.error(), false),
            (Payload::None, _) => (None, false),
        };
        let text = match &record.message {
            Message::Text(s) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        };
        let msg_is_stack = err.is_some() && (matches!(record.message, Message::Error(_)) || text.is_none());

        let entries = payload_entries(&record.payload, err, err_is_payload);

        if let Some(err) = err {
            let stack = err.full_stack();
            if msg_is_stack {
                out.push_str(",\"message\":");
                write_str(&mut out, &stack);
            } else {
                if let Some(text) = text {
                    out.push_str(",\"message\":");
                    write_str(&mut out, text);
                }
                out.push_str(",\"stack\":");
                write_str(&mut out, &stack);
            }

            if let Some(ctx) = &self.service_context {
                if msg_is_stack || has_report_location(&record.payload) {
                    out.push_str(",\"serviceContext\":{\"service\":");
                    write_str(&mut out, &ctx.service);
                    out.push_str(",\"version\":");
                    write_str(&mut out, &ctx.version);
                    out.push('}');
                }
            }

            if err_is_payload {
                out.push_str(",\"type\":");
                write_str(&mut out, err.kind());
            }
        } else if let Some(text) = text {
            out.push_str(",\"message\":");
            write_str(&mut out, text);
        }

        write_operation(&mut out, record, &entries);

        for key in &HOISTED_KEYS[1..] {
            let value = lookup(&entries, key).or_else(|| record.bindings.get(key));
            if let Some(value) = value {
                write_field(&mut out, key, value);
            } else if *key == LOGGING_SOURCE_LOCATION {
                if let Some(location) = &record.source_location {
                    if let Ok(value) = serde_json::to_value(location) {
                        write_field(&mut out, key, &value);
                    }
                }
            }
        }

        // Bound fields first so the call's own fields can shadow them.
        for (key, value) in record.bindings.iter() {
            if is_owned(key) || lookup(&entries, key).is_some() {
                continue;
            }
            write_field(&mut out, key, value);
        }

        for (key, value) in entries.iter() {
            if is_owned(key) {
                continue;
            }
            write_field(&mut out, key, value);
        }

        out.push_str("}\n");
        out
    }
}

/// Payload fields in output order: the caller's fields first, then error
/// properties whose keys the caller did not set.
fn payload_entries<'r>(
    payload: &'r Payload,
    err: Option<&'r ErrorRecord>,
    err_is_payload: bool,
) -> Vec<(&'r str, &'r Value)> {
    let mut entries: Vec<(&str, &Value)> = Vec::new();
    if let Payload::Fields(fields) = payload {
        entries.extend(fields.iter().map(|(k, v)| (k.as_str(), v)));
    }
    if let Some(err) = err {
        for (key, value) in err.visible_properties() {
            if err_is_payload || lookup(&entries, key).is_none() {
                entries.push((key.as_str(), value));
            }
        }
    }
    entries
}

fn lookup<'r>(entries: &[(&str, &'r Value)], key: &str) -> Option<&'r Value> {
    entries.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// Reserved names the encoder writes itself, in their fixed slots.
fn is_owned(key: &str) -> bool {
    key != "context" && RESERVED_KEYS.contains(&key)
}

/// A field of the caller's own payload object, error properties included only
/// when the payload is the error.
fn own_field<'r>(payload: &'r Payload, key: &str) -> Option<&'r Value> {
    match payload {
        Payload::Fields(fields) => fields.get(key),
        Payload::Error(err) => err.properties().get(key),
        Payload::None => None,
    }
}

fn has_report_location(payload: &Payload) -> bool {
    if own_field(payload, "reportLocation").map(is_truthy).unwrap_or(false) {
        return true;
    }
    own_field(payload, "context")
        .and_then(|ctx| ctx.get("reportLocation"))
        .map(is_truthy)
        .unwrap_or(false)
}

/// Writes at most one operation object: the bound metadata with the
/// payload's own operation object laid over it key by key. Flags set on the
/// bound operation stay set.
fn write_operation(out: &mut String, record: &Record<'_>, entries: &[(&str, &Value)]) {
    let from_payload = lookup(entries, LOGGING_OPERATION);
    match (&record.operation, from_payload) {
        (Some(bound), Some(Value::Object(call))) => {
            let mut merged = match serde_json::to_value(bound) {
                Ok(Value::Object(map)) => map,
                _ => Map::new(),
            };
            for (key, value) in call {
                let sticky = matches!(key.as_str(), "first" | "last")
                    && merged.get(key).map(is_truthy).unwrap_or(false)
                    && !is_truthy(value);
                if !sticky {
                    merged.insert(key.clone(), value.clone());
                }
            }
            write_field(out, LOGGING_OPERATION, &Value::Object(merged));
        }
        (Some(bound), None) => write_serialized(out, LOGGING_OPERATION, bound),
        (_, Some(value)) => write_field(out, LOGGING_OPERATION, value),
        (None, None) => {
            if let Some(value) = record.bindings.get(LOGGING_OPERATION) {
                write_field(out, LOGGING_OPERATION, value);
            }
        }
    }
}

fn write_serialized<T: serde::Serialize>(out: &mut String, key: &str, value: &T) {
    if let Ok(json) = serde_json::to_string(value) {
        out.push(',');
        write_str(out, key);
        out.push(':');
        out.push_str(&json);
    }
}

fn write_field(out: &mut String, key: &str, value: &Value) {
    match value {
        Value::String(s) => {
            out.push(',');
            write_str(out, key);
            out.push(':');
            write_str(out, s);
        }
        Value::Number(n) => {
            out.push(',');
            write_str(out, key);
            let _ = write!(out, ":{}", n);
        }
        Value::Bool(b) => {
            out.push(',');
            write_str(out, key);
            out.push_str(if *b { ":true" } else { ":false" });
        }
        Value::Null => {
            out.push(',');
            write_str(out, key);
            out.push_str(":null");
        }
        Value::Array(_) | Value::Object(_) => write_serialized(out, key, value),
    }
}

/// Write `s` as a JSON string literal.
///
/// Short strings without control characters are copied through with only
/// quotes and backslashes escaped; anything else goes through `serde_json`.
pub fn write_str(out: &mut String, s: &str) {
    if s.len() > FAST_STRING_MAX {
        return write_str_slow(out, s);
    }

    let start = out.len();
    out.push('"');
    let mut last = 0;
    for (i, &b) in s.as_bytes().iter().enumerate() {
        if b < 32 {
            out.truncate(start);
            return write_str_slow(out, s);
        }
        if b == b'"' || b == b'\\' {
            out.push_str(&s[last..i]);
            out.push('\\');
            last = i;
        }
    }
    out.push_str(&s[last..]);
    out.push('"');
}

fn write_str_slow(out: &mut String, s: &str) {
    if let Ok(json) = serde_json::to_string(s) {
        out.push_str(&json);
    }
}
