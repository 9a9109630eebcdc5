//! Terminal rendering of Cloud Logging JSON lines.
//!
//! [`PrettyFormatter`] turns one line produced by the encoder into a
//! colorized, indented block. Lines that are not JSON objects, or that lack
//! `severity` or `time`, pass through unchanged.

use std::fmt;
use std::io;

use chrono::{DateTime, FixedOffset, Local, TimeZone, Utc};
use colored::{ColoredString, Colorize};
use serde_json::{Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::entry::LOGGING_OPERATION;
use crate::fields::is_truthy;
use crate::severity::DEFAULT_LABEL;

/// Styling applied to a piece of text.
pub type Paint = fn(&str) -> ColoredString;

/// Severity label -> style. Labels not found here use the `DEFAULT` entry.
pub static SEVERITY_COLORS: [(&str, Paint); 9] = [
    (DEFAULT_LABEL, default_style),
    ("DEBUG", debug_style),
    ("INFO", info_style),
    ("NOTICE", info_style),
    ("WARNING", warning_style),
    ("ERROR", error_style),
    ("CRITICAL", critical_style),
    ("ALERT", alert_style),
    ("EMERGENCY", emergency_style),
];

/// Keys rendered in the header line or in their own block.
const STANDARD_KEYS: [&str; 6] = [
    "severity",
    "time",
    "message",
    "err",
    LOGGING_OPERATION,
    "httpRequest",
];

const HTTP_HEADLINE_KEYS: [&str; 2] = ["requestMethod", "requestUrl"];

const INDENT: &str = "    ";
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

fn default_style(s: &str) -> ColoredString {
    s.white()
}

fn debug_style(s: &str) -> ColoredString {
    s.blue()
}

fn info_style(s: &str) -> ColoredString {
    s.green()
}

fn warning_style(s: &str) -> ColoredString {
    s.yellow()
}

fn error_style(s: &str) -> ColoredString {
    s.red()
}

fn critical_style(s: &str) -> ColoredString {
    s.on_red().bright_white()
}

fn alert_style(s: &str) -> ColoredString {
    s.on_red().bright_white().bold().underline()
}

fn emergency_style(s: &str) -> ColoredString {
    s.on_bright_red().bright_white().bold().underline()
}

#[derive(Clone)]
pub struct PrettyFormatter {
    offset: Option<FixedOffset>,
    colors: &'static [(&'static str, Paint)],
}

impl Default for PrettyFormatter {
    fn default() -> Self {
        Self {
            offset: None,
            colors: &SEVERITY_COLORS,
        }
    }
}

impl fmt::Debug for PrettyFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrettyFormatter")
            .field("offset", &self.offset)
            .field("colors", &self.colors.len())
            .finish()
    }
}

impl PrettyFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render times in `offset` instead of the local time zone.
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Replace the severity style table. Must contain a `DEFAULT` entry to
    /// style unknown labels.
    pub fn with_colors(mut self, colors: &'static [(&'static str, Paint)]) -> Self {
        self.colors = colors;
        self
    }

    /// Format one input line (without its line terminator). The result always
    /// ends with `\n`.
    pub fn format_line(&self, line: &str) -> String {
        let entry = match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(entry)) => entry,
            _ => return passthrough(line),
        };
        let (Some(severity), Some(time)) = (
            entry.get("severity").filter(|v| is_truthy(v)),
            entry.get("time").filter(|v| is_truthy(v)),
        ) else {
            return passthrough(line);
        };

        let mut out = format!("{} {} ", self.format_time(time), self.paint_severity(severity));

        if let Some(operation) = entry.get(LOGGING_OPERATION).filter(|v| is_truthy(v)) {
            out.push_str(&format_operation(operation));
        }
        if let Some(message) = entry.get("message").filter(|v| is_truthy(v)) {
            out.push_str(&display(message).cyan().to_string());
        }
        out.push('\n');

        if let Some(Value::Object(request)) = entry.get("httpRequest") {
            out.push_str(&format_http_request(request));
            out.push('\n');
        }

        out.push_str(&value_fields(&entry));
        out
    }

    /// Format every line of `reader` into `writer` until end of input.
    ///
    /// Each write is awaited before the next line is read. Lines that are
    /// not valid UTF-8 are copied through unchanged.
    pub async fn run<R, W>(&self, mut reader: R, mut writer: W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            let line = trim_line_end(&buf);
            match std::str::from_utf8(line) {
                Ok(text) => writer.write_all(self.format_line(text).as_bytes()).await?,
                Err(_) => {
                    writer.write_all(line).await?;
                    writer.write_all(b"\n").await?;
                }
            }
            writer.flush().await?;
        }
        Ok(())
    }

    fn paint_severity(&self, severity: &Value) -> ColoredString {
        let label = display(severity);
        let paint = self
            .colors
            .iter()
            .find(|(l, _)| *l == label)
            .or_else(|| self.colors.iter().find(|(l, _)| *l == DEFAULT_LABEL))
            .map(|(_, paint)| *paint)
            .unwrap_or(default_style);
        paint(&label)
    }

    fn format_time(&self, time: &Value) -> String {
        let parsed = match time {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            _ => None,
        };
        match parsed {
            Some(dt) => match self.offset {
                Some(offset) => format!("[{}]", dt.with_timezone(&offset).format(TIME_FORMAT)),
                None => format!("[{}]", dt.with_timezone(&Local).format(TIME_FORMAT)),
            },
            None => format!("[{}]", display(time)),
        }
    }
}

fn passthrough(line: &str) -> String {
    let mut out = String::with_capacity(line.len() + 1);
    out.push_str(line);
    out.push('\n');
    out
}

fn trim_line_end(buf: &[u8]) -> &[u8] {
    match buf.strip_suffix(b"\n") {
        Some(line) => line.strip_suffix(b"\r").unwrap_or(line),
        None => buf,
    }
}

/// Strings without their quotes, everything else as compact JSON.
fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Indent every line after the first by four spaces.
pub fn with_spaces(value: &str) -> String {
    value
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                line.to_string()
            } else {
                format!("{INDENT}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn value_fields(entry: &Map<String, Value>) -> String {
    let mut out = String::new();
    for (key, value) in entry {
        // A non-object httpRequest has no block of its own.
        let rendered_above =
            STANDARD_KEYS.contains(&key.as_str()) && (key != "httpRequest" || value.is_object());
        if rendered_above {
            continue;
        }
        let body = match (key.as_str(), value) {
            ("stack", Value::String(stack)) => with_spaces(stack),
            _ => with_spaces(&pretty_json(value)),
        };
        out.push_str(&format!("{INDENT}{}: {}\n", key.cyan(), body));
    }
    out
}

/// `(producer:id first,last) `, or nothing when the operation carries none
/// of these.
fn format_operation(operation: &Value) -> String {
    let truthy = |key: &str| operation.get(key).map(is_truthy).unwrap_or(false);

    let id = ["producer", "id"]
        .iter()
        .filter_map(|key| operation.get(*key).filter(|v| is_truthy(v)))
        .map(display)
        .collect::<Vec<_>>()
        .join(":");
    let flags = ["first", "last"]
        .iter()
        .filter(|key| truthy(key))
        .copied()
        .collect::<Vec<_>>()
        .join(",");

    let mut parts = Vec::new();
    if !id.is_empty() {
        parts.push(id.green().to_string());
    }
    if !flags.is_empty() {
        parts.push(flags.blue().to_string());
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!("({}) ", parts.join(" "))
    }
}

fn status_style(request: &Map<String, Value>) -> Paint {
    let status = request.get("status").and_then(|s| match s {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    });
    match status {
        Some(code) if (400.0..500.0).contains(&code) => warning_style,
        Some(code) if code >= 500.0 => error_style,
        _ => info_style,
    }
}

fn format_http_request(request: &Map<String, Value>) -> String {
    let headline = HTTP_HEADLINE_KEYS
        .iter()
        .filter_map(|key| request.get(*key).filter(|v| is_truthy(v)))
        .map(display)
        .collect::<Vec<_>>()
        .join(" ");
    let rest = request
        .iter()
        .filter(|(key, _)| !HTTP_HEADLINE_KEYS.contains(&key.as_str()))
        .map(|(key, value)| format!("  {}: {}", key.cyan(), with_spaces(&pretty_json(value))))
        .collect::<Vec<_>>()
        .join("\n");

    let mut out = format!("{INDENT}{}\n", status_style(request)(&headline));
    if !rest.is_empty() {
        out.push_str(&format!("{INDENT}{}\n", with_spaces(&rest)));
    }
    out
}
