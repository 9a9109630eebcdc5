use serde::Serialize;
use serde_json::Value;

use crate::entry::{Operation, SourceLocation};
use crate::error_record::ErrorRecord;
use crate::fields::Fields;
use crate::severity::Level;

/// First positional argument of a log call.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    #[default]
    None,
    Fields(Fields),
    /// The error itself is the payload; its class name is written as `type`.
    Error(ErrorRecord),
}

/// Second positional argument of a log call (or the first one when it is a
/// plain string).
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Message {
    #[default]
    None,
    Text(String),
    /// An error in message position; its full stack becomes the message.
    Error(ErrorRecord),
}

/// Arguments of a single log call.
///
/// Built through `From` conversions mirroring the accepted call shapes:
/// `"msg"`, `fields`, `err`, `(fields, "msg")`, `(fields, err)`,
/// `(err, "msg")` and `(err, err)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogArgs {
    pub payload: Payload,
    pub message: Message,
    pub args: Vec<Value>,
}

impl LogArgs {
    pub fn new(payload: Payload, message: Message) -> Self {
        Self {
            payload,
            message,
            args: Vec::new(),
        }
    }

    /// Extra positional arguments interpolated into a text message with
    /// printf-style placeholders (`%s %d %i %f %j %o %O`).
    pub fn args<I, T>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Serialize,
    {
        self.args
            .extend(args.into_iter().map(|a| serde_json::to_value(a).unwrap_or(Value::Null)));
        self
    }

    /// Apply the positional arguments to a text message.
    pub(crate) fn interpolate(&mut self) {
        if self.args.is_empty() {
            return;
        }
        if let Message::Text(text) = &self.message {
            self.message = Message::Text(format_message(text, &self.args));
        }
        self.args.clear();
    }
}

impl From<&str> for LogArgs {
    fn from(msg: &str) -> Self {
        LogArgs::new(Payload::None, Message::Text(msg.to_string()))
    }
}

impl From<String> for LogArgs {
    fn from(msg: String) -> Self {
        LogArgs::new(Payload::None, Message::Text(msg))
    }
}

impl From<Fields> for LogArgs {
    fn from(fields: Fields) -> Self {
        LogArgs::new(Payload::Fields(fields), Message::None)
    }
}

impl From<ErrorRecord> for LogArgs {
    fn from(err: ErrorRecord) -> Self {
        LogArgs::new(Payload::Error(err), Message::None)
    }
}

impl From<(Fields, &str)> for LogArgs {
    fn from((fields, msg): (Fields, &str)) -> Self {
        LogArgs::new(Payload::Fields(fields), Message::Text(msg.to_string()))
    }
}

impl From<(Fields, String)> for LogArgs {
    fn from((fields, msg): (Fields, String)) -> Self {
        LogArgs::new(Payload::Fields(fields), Message::Text(msg))
    }
}

impl From<(Fields, ErrorRecord)> for LogArgs {
    fn from((fields, err): (Fields, ErrorRecord)) -> Self {
        LogArgs::new(Payload::Fields(fields), Message::Error(err))
    }
}

impl From<(ErrorRecord, &str)> for LogArgs {
    fn from((err, msg): (ErrorRecord, &str)) -> Self {
        LogArgs::new(Payload::Error(err), Message::Text(msg.to_string()))
    }
}

impl From<(ErrorRecord, String)> for LogArgs {
    fn from((err, msg): (ErrorRecord, String)) -> Self {
        LogArgs::new(Payload::Error(err), Message::Text(msg))
    }
}

impl From<(ErrorRecord, ErrorRecord)> for LogArgs {
    fn from((err, msg): (ErrorRecord, ErrorRecord)) -> Self {
        LogArgs::new(Payload::Error(err), Message::Error(msg))
    }
}

/// Everything the encoder needs for one line. Exists for the duration of a
/// single encode call.
#[derive(Debug, Clone)]
pub struct Record<'a> {
    pub level: Level,
    /// Epoch milliseconds.
    pub time: i64,
    pub payload: Payload,
    pub message: Message,
    /// Persistent fields bound by the emitting logger handle.
    pub bindings: &'a Fields,
    pub operation: Option<Operation>,
    pub source_location: Option<SourceLocation>,
}

impl<'a> Record<'a> {
    pub fn new(level: Level, time: i64, args: LogArgs, bindings: &'a Fields) -> Self {
        Self {
            level,
            time,
            payload: args.payload,
            message: args.message,
            bindings,
            operation: None,
            source_location: None,
        }
    }
}

/// printf-style interpolation. Placeholders without a matching argument are
/// left as-is and surplus arguments are ignored.
pub fn format_message(fmt: &str, args: &[Value]) -> String {
    let mut out = String::with_capacity(fmt.len());
    let mut args = args.iter();
    let mut chars = fmt.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let Some(&spec) = chars.peek() else {
            out.push('%');
            break;
        };
        if spec == '%' {
            chars.next();
            out.push('%');
            continue;
        }
        if !matches!(spec, 's' | 'd' | 'i' | 'f' | 'j' | 'o' | 'O') {
            out.push('%');
            continue;
        }
        chars.next();
        let Some(arg) = args.next() else {
            out.push('%');
            out.push(spec);
            continue;
        };
        match spec {
            's' => match arg {
                Value::String(s) => out.push_str(s),
                other => out.push_str(&other.to_string()),
            },
            'd' | 'f' => {
                if arg.is_i64() || arg.is_u64() {
                    out.push_str(&arg.to_string());
                } else if let Some(n) = arg.as_f64() {
                    out.push_str(&n.to_string());
                } else {
                    out.push_str("NaN");
                }
            }
            'i' => match arg.as_f64() {
                Some(n) => out.push_str(&(n.trunc() as i64).to_string()),
                None => out.push_str("NaN"),
            },
            _ => out.push_str(&arg.to_string()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_shapes_resolve_to_positions() {
        let args: LogArgs = "hello".into();
        assert_eq!(args.payload, Payload::None);
        assert_eq!(args.message, Message::Text("hello".into()));

        let err = ErrorRecord::new("E", "boom");
        let args: LogArgs = (Fields::new(), err.clone()).into();
        assert_eq!(args.message, Message::Error(err.clone()));

        let args: LogArgs = (err.clone(), "context").into();
        assert_eq!(args.payload, Payload::Error(err));
    }

    #[test]
    fn placeholders_are_filled_in_order() {
        let args = [json!("alice"), json!(3), json!({"a": 1})];
        assert_eq!(
            format_message("user %s has %d items: %j", &args),
            r#"user alice has 3 items: {"a":1}"#
        );
    }

    #[test]
    fn missing_and_surplus_arguments() {
        assert_eq!(format_message("%s and %s", &[json!("one")]), "one and %s");
        assert_eq!(format_message("plain", &[json!(1), json!(2)]), "plain");
        assert_eq!(format_message("100%% of %d%", &[json!(5)]), "100% of 5%");
        assert_eq!(format_message("%x %i", &[json!(2.9)]), "%x 2");
        assert_eq!(format_message("%d", &[json!("nope")]), "NaN");
        assert_eq!(format_message("%f", &[json!(1.5)]), "1.5");
    }

    #[test]
    fn interpolate_only_touches_text_messages() {
        let mut args = LogArgs::from("count=%d").args([7]);
        args.interpolate();
        assert_eq!(args.message, Message::Text("count=7".into()));
        assert!(args.args.is_empty());
    }
}
