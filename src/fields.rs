use serde::Serialize;
use serde_json::{Map, Value};

use crate::error_record::ErrorRecord;

/// Structured payload of a log call.
///
/// An insertion-ordered JSON object plus an optional embedded error (the
/// `err` slot). Field order is preserved all the way to the output line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    map: Map<String, Value>,
    err: Option<ErrorRecord>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build fields from any value serializing to a JSON object.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Option<Self> {
        match serde_json::to_value(value) {
            Ok(Value::Object(map)) => Some(Self::from(map)),
            _ => None,
        }
    }

    /// Insert a field. A value that fails to serialize is dropped, the call
    /// never fails.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Serialize) {
        if let Ok(value) = serde_json::to_value(value) {
            self.map.insert(key.into(), value);
        }
    }

    /// Insert a field only when `value` is `Some`.
    pub fn insert_opt<T: Serialize>(&mut self, key: impl Into<String>, value: Option<T>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.insert(key, value);
        self
    }

    pub fn with_opt<T: Serialize>(mut self, key: impl Into<String>, value: Option<T>) -> Self {
        self.insert_opt(key, value);
        self
    }

    /// Embed an error in the payload. Its stack is written as `stack` (or
    /// as the message when there is no other message) and its properties
    /// are merged into the record.
    pub fn with_error(mut self, err: ErrorRecord) -> Self {
        self.err = Some(err);
        self
    }

    pub fn set_error(&mut self, err: ErrorRecord) {
        self.err = Some(err);
    }

    pub fn error(&self) -> Option<&ErrorRecord> {
        self.err.as_ref()
    }

    pub fn take_error(&mut self) -> Option<ErrorRecord> {
        self.err.take()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.map.get(key)
    }

    /// Remove a field, keeping the order of the remaining ones.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.map.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.map.iter()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty() && self.err.is_none()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.map
    }

    /// Overlay `other` on top of `self`; keys of `other` win.
    pub fn extend(&mut self, other: &Fields) {
        for (k, v) in other.map.iter() {
            self.map.insert(k.clone(), v.clone());
        }
        if let Some(err) = &other.err {
            self.err = Some(err.clone());
        }
    }
}

impl From<Map<String, Value>> for Fields {
    fn from(map: Map<String, Value>) -> Self {
        Self { map, err: None }
    }
}

impl FromIterator<(String, Value)> for Fields {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Map<String, Value>>())
    }
}

/// Build [`Fields`] from `key => value` pairs.
///
/// ```
/// let f = stackdriver_log::fields! { "userId" => 42, "name" => "alice" };
/// assert_eq!(f.len(), 2);
/// ```
#[macro_export]
macro_rules! fields {
    () => { $crate::fields::Fields::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::fields::Fields::new()$(.with($key, $value))+
    };
}

/// JavaScript-style truthiness of a JSON value.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_insertion_order() {
        let f = crate::fields! { "zeta" => 1, "alpha" => 2, "mid" => 3 };
        let keys: Vec<&str> = f.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn remove_keeps_order_of_rest() {
        let mut f = crate::fields! { "a" => 1, "b" => 2, "c" => 3 };
        assert_eq!(f.remove("b"), Some(json!(2)));
        let keys: Vec<&str> = f.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["a", "c"]);
    }

    #[test]
    fn none_values_are_omitted() {
        let f = Fields::new().with_opt("a", None::<u32>).with_opt("b", Some("x"));
        assert_eq!(f.as_map(), json!({"b": "x"}).as_object().unwrap());
    }

    #[test]
    fn unserializable_values_are_dropped() {
        struct Broken;
        impl Serialize for Broken {
            fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
                Err(serde::ser::Error::custom("nope"))
            }
        }
        let f = Fields::new().with("ok", 1).with("broken", Broken);
        assert_eq!(f.len(), 1);
        assert!(!f.contains_key("broken"));
    }

    #[test]
    fn from_serialize_requires_an_object() {
        #[derive(Serialize)]
        struct Payload {
            id: u32,
        }
        assert_eq!(Fields::from_serialize(&Payload { id: 3 }).unwrap().get("id"), Some(&json!(3)));
        assert!(Fields::from_serialize(&[1, 2]).is_none());
    }

    #[test]
    fn truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!({})));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!(true)));
    }
}
