//! Binding of long-running operation metadata to logger handles.

use crate::entry::Operation;
use crate::fields::{is_truthy, Fields};
use crate::logger::Logger;
use crate::record::{LogArgs, Payload};

impl Logger {
    /// Derive a handle whose records all carry `operation` under
    /// `logging.googleapis.com/operation`.
    ///
    /// Handles can be derived from each other; fields set by the inner
    /// operation replace those of the outer one. A truthy `first` or `last`
    /// field in a call's payload is moved into the operation metadata of
    /// that record.
    pub fn operation(&self, operation: Operation) -> Logger {
        let mut merged = self.operation.clone().unwrap_or_default();
        merged.merge(&operation);
        let mut handle = self.clone();
        handle.operation = Some(merged);
        handle
    }

    /// Operation metadata bound to this handle, if any.
    pub fn bound_operation(&self) -> Option<&Operation> {
        self.operation.as_ref()
    }

    /// Operation metadata for one call. Lifts the `first`/`last` flags out of
    /// the payload.
    pub(crate) fn operation_for(&self, args: &mut LogArgs) -> Option<Operation> {
        let mut operation = self.operation.clone()?;
        if let Payload::Fields(fields) = &mut args.payload {
            operation.merge(&take_flags(fields));
        }
        Some(operation)
    }
}

/// Remove truthy `first` / `last` fields and return them as flags.
pub fn take_flags(fields: &mut Fields) -> Operation {
    Operation {
        first: take_truthy(fields, "first"),
        last: take_truthy(fields, "last"),
        ..Operation::default()
    }
}

fn take_truthy(fields: &mut Fields, key: &str) -> bool {
    if fields.get(key).map(is_truthy).unwrap_or(false) {
        fields.remove(key);
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{ServiceContext, LOGGING_OPERATION};
    use crate::logger::Clock;
    use crate::severity::Level;
    use serde_json::{json, Value};

    fn logger() -> Logger {
        Logger::builder()
            .level(Level::Info)
            .service_context(ServiceContext::new("test", "1.0.0"))
            .clock(Clock::Fixed(1536248050595))
            .writer(std::io::sink)
            .build()
            .unwrap()
    }

    #[test]
    fn first_and_last_move_into_operation() {
        let op = logger().operation(Operation::new("100", "se.example.test"));

        let start = op.render(Level::Info, (crate::fields! { "first" => true }, "Start of operation")).unwrap();
        let middle = op.render(Level::Info, "Middle of operation").unwrap();
        let end = op.render(Level::Info, (crate::fields! { "last" => true }, "End of operation")).unwrap();

        assert_eq!(
            start,
            "{\"severity\":\"INFO\",\"time\":1536248050595,\"message\":\"Start of operation\",\
             \"logging.googleapis.com/operation\":{\"id\":\"100\",\"producer\":\"se.example.test\",\"first\":true}}\n"
        );
        assert_eq!(
            middle,
            "{\"severity\":\"INFO\",\"time\":1536248050595,\"message\":\"Middle of operation\",\
             \"logging.googleapis.com/operation\":{\"id\":\"100\",\"producer\":\"se.example.test\"}}\n"
        );
        assert_eq!(
            end,
            "{\"severity\":\"INFO\",\"time\":1536248050595,\"message\":\"End of operation\",\
             \"logging.googleapis.com/operation\":{\"id\":\"100\",\"producer\":\"se.example.test\",\"last\":true}}\n"
        );
    }

    #[test]
    fn flags_are_per_call() {
        let op = logger().operation(Operation::with_id("job-1"));
        op.render(Level::Info, crate::fields! { "first" => true }).unwrap();
        let next = op.render(Level::Info, "again").unwrap();
        assert!(!next.contains("first"));
        assert!(!op.bound_operation().unwrap().first);
    }

    #[test]
    fn falsy_flags_stay_in_the_payload() {
        let op = logger().operation(Operation::with_id("job-1"));
        let line = op.render(Level::Info, crate::fields! { "first" => false }).unwrap();
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["first"], false);
        assert_eq!(parsed[LOGGING_OPERATION], json!({"id": "job-1"}));
    }

    #[test]
    fn nested_operations_merge_into_a_single_key() {
        let outer = logger().operation(Operation::new("outer", "producer"));
        let inner = outer.operation(Operation::with_id("inner"));
        let line = inner.render(Level::Info, (crate::fields! { "last" => true }, "done")).unwrap();
        assert_eq!(line.matches(LOGGING_OPERATION).count(), 1);
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(
            parsed[LOGGING_OPERATION],
            json!({"id": "inner", "producer": "producer", "last": true})
        );
        assert!(parsed.get("last").is_none());
    }

    #[test]
    fn plain_loggers_leave_flags_alone() {
        let line = logger().render(Level::Info, crate::fields! { "first" => true }).unwrap();
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["first"], true);
        assert!(parsed.get(LOGGING_OPERATION).is_none());
    }

    #[test]
    fn operation_survives_child_bindings() {
        let op = logger()
            .operation(Operation::with_id("job-2"))
            .child(crate::fields! { "worker" => 3 });
        let line = op.render(Level::Info, "tick").unwrap();
        assert_eq!(
            line,
            "{\"severity\":\"INFO\",\"time\":1536248050595,\"message\":\"tick\",\
             \"logging.googleapis.com/operation\":{\"id\":\"job-2\"},\"worker\":3}\n"
        );
    }
}
