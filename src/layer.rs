use std::io::{self, Write};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record as SpanValues};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use crate::encoder::{Encode, StackdriverEncoder};
use crate::entry::{Operation, ServiceContext, SourceLocation};
use crate::error_record::ErrorRecord;
use crate::fields::Fields;
use crate::logger::Clock;
use crate::operation::take_flags;
use crate::record::{LogArgs, Message, Payload, Record};
use crate::severity::{Level, Severity};

/// `tracing_subscriber` layer that encodes every event it observes as one
/// Cloud Logging JSON line and writes it to a [`MakeWriter`].
///
/// Mapping from `tracing`:
/// - the `message` field is the message;
/// - a field recorded as an error
///   (`error = &err as &(dyn Error + 'static)`) is the record's error, its
///   `source()` chain becomes `caused by:` sections;
/// - a `severity` field holding a label (`"NOTICE"`, `"ALERT"`, ...)
///   overrides the event level;
/// - span fields are bound to every event inside the span, inner spans
///   win;
/// - spans with `operation.id` / `operation.producer` fields mark an
///   operation, and `first` / `last` event fields inside them become
///   operation flags.
pub struct StackdriverLayer<W = fn() -> io::Stdout> {
    encoder: Arc<dyn Encode>,
    make_writer: W,
    clock: Clock,
    source_location: bool,
}

impl StackdriverLayer {
    /// Layer writing to stdout. `service_context` is attached to records
    /// that error reporting should pick up.
    pub fn new(service_context: Option<ServiceContext>) -> Self {
        let encoder = match service_context {
            Some(ctx) => StackdriverEncoder::with_service_context(ctx),
            None => StackdriverEncoder::new(),
        };
        Self {
            encoder: Arc::new(encoder),
            make_writer: io::stdout,
            clock: Clock::System,
            source_location: false,
        }
    }
}

impl<W> StackdriverLayer<W> {
    pub fn with_writer<W2>(self, make_writer: W2) -> StackdriverLayer<W2>
    where
        W2: for<'a> MakeWriter<'a> + 'static,
    {
        StackdriverLayer {
            encoder: self.encoder,
            make_writer,
            clock: self.clock,
            source_location: self.source_location,
        }
    }

    pub fn with_encoder(mut self, encoder: impl Encode + 'static) -> Self {
        self.encoder = Arc::new(encoder);
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Write the event's file, line and target as
    /// `logging.googleapis.com/sourceLocation`.
    pub fn with_source_location(mut self, enabled: bool) -> Self {
        self.source_location = enabled;
        self
    }
}

impl<S, W> Layer<S> for StackdriverLayer<W>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    W: for<'a> MakeWriter<'a> + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);
        span.extensions_mut().insert(visitor);
    }

    fn on_record(&self, id: &Id, values: &SpanValues<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        if let Some(visitor) = extensions.get_mut::<FieldVisitor>() {
            values.record(visitor);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();

        let mut bindings = Fields::new();
        let mut operation: Option<Operation> = None;
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                let extensions = span.extensions();
                if let Some(recorded) = extensions.get::<FieldVisitor>() {
                    bindings.extend(&recorded.fields);
                    if let Some(op) = &recorded.operation {
                        operation.get_or_insert_with(Operation::default).merge(op);
                    }
                }
            }
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let level = visitor
            .severity
            .map(Level::from)
            .unwrap_or_else(|| Level::from(*meta.level()));

        let mut fields = visitor.fields;
        if let Some(op) = visitor.operation.as_ref() {
            operation.get_or_insert_with(Operation::default).merge(op);
        }
        if let Some(op) = operation.as_mut() {
            op.merge(&take_flags(&mut fields));
        }
        if let Some(err) = visitor.error {
            fields.set_error(err);
        }

        let payload = if fields.is_empty() {
            Payload::None
        } else {
            Payload::Fields(fields)
        };
        let message = visitor.message.map(Message::Text).unwrap_or_default();

        let mut record = Record::new(
            level,
            self.clock.now_millis(),
            LogArgs::new(payload, message),
            &bindings,
        );
        record.operation = operation;
        if self.source_location {
            record.source_location = Some(SourceLocation {
                file: meta.file().map(str::to_string),
                line: meta.line(),
                function: Some(meta.target().to_string()),
            });
        }

        let line = self.encoder.encode(&record);
        let mut writer = self.make_writer.make_writer_for(meta);
        let _ = writer.write_all(line.as_bytes());
    }
}

/// Collects `tracing` field values into record parts. Also stored in span
/// extensions to hold a span's bound fields.
#[derive(Debug, Default)]
pub struct FieldVisitor {
    pub fields: Fields,
    pub message: Option<String>,
    pub severity: Option<Severity>,
    pub error: Option<ErrorRecord>,
    pub operation: Option<Operation>,
}

impl FieldVisitor {
    fn operation_mut(&mut self) -> &mut Operation {
        self.operation.get_or_insert_with(Operation::default)
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            "operation.id" => self.operation_mut().id = Some(value.to_string()),
            "operation.producer" => self.operation_mut().producer = Some(value.to_string()),
            "severity" => match Severity::from_label(&value.to_ascii_uppercase()) {
                Some(severity) => self.severity = Some(severity),
                None => self.fields.insert("severityLabel", value),
            },
            name => self.fields.insert(name, value),
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name(), value);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name(), value);
    }

    fn record_i128(&mut self, field: &Field, value: i128) {
        self.fields.insert(field.name(), value);
    }

    fn record_u128(&mut self, field: &Field, value: u128) {
        self.fields.insert(field.name(), value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name(), value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name(), value);
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        if self.error.is_none() {
            self.error = Some(ErrorRecord::from_dyn(value));
        } else {
            self.fields.insert(field.name(), value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            // `info!("...")` records its message as `fmt::Arguments`.
            "message" => self.message = Some(format!("{:?}", value)),
            "operation.id" | "operation.producer" | "severity" => {
                let text = format!("{:?}", value);
                self.record_str(field, text.trim_matches('"'));
            }
            name => self.fields.insert(name, format!("{:?}", value)),
        }
    }
}
