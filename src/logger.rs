use chrono::Utc;
use std::fmt;
use std::io::Write;
use std::panic::Location;
use std::sync::Arc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;

use crate::encoder::{Encode, StackdriverEncoder};
use crate::entry::{Operation, ServiceContext, SourceLocation};
use crate::env;
use crate::error::Result;
use crate::fields::Fields;
use crate::record::{LogArgs, Record};
use crate::severity::{Level, LevelFilter};

/// Source of record timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clock {
    #[default]
    System,
    /// Always returns the given epoch milliseconds.
    Fixed(i64),
}

impl Clock {
    pub fn now_millis(&self) -> i64 {
        match self {
            Clock::System => Utc::now().timestamp_millis(),
            Clock::Fixed(ms) => *ms,
        }
    }
}

struct Shared {
    encoder: Box<dyn Encode>,
    writer: BoxMakeWriter,
    clock: Clock,
    source_location: bool,
    service_context: Option<ServiceContext>,
}

/// Leveled logger writing one encoded line per call to its sink.
///
/// Handles are cheap to clone. [`child`](Logger::child) and
/// [`operation`](Logger::operation) derive handles that carry extra bound
/// state; the encoder, sink and clock are shared by all of them.
///
/// Logging never fails: records that cannot be written are dropped.
#[derive(Clone)]
pub struct Logger {
    shared: Arc<Shared>,
    filter: LevelFilter,
    bindings: Fields,
    pub(crate) operation: Option<Operation>,
}

impl Logger {
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::default()
    }

    pub fn level(&self) -> LevelFilter {
        self.filter
    }

    pub fn set_level(&mut self, filter: impl Into<LevelFilter>) {
        self.filter = filter.into();
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.filter.enabled(level)
    }

    pub fn service_context(&self) -> Option<&ServiceContext> {
        self.shared.service_context.as_ref()
    }

    pub fn bindings(&self) -> &Fields {
        &self.bindings
    }

    /// Derive a handle whose records all carry `bindings`. Keys bound here
    /// replace keys of the same name bound by ancestors.
    pub fn child(&self, bindings: Fields) -> Logger {
        let mut child = self.clone();
        child.bindings.extend(&bindings);
        child
    }

    /// Encode a call without writing it. Returns `None` when the level is
    /// filtered out.
    #[track_caller]
    pub fn render(&self, level: Level, args: impl Into<LogArgs>) -> Option<String> {
        if !self.enabled(level) {
            return None;
        }
        Some(self.encode(level, args.into(), Location::caller()))
    }

    #[track_caller]
    pub fn log(&self, level: Level, args: impl Into<LogArgs>) {
        if !self.enabled(level) {
            return;
        }
        let line = self.encode(level, args.into(), Location::caller());
        let mut writer = self.shared.writer.make_writer();
        let _ = writer.write_all(line.as_bytes());
    }

    fn encode(&self, level: Level, mut args: LogArgs, caller: &Location<'_>) -> String {
        args.interpolate();
        let operation = self.operation_for(&mut args);

        let mut record = Record::new(level, self.shared.clock.now_millis(), args, &self.bindings);
        record.operation = operation;
        if self.shared.source_location {
            record.source_location = Some(SourceLocation::from_caller(caller));
        }
        self.shared.encoder.encode(&record)
    }

    #[track_caller]
    pub fn trace(&self, args: impl Into<LogArgs>) {
        self.log(Level::Trace, args)
    }

    #[track_caller]
    pub fn debug(&self, args: impl Into<LogArgs>) {
        self.log(Level::Debug, args)
    }

    #[track_caller]
    pub fn info(&self, args: impl Into<LogArgs>) {
        self.log(Level::Info, args)
    }

    #[track_caller]
    pub fn notice(&self, args: impl Into<LogArgs>) {
        self.log(Level::Notice, args)
    }

    #[track_caller]
    pub fn warn(&self, args: impl Into<LogArgs>) {
        self.log(Level::Warn, args)
    }

    #[track_caller]
    pub fn error(&self, args: impl Into<LogArgs>) {
        self.log(Level::Error, args)
    }

    #[track_caller]
    pub fn critical(&self, args: impl Into<LogArgs>) {
        self.log(Level::Critical, args)
    }

    /// Alias of [`critical`](Logger::critical).
    #[track_caller]
    pub fn fatal(&self, args: impl Into<LogArgs>) {
        self.log(Level::Critical, args)
    }

    #[track_caller]
    pub fn alert(&self, args: impl Into<LogArgs>) {
        self.log(Level::Alert, args)
    }

    #[track_caller]
    pub fn emergency(&self, args: impl Into<LogArgs>) {
        self.log(Level::Emergency, args)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("filter", &self.filter)
            .field("bindings", &self.bindings)
            .field("operation", &self.operation)
            .field("clock", &self.shared.clock)
            .finish()
    }
}

/// Configuration for a [`Logger`].
///
/// Unset options fall back to the environment: the level comes from
/// `LOG_LEVEL` and the service context from `SERVICE_NAME` / `VERSION` (see
/// [`env`](crate::env)). Output goes to stdout unless a writer is given.
#[derive(Default)]
pub struct LoggerBuilder {
    level: Option<LevelFilter>,
    service_context: Option<ServiceContext>,
    service_name: Option<String>,
    base: Fields,
    encoder: Option<Box<dyn Encode>>,
    writer: Option<BoxMakeWriter>,
    clock: Clock,
    source_location: bool,
}

impl LoggerBuilder {
    pub fn level(mut self, filter: impl Into<LevelFilter>) -> Self {
        self.level = Some(filter.into());
        self
    }

    pub fn service_context(mut self, service_context: ServiceContext) -> Self {
        self.service_context = Some(service_context);
        self
    }

    /// Service name to use when no full service context is given.
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Fields bound to every record of the root logger.
    pub fn base(mut self, base: Fields) -> Self {
        self.base = base;
        self
    }

    /// Replace the Cloud Logging encoder.
    pub fn encoder(mut self, encoder: impl Encode + 'static) -> Self {
        self.encoder = Some(Box::new(encoder));
        self
    }

    pub fn writer<M>(mut self, make_writer: M) -> Self
    where
        M: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        self.writer = Some(BoxMakeWriter::new(make_writer));
        self
    }

    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Record the caller's file and line as
    /// `logging.googleapis.com/sourceLocation`.
    pub fn source_location(mut self, enabled: bool) -> Self {
        self.source_location = enabled;
        self
    }

    /// Build the logger. Fails when the level in the environment is invalid
    /// or no service name can be determined.
    pub fn build(self) -> Result<Logger> {
        let filter = match self.level {
            Some(filter) => filter,
            None => env::level_from_env()?,
        };

        let (encoder, service_context): (Box<dyn Encode>, _) = match self.encoder {
            Some(encoder) => (encoder, self.service_context),
            None => {
                let ctx = match self.service_context {
                    Some(ctx) => ctx,
                    None => env::default_service_context(self.service_name.as_deref())?,
                };
                (Box::new(StackdriverEncoder::with_service_context(ctx.clone())), Some(ctx))
            }
        };

        let writer = self
            .writer
            .unwrap_or_else(|| BoxMakeWriter::new(std::io::stdout));

        Ok(Logger {
            shared: Arc::new(Shared {
                encoder,
                writer,
                clock: self.clock,
                source_location: self.source_location,
                service_context,
            }),
            filter,
            bindings: self.base,
            operation: None,
        })
    }
}
