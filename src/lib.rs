//! Structured logging for Google Cloud Logging.
//!
//! Records are written as one JSON object per line in the shape the Cloud
//! Logging agent understands: `severity`, `time`, `message`, error stacks with
//! `serviceContext` for Error Reporting, and the special
//! `logging.googleapis.com/*` keys.
//!
//! Two front ends share the same [`StackdriverEncoder`]:
//! - [`Logger`], a cloneable handle with level methods and bound fields;
//! - [`StackdriverLayer`], a `tracing-subscriber` layer.
//!
//! With the `pretty` feature the crate also ships the `stackdriver-pretty`
//! binary, which renders those lines for a terminal.

pub mod encoder;
pub mod entry;
pub mod env;
pub mod error;
pub mod error_record;
pub mod fields;
pub mod init;
pub mod layer;
pub mod logger;
pub mod operation;
pub mod record;
pub mod severity;

#[cfg(feature = "pretty")]
pub mod pretty;

pub use encoder::{Encode, StackdriverEncoder};
pub use entry::{HttpRequest, Operation, ServiceContext, SourceLocation};
pub use error::{Error, Result};
pub use error_record::ErrorRecord;
pub use fields::Fields;
pub use init::{init_tracing, init_tracing_with_config, LayerConfig};
pub use layer::StackdriverLayer;
pub use logger::{Clock, Logger, LoggerBuilder};
pub use record::{LogArgs, Message, Payload, Record};
pub use severity::{Level, LevelFilter, Severity};
