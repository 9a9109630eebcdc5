/// Errors surfaced while constructing a logger or installing the layer.
///
/// Nothing in this crate returns an error from an individual log call; a
/// record that cannot be written is dropped.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("cannot determine service context name: {0}")]
    ServiceContext(String),

    #[error("invalid log level: {0}")]
    InvalidLevel(String),

    #[error("failed to set global subscriber: {0}")]
    SetGlobalDefault(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
