//! Error and Result types for the cwdaemon-rs crate.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("device error: {0}")]
    Device(String),

    #[error("tone engine error: {0}")]
    ToneEngine(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, Error>;
