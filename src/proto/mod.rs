use std::time::Duration;

use thiserror::Error;

pub mod codec;
pub mod command;
pub mod response;

#[cfg(test)]
pub(crate) mod fake;

pub type Result<T> = std::result::Result<T, ProtoError>;

#[derive(Error, Debug)]
pub enum ProtoError {
    #[error("Device unreachable: {0}")]
    DeviceUnreachable(#[from] tokio_serial::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No reply within {0:?}")]
    Timeout(Duration),
    #[error("Connection closed while waiting for a reply")]
    Abort,
    #[error("Unexpected reply {reply:?} to command {command:?}")]
    Protocol { command: String, reply: String },
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Device not ready after {0:?}")]
    NotReady(Duration),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<figment::Error> for ProtoError {
    fn from(err: figment::Error) -> Self {
        Self::Config(err.to_string())
    }
}
