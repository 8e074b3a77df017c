use thiserror::Error;

use crate::binary::ObjectType;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Unexpected type code {actual}, expected {expected}")]
    UnexpectedType { expected: ObjectType, actual: u8 },

    #[error("Server error (status {status}): {message}")]
    Server { status: i32, message: String },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

impl ClientError {
    pub(crate) fn illegal_argument(message: impl Into<String>) -> Self {
        Self::IllegalArgument(message.into())
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl<T> From<std::sync::PoisonError<T>> for ClientError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
