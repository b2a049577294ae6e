use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq)]
#[error("{self:?}")]
pub enum DecodeError {
    EmptyPayload,
    InvalidUtf8,
    WrongArity { expected: usize, found: usize },
    InvalidNumber(String),
    NonFiniteNumber(String),
    UnknownCharacteristic(Uuid),
    UnknownChannel(String),
}
