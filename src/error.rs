//! Binary Error Types

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("invalid configuration: {_0}")]
    Config(#[error(not(source))] String),
    #[display("{_0}")]
    Store(#[error(not(source))] String),
    #[display("{_0}")]
    Request(#[error(not(source))] String),
    #[display("failed to write output")]
    Output,
}
