//! Errors raised while presenting a script on a widget.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApplyError {
    #[error("an update is still being applied")]
    Busy,

    #[error("widget dropped the update transaction before finishing it")]
    TransactionDropped,

    #[error("configuration error: {0}")]
    Config(String),
}

pub type ApplyResult<T> = Result<T, ApplyError>;
