//! Errors raised by the bounded reader.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IoError {
    #[error("file is {found} bytes, larger than the {limit} byte inspection limit")]
    FileTooLarge { limit: u64, found: u64 },

    #[error("read budget of {limit} bytes exhausted ({current} bytes already read)")]
    ReadLimitExceeded { limit: u64, current: u64 },

    #[error(transparent)]
    StdIo(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IoError>;
