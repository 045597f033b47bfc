use mongodb::error::{ErrorKind, WriteFailure};
use thiserror::Error;

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("duplicate key: {0}")]
    DuplicateKey(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store call timed out")]
    Timeout,
    #[error("store error: {0}")]
    Backend(#[from] eyre::Error),
}

impl StoreError {
    /// Stable tag for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::DuplicateKey(_) => "duplicate_key",
            StoreError::Unavailable(_) => "unavailable",
            StoreError::Timeout => "timeout",
            StoreError::Backend(_) => "backend",
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::DuplicateKey(_))
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        match err.kind.as_ref() {
            ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY_CODE => {
                StoreError::DuplicateKey(duplicate_field(&write.message).to_owned())
            }
            ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Backend(err.into()),
        }
    }
}

/// Picks the offending field out of a server duplicate-key message.
pub(crate) fn duplicate_field(message: &str) -> &'static str {
    if message.contains("email") {
        "email"
    } else if message.contains("national_id") {
        "national_id"
    } else if message.contains("student_id") {
        "student_id_date"
    } else {
        "key"
    }
}
