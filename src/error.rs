//! Error taxonomy shared by every component.
//!
//! Unauthorized reads are reported as [`ServiceError::NotFound`] so that the
//! existence of a private deck is never confirmed to someone who cannot see it.

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid token")]
    InvalidCredential,

    #[error("field is empty or invalid: {0}")]
    BadRequest(String),

    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("account already subscribed to this deck")]
    AlreadySubscribed,

    #[error("account isn't subscribed to this deck")]
    NotSubscribed,

    #[error("operation cancelled: deadline exceeded")]
    Cancelled,

    #[error("storage error: {0}")]
    Storage(rusqlite::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ServiceError>;

impl ServiceError {
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest(reason.into())
    }

    /// True for failures the caller cannot fix by changing its request.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Internal(_))
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::OperationInterrupted => {
                Self::Cancelled
            }
            _ => Self::Storage(err),
        }
    }
}

/// Kind of constraint a failed statement tripped over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Constraint {
    Unique,
    ForeignKey,
}

/// Classify a SQLite constraint violation, if `err` is one.
pub(crate) fn constraint_violation(err: &rusqlite::Error) -> Option<Constraint> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            match e.extended_code {
                rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY => Some(Constraint::Unique),
                rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(Constraint::ForeignKey),
                _ => None,
            }
        }
        _ => None,
    }
}
