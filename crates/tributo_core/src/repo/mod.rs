//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Isolate SQL text and row decoding from service orchestration.
//! - Translate storage failures into semantic variants where callers branch
//!   on them (`UniqueViolation`).
//!
//! # Invariants
//! - Repositories never open or commit transactions; write services own them.
//! - Every statement binds its values; none are interpolated.

pub mod property_repo;
pub mod report_repo;
pub mod tax_record_repo;
pub mod taxpayer_repo;

use crate::db::DbError;
use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// A UNIQUE constraint rejected the write.
    UniqueViolation(String),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UniqueViolation(message) => write!(f, "unique constraint violated: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::UniqueViolation(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, message) = &value {
            if failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            {
                return Self::UniqueViolation(
                    message
                        .clone()
                        .unwrap_or_else(|| "UNIQUE constraint failed".to_string()),
                );
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}

/// Returns true when the error means the database itself could not be
/// reached (open failure, busy or locked past the timeout, I/O, read-only).
pub fn is_storage_unavailable(err: &RepoError) -> bool {
    let RepoError::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(failure, _))) = err else {
        return false;
    };
    matches!(
        failure.code,
        ErrorCode::CannotOpen
            | ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::SystemIoFailure
            | ErrorCode::ReadOnly
            | ErrorCode::NotADatabase
    )
}
