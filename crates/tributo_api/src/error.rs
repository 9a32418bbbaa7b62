//! Error envelope returned to API callers.

use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use tributo_core::db::DbError;
use tributo_core::ServiceError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationError,
    DuplicateKey,
    NotFound,
    StorageUnavailable,
    StorageError,
}

impl ErrorKind {
    /// HTTP-style status code for the kind.
    pub fn status(self) -> u16 {
        match self {
            Self::ValidationError => 400,
            Self::DuplicateKey => 409,
            Self::NotFound => 404,
            Self::StorageUnavailable => 503,
            Self::StorageError => 500,
        }
    }
}

/// `{error, status, message}` failure envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub error: ErrorKind,
    pub status: u16,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            error: kind,
            status: kind.status(),
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, message)
    }

    /// The database could not be opened for `operation`.
    pub fn unavailable(operation: &str, err: &DbError) -> Self {
        Self::new(
            ErrorKind::StorageUnavailable,
            format!("{operation}: database connection failed: {err}"),
        )
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.status, kind_label(self.error), self.message)
    }
}

impl Error for ApiError {}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        let kind = match &value {
            ServiceError::Validation(_) => ErrorKind::ValidationError,
            ServiceError::DuplicateKey(_) => ErrorKind::DuplicateKey,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::StorageUnavailable { .. } => ErrorKind::StorageUnavailable,
            ServiceError::Storage { .. } => ErrorKind::StorageError,
        };
        Self::new(kind, value.to_string())
    }
}

fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::ValidationError => "validation_error",
        ErrorKind::DuplicateKey => "duplicate_key",
        ErrorKind::NotFound => "not_found",
        ErrorKind::StorageUnavailable => "storage_unavailable",
        ErrorKind::StorageError => "storage_error",
    }
}
