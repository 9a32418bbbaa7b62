//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Map storage failures onto the caller-facing error taxonomy.
//!
//! # Invariants
//! - Services validate input before any mutation.
//! - Storage errors keep the failing operation name for diagnostics.

pub mod property_service;
pub mod report_service;
pub mod write_service;

use crate::geo::GeometryError;
use crate::model::property::{PropertyId, ValidationError};
use crate::repo::{is_storage_unavailable, RepoError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Caller-facing error taxonomy.
#[derive(Debug)]
pub enum ServiceError {
    /// Input rejected before touching storage.
    Validation(ValidationError),
    /// A unique key (the cadastral code) is already taken.
    DuplicateKey(String),
    NotFound(PropertyId),
    /// The store could not be reached or stayed locked.
    StorageUnavailable {
        operation: &'static str,
        source: RepoError,
    },
    Storage {
        operation: &'static str,
        source: RepoError,
    },
}

impl ServiceError {
    /// Wraps a repository failure raised while running `operation`.
    pub fn storage(operation: &'static str, source: RepoError) -> Self {
        match source {
            RepoError::UniqueViolation(message) => Self::DuplicateKey(message),
            source if is_storage_unavailable(&source) => {
                Self::StorageUnavailable { operation, source }
            }
            source => Self::Storage { operation, source },
        }
    }

    /// Adapter for `map_err`.
    pub fn during(operation: &'static str) -> impl FnOnce(RepoError) -> Self {
        move |source| Self::storage(operation, source)
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::DuplicateKey(message) => write!(f, "duplicate key: {message}"),
            Self::NotFound(id) => write!(f, "property not found: {id}"),
            Self::StorageUnavailable { operation, source } => {
                write!(f, "storage unavailable during {operation}: {source}")
            }
            Self::Storage { operation, source } => {
                write!(f, "storage failure during {operation}: {source}")
            }
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::DuplicateKey(_) => None,
            Self::NotFound(_) => None,
            Self::StorageUnavailable { source, .. } => Some(source),
            Self::Storage { source, .. } => Some(source),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<GeometryError> for ServiceError {
    fn from(value: GeometryError) -> Self {
        Self::Validation(ValidationError::Geometry(value))
    }
}
