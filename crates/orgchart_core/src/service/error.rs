//! Error taxonomy shared by the directory services.
//!
//! # Invariants
//! - `NotFound`, `Forbidden` and `InvalidFilter` surface to callers as-is.
//! - `ExternalLookupFailure` is recovered locally during enrichment and only
//!   surfaces from operations that cannot proceed without the collaborator.
//! - `IntegrityError` marks corrupted stored data and is never swallowed.

use crate::directory::LookupError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Entity kind carried by [`DirectoryError::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundKind {
    Unit,
    Position,
    Assignment,
    Region,
}

impl NotFoundKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Position => "position",
            Self::Assignment => "assignment",
            Self::Region => "region",
        }
    }
}

/// Errors from directory service operations.
#[derive(Debug)]
pub enum DirectoryError {
    NotFound { kind: NotFoundKind, id: Uuid },
    /// Region-scope violation or caller without directory access.
    Forbidden(&'static str),
    /// Malformed scope/region combination.
    InvalidFilter(String),
    /// Cyclic or over-deep ancestry, or other corrupted stored structure.
    IntegrityError(String),
    /// Person/region/caller collaborator unreachable or errored.
    ExternalLookupFailure(LookupError),
    /// State transition rejected because it already happened or would
    /// duplicate an active row.
    Conflict(String),
    /// Repository-level failure.
    Repo(RepoError),
}

impl DirectoryError {
    pub(crate) fn not_found(kind: NotFoundKind, id: Uuid) -> Self {
        Self::NotFound { kind, id }
    }

    /// Stable machine-readable code used in logs and envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::InvalidFilter(_) => "invalid_filter",
            Self::IntegrityError(_) => "integrity_error",
            Self::ExternalLookupFailure(_) => "external_lookup_failure",
            Self::Conflict(_) => "conflict",
            Self::Repo(_) => "storage_error",
        }
    }
}

impl Display for DirectoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { kind, id } => write!(f, "{} not found: {id}", kind.as_str()),
            Self::Forbidden(reason) => write!(f, "forbidden: {reason}"),
            Self::InvalidFilter(message) => write!(f, "invalid filter: {message}"),
            Self::IntegrityError(message) => write!(f, "integrity error: {message}"),
            Self::ExternalLookupFailure(err) => write!(f, "external lookup failed: {err}"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DirectoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ExternalLookupFailure(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for DirectoryError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::UnitNotFound(id) => Self::not_found(NotFoundKind::Unit, id),
            RepoError::PositionNotFound(id) => Self::not_found(NotFoundKind::Position, id),
            RepoError::AssignmentNotFound(id) => Self::not_found(NotFoundKind::Assignment, id),
            err @ (RepoError::AssignmentAlreadyEnded(_)
            | RepoError::DuplicateActiveAssignment { .. }) => Self::Conflict(err.to_string()),
            other => Self::Repo(other),
        }
    }
}

impl From<LookupError> for DirectoryError {
    fn from(value: LookupError) -> Self {
        Self::ExternalLookupFailure(value)
    }
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;
