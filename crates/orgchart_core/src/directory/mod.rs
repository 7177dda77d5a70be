//! Read interfaces onto collaborators owned outside this crate.
//!
//! # Responsibility
//! - Define the narrow lookups the directory engine consumes: person by id
//!   or name, region by id, caller role context by id.
//! - Provide SQLite-backed implementations reading the shared database.
//!
//! # Invariants
//! - Lookups never mutate collaborator data.
//! - Failures are reported as [`LookupError`] so callers can decide whether
//!   to recover (enrichment) or surface them (scope resolution).

pub mod caller;
pub mod person;
pub mod region;

use crate::db::DbError;
use rusqlite::{Connection, ErrorCode};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// VM instructions between deadline checks of a bounded query.
const DEADLINE_CHECK_OPS: i32 = 1_000;

/// Result type of collaborator lookups.
pub type LookupResult<T> = Result<T, LookupError>;

/// Failure talking to an external collaborator.
#[derive(Debug)]
pub enum LookupError {
    /// Storage behind the collaborator failed.
    Db(DbError),
    /// Collaborator did not answer in time.
    TimedOut { collaborator: &'static str },
    /// Collaborator is not reachable at all.
    Unavailable {
        collaborator: &'static str,
        message: String,
    },
    /// Collaborator returned data that cannot be decoded.
    InvalidData(String),
}

impl Display for LookupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::TimedOut { collaborator } => write!(f, "{collaborator} lookup timed out"),
            Self::Unavailable {
                collaborator,
                message,
            } => write!(f, "{collaborator} unavailable: {message}"),
            Self::InvalidData(message) => write!(f, "invalid collaborator data: {message}"),
        }
    }
}

impl Error for LookupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for LookupError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for LookupError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Runs `query` on `conn`, interrupting it once `deadline` passes.
///
/// An interrupted or already expired query fails with
/// [`LookupError::TimedOut`]. The progress handler is removed before
/// returning.
pub(crate) fn with_deadline<T>(
    conn: &Connection,
    deadline: Option<Instant>,
    collaborator: &'static str,
    query: impl FnOnce() -> LookupResult<T>,
) -> LookupResult<T> {
    let Some(deadline) = deadline else {
        return query();
    };
    if Instant::now() >= deadline {
        return Err(LookupError::TimedOut { collaborator });
    }

    conn.progress_handler(
        DEADLINE_CHECK_OPS,
        Some(move || Instant::now() >= deadline),
    );
    let _reset = ProgressHandlerReset(conn);
    query().map_err(|err| {
        if is_interrupted(&err) {
            LookupError::TimedOut { collaborator }
        } else {
            err
        }
    })
}

struct ProgressHandlerReset<'conn>(&'conn Connection);

impl Drop for ProgressHandlerReset<'_> {
    fn drop(&mut self) {
        self.0.progress_handler(0, None::<fn() -> bool>);
    }
}

fn is_interrupted(err: &LookupError) -> bool {
    matches!(
        err,
        LookupError::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(failure, _)))
            if failure.code == ErrorCode::OperationInterrupted
    )
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> LookupResult<uuid::Uuid> {
    uuid::Uuid::parse_str(value)
        .map_err(|_| LookupError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}
