//! Assignment repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Read active assignments per position and per person.
//! - Own the single state transition of this core: `active -> inactive`.
//!
//! # Invariants
//! - Assignment rows are never deleted (storage trigger enforces it).
//! - The end transition runs inside one `IMMEDIATE` transaction, so readers
//!   observe either the active row or the fully ended row.
//! - At most one active assignment exists per `(position, person)` pair.

use crate::model::assignment::{Assignment, AssignmentId, AssignmentStatus};
use crate::model::person::PersonId;
use crate::model::position::PositionId;
use crate::repo::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const ASSIGNMENT_SELECT_SQL: &str = "SELECT
    assignment_uuid,
    position_uuid,
    person_uuid,
    status,
    assigned_at,
    ended_at
FROM assignments";

/// Repository interface for assignments.
pub trait AssignmentRepository {
    /// Appends a new active assignment.
    fn create_assignment(
        &self,
        position_id: PositionId,
        person_id: PersonId,
        assigned_at: i64,
    ) -> RepoResult<Assignment>;
    fn get_assignment(&self, id: AssignmentId) -> RepoResult<Option<Assignment>>;
    /// Active holders of one position, oldest first.
    fn list_active_for_position(&self, position_id: PositionId) -> RepoResult<Vec<Assignment>>;
    /// Active assignments of one person, oldest first.
    fn list_active_for_person(&self, person_id: PersonId) -> RepoResult<Vec<Assignment>>;
    /// Full audit trail of one position including ended assignments.
    fn list_position_history(&self, position_id: PositionId) -> RepoResult<Vec<Assignment>>;
    /// Transitions one assignment to inactive and returns the ended row.
    fn end_assignment(&self, id: AssignmentId, ended_at: i64) -> RepoResult<Assignment>;
}

impl<T: AssignmentRepository + ?Sized> AssignmentRepository for &T {
    fn create_assignment(
        &self,
        position_id: PositionId,
        person_id: PersonId,
        assigned_at: i64,
    ) -> RepoResult<Assignment> {
        (**self).create_assignment(position_id, person_id, assigned_at)
    }

    fn get_assignment(&self, id: AssignmentId) -> RepoResult<Option<Assignment>> {
        (**self).get_assignment(id)
    }

    fn list_active_for_position(&self, position_id: PositionId) -> RepoResult<Vec<Assignment>> {
        (**self).list_active_for_position(position_id)
    }

    fn list_active_for_person(&self, person_id: PersonId) -> RepoResult<Vec<Assignment>> {
        (**self).list_active_for_person(person_id)
    }

    fn list_position_history(&self, position_id: PositionId) -> RepoResult<Vec<Assignment>> {
        (**self).list_position_history(position_id)
    }

    fn end_assignment(&self, id: AssignmentId, ended_at: i64) -> RepoResult<Assignment> {
        (**self).end_assignment(id, ended_at)
    }
}

/// SQLite-backed assignment repository.
pub struct SqliteAssignmentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAssignmentRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["assignments", "positions"])?;
        Ok(Self { conn })
    }
}

impl AssignmentRepository for SqliteAssignmentRepository<'_> {
    fn create_assignment(
        &self,
        position_id: PositionId,
        person_id: PersonId,
        assigned_at: i64,
    ) -> RepoResult<Assignment> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let position_exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM positions WHERE position_uuid = ?1;",
                [position_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if position_exists.is_none() {
            return Err(RepoError::PositionNotFound(position_id));
        }

        let already_active: i64 = tx.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM assignments
                WHERE position_uuid = ?1
                  AND person_uuid = ?2
                  AND status = 'active'
            );",
            params![position_id.to_string(), person_id.to_string()],
            |row| row.get(0),
        )?;
        if already_active == 1 {
            return Err(RepoError::DuplicateActiveAssignment {
                position_id,
                person_id,
            });
        }

        let assignment = Assignment {
            id: Uuid::new_v4(),
            position_id,
            person_id,
            status: AssignmentStatus::Active,
            assigned_at,
            ended_at: None,
        };
        tx.execute(
            "INSERT INTO assignments (
                assignment_uuid,
                position_uuid,
                person_uuid,
                status,
                assigned_at,
                ended_at
            ) VALUES (?1, ?2, ?3, 'active', ?4, NULL);",
            params![
                assignment.id.to_string(),
                position_id.to_string(),
                person_id.to_string(),
                assigned_at,
            ],
        )?;
        tx.commit()?;
        Ok(assignment)
    }

    fn get_assignment(&self, id: AssignmentId) -> RepoResult<Option<Assignment>> {
        load_assignment(self.conn, id)
    }

    fn list_active_for_position(&self, position_id: PositionId) -> RepoResult<Vec<Assignment>> {
        query_assignments(
            self.conn,
            &format!(
                "{ASSIGNMENT_SELECT_SQL}
                 WHERE position_uuid = ?1
                   AND status = 'active'
                 ORDER BY assigned_at ASC, assignment_uuid ASC;"
            ),
            position_id,
        )
    }

    fn list_active_for_person(&self, person_id: PersonId) -> RepoResult<Vec<Assignment>> {
        query_assignments(
            self.conn,
            &format!(
                "{ASSIGNMENT_SELECT_SQL}
                 WHERE person_uuid = ?1
                   AND status = 'active'
                 ORDER BY assigned_at ASC, assignment_uuid ASC;"
            ),
            person_id,
        )
    }

    fn list_position_history(&self, position_id: PositionId) -> RepoResult<Vec<Assignment>> {
        query_assignments(
            self.conn,
            &format!(
                "{ASSIGNMENT_SELECT_SQL}
                 WHERE position_uuid = ?1
                 ORDER BY assigned_at ASC, assignment_uuid ASC;"
            ),
            position_id,
        )
    }

    fn end_assignment(&self, id: AssignmentId, ended_at: i64) -> RepoResult<Assignment> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let current = load_assignment(&tx, id)?.ok_or(RepoError::AssignmentNotFound(id))?;
        if !current.is_active() {
            return Err(RepoError::AssignmentAlreadyEnded(id));
        }
        if ended_at < current.assigned_at {
            return Err(RepoError::InvalidData(format!(
                "ended_at {ended_at} precedes assigned_at {} for assignment {id}",
                current.assigned_at
            )));
        }

        let changed = tx.execute(
            "UPDATE assignments
             SET status = 'inactive',
                 ended_at = ?2
             WHERE assignment_uuid = ?1
               AND status = 'active';",
            params![id.to_string(), ended_at],
        )?;
        if changed == 0 {
            return Err(RepoError::AssignmentAlreadyEnded(id));
        }
        tx.commit()?;

        info!(
            "event=assignment_end module=repo status=ok assignment_id={} position_id={}",
            id, current.position_id
        );
        Ok(Assignment {
            status: AssignmentStatus::Inactive,
            ended_at: Some(ended_at),
            ..current
        })
    }
}

fn load_assignment(conn: &Connection, id: AssignmentId) -> RepoResult<Option<Assignment>> {
    let mut stmt = conn.prepare(&format!(
        "{ASSIGNMENT_SELECT_SQL} WHERE assignment_uuid = ?1;"
    ))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_assignment_row(row)?));
    }
    Ok(None)
}

fn query_assignments(conn: &Connection, sql: &str, key: Uuid) -> RepoResult<Vec<Assignment>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([key.to_string()])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(parse_assignment_row(row)?);
    }
    Ok(items)
}

fn parse_assignment_row(row: &Row<'_>) -> RepoResult<Assignment> {
    let id_text: String = row.get("assignment_uuid")?;
    let position_text: String = row.get("position_uuid")?;
    let person_text: String = row.get("person_uuid")?;
    let status_text: String = row.get("status")?;
    let status = AssignmentStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid assignment status `{status_text}` in assignments.status"
        ))
    })?;
    let ended_at: Option<i64> = row.get("ended_at")?;
    if (status == AssignmentStatus::Active) != ended_at.is_none() {
        return Err(RepoError::InvalidData(format!(
            "assignment {id_text} has status `{status_text}` inconsistent with ended_at"
        )));
    }

    Ok(Assignment {
        id: parse_uuid(&id_text, "assignments.assignment_uuid")?,
        position_id: parse_uuid(&position_text, "assignments.position_uuid")?,
        person_id: parse_uuid(&person_text, "assignments.person_uuid")?,
        status,
        assigned_at: row.get("assigned_at")?,
        ended_at,
    })
}
