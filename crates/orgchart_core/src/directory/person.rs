//! Person lookup against the member directory.

use crate::directory::{parse_uuid, with_deadline, LookupError, LookupResult};
use crate::model::person::{MemberStatus, Person, PersonId};
use crate::model::unit::RegionId;
use crate::repo::like_pattern;
use rusqlite::{params, Connection, Row};
use std::time::Instant;

const COLLABORATOR: &str = "member_directory";

const MEMBER_SELECT_SQL: &str = "SELECT
    member_uuid,
    full_name,
    phone,
    email,
    photo_path,
    status
FROM members";

/// Keyword filter for member search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonSearch<'a> {
    /// Already-normalized, non-empty keyword.
    pub keyword: &'a str,
    pub status: MemberStatus,
    /// Keeps only members holding an active assignment in this region.
    pub region_id: Option<RegionId>,
    /// With `region_id`, the qualifying assignment's position and unit must
    /// be active as well.
    pub active_only: bool,
    pub limit: u32,
}

/// Read interface onto the external member directory.
pub trait PersonDirectory {
    /// Resolves one person by id; `Ok(None)` means not found.
    ///
    /// A lookup still running at `deadline` fails with
    /// [`LookupError::TimedOut`].
    fn find_person(&self, id: PersonId, deadline: Option<Instant>)
        -> LookupResult<Option<Person>>;
    /// Case-insensitive substring search on full name within one status.
    fn search_people(&self, search: &PersonSearch<'_>) -> LookupResult<Vec<Person>>;
}

impl<T: PersonDirectory + ?Sized> PersonDirectory for &T {
    fn find_person(
        &self,
        id: PersonId,
        deadline: Option<Instant>,
    ) -> LookupResult<Option<Person>> {
        (**self).find_person(id, deadline)
    }

    fn search_people(&self, search: &PersonSearch<'_>) -> LookupResult<Vec<Person>> {
        (**self).search_people(search)
    }
}

/// Member directory backed by the `members` table.
pub struct SqlitePersonDirectory<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePersonDirectory<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl PersonDirectory for SqlitePersonDirectory<'_> {
    fn find_person(
        &self,
        id: PersonId,
        deadline: Option<Instant>,
    ) -> LookupResult<Option<Person>> {
        with_deadline(self.conn, deadline, COLLABORATOR, || {
            let mut stmt = self
                .conn
                .prepare(&format!("{MEMBER_SELECT_SQL} WHERE member_uuid = ?1;"))?;
            let mut rows = stmt.query([id.to_string()])?;
            if let Some(row) = rows.next()? {
                return Ok(Some(parse_member_row(row)?));
            }
            Ok(None)
        })
    }

    fn search_people(&self, search: &PersonSearch<'_>) -> LookupResult<Vec<Person>> {
        if search.limit == 0 {
            return Ok(Vec::new());
        }
        // Region filter applies before LIMIT.
        let mut stmt = self.conn.prepare(&format!(
            "{MEMBER_SELECT_SQL}
             WHERE full_name LIKE ?1 ESCAPE '\\'
               AND status = ?2
               AND (
                   ?3 IS NULL
                   OR EXISTS (
                       SELECT 1
                       FROM assignments a
                       JOIN positions p ON p.position_uuid = a.position_uuid
                       JOIN org_units u ON u.unit_uuid = p.unit_uuid
                       WHERE a.person_uuid = members.member_uuid
                         AND a.status = 'active'
                         AND u.region_uuid = ?3
                         AND (?4 = 0 OR (p.is_active = 1 AND u.is_active = 1))
                   )
               )
             ORDER BY full_name ASC, member_uuid ASC
             LIMIT ?5;"
        ))?;
        let mut rows = stmt.query(params![
            like_pattern(search.keyword),
            search.status.as_str(),
            search.region_id.map(|id| id.to_string()),
            search.active_only,
            i64::from(search.limit)
        ])?;
        let mut people = Vec::new();
        while let Some(row) = rows.next()? {
            people.push(parse_member_row(row)?);
        }
        Ok(people)
    }
}

fn parse_member_row(row: &Row<'_>) -> LookupResult<Person> {
    let id_text: String = row.get("member_uuid")?;
    let status_text: String = row.get("status")?;
    let status = MemberStatus::parse(&status_text).ok_or_else(|| {
        LookupError::InvalidData(format!(
            "invalid member status `{status_text}` in members.status"
        ))
    })?;

    Ok(Person {
        id: parse_uuid(&id_text, "members.member_uuid")?,
        full_name: row.get("full_name")?,
        phone: row.get("phone")?,
        email: row.get("email")?,
        photo_path: row.get("photo_path")?,
        status,
    })
}
