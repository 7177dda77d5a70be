//! Position repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Positions of one unit are listed by `display_order ASC, title ASC`.
//! - Every position belongs to exactly one existing unit.

use crate::model::position::{Position, PositionId, PositionType};
use crate::model::unit::{RegionId, UnitId};
use crate::repo::{
    bool_to_int, ensure_connection_ready, like_pattern, parse_flag, parse_uuid, RepoError,
    RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const POSITION_COLUMNS_SQL: &str = "p.position_uuid AS position_uuid,
    p.unit_uuid AS unit_uuid,
    p.title AS title,
    p.slug AS slug,
    p.position_type AS position_type,
    p.is_leadership AS is_leadership,
    p.display_order AS display_order,
    p.is_active AS is_active";

/// Keyword filter for position search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionSearch<'a> {
    /// Already-normalized, non-empty keyword.
    pub keyword: &'a str,
    /// Restricts to active positions inside active units.
    pub active_only: bool,
    pub region_id: Option<RegionId>,
    pub limit: u32,
}

/// Repository interface for positions.
pub trait PositionRepository {
    /// Persists one position under an existing unit.
    fn create_position(&self, position: &Position) -> RepoResult<PositionId>;
    fn get_position(&self, id: PositionId) -> RepoResult<Option<Position>>;
    /// Lists positions defined in one unit.
    fn list_positions(&self, unit_id: UnitId, active_only: bool) -> RepoResult<Vec<Position>>;
    /// Case-insensitive substring search on position title.
    fn search_positions(&self, search: &PositionSearch<'_>) -> RepoResult<Vec<Position>>;
}

impl<T: PositionRepository + ?Sized> PositionRepository for &T {
    fn create_position(&self, position: &Position) -> RepoResult<PositionId> {
        (**self).create_position(position)
    }

    fn get_position(&self, id: PositionId) -> RepoResult<Option<Position>> {
        (**self).get_position(id)
    }

    fn list_positions(&self, unit_id: UnitId, active_only: bool) -> RepoResult<Vec<Position>> {
        (**self).list_positions(unit_id, active_only)
    }

    fn search_positions(&self, search: &PositionSearch<'_>) -> RepoResult<Vec<Position>> {
        (**self).search_positions(search)
    }
}

/// SQLite-backed position repository.
pub struct SqlitePositionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePositionRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["positions", "org_units"])?;
        Ok(Self { conn })
    }
}

impl PositionRepository for SqlitePositionRepository<'_> {
    fn create_position(&self, position: &Position) -> RepoResult<PositionId> {
        if position.title.trim().is_empty() || position.slug.trim().is_empty() {
            return Err(RepoError::InvalidData(
                "position title and slug must not be blank".to_string(),
            ));
        }

        let unit_exists: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM org_units WHERE unit_uuid = ?1;",
                [position.unit_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if unit_exists.is_none() {
            return Err(RepoError::UnitNotFound(position.unit_id));
        }

        self.conn.execute(
            "INSERT INTO positions (
                position_uuid,
                unit_uuid,
                title,
                slug,
                position_type,
                is_leadership,
                display_order,
                is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                position.id.to_string(),
                position.unit_id.to_string(),
                position.title.trim(),
                position.slug.trim(),
                position.position_type.as_str(),
                bool_to_int(position.is_leadership),
                position.display_order,
                bool_to_int(position.is_active),
            ],
        )?;
        Ok(position.id)
    }

    fn get_position(&self, id: PositionId) -> RepoResult<Option<Position>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {POSITION_COLUMNS_SQL}
             FROM positions p
             WHERE p.position_uuid = ?1;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_position_row(row)?));
        }
        Ok(None)
    }

    fn list_positions(&self, unit_id: UnitId, active_only: bool) -> RepoResult<Vec<Position>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {POSITION_COLUMNS_SQL}
             FROM positions p
             WHERE p.unit_uuid = ?1
               AND (?2 = 0 OR p.is_active = 1)
             ORDER BY p.display_order ASC, p.title ASC, p.position_uuid ASC;"
        ))?;
        let mut rows = stmt.query(params![unit_id.to_string(), bool_to_int(active_only)])?;
        let mut positions = Vec::new();
        while let Some(row) = rows.next()? {
            positions.push(parse_position_row(row)?);
        }
        Ok(positions)
    }

    fn search_positions(&self, search: &PositionSearch<'_>) -> RepoResult<Vec<Position>> {
        if search.limit == 0 {
            return Ok(Vec::new());
        }

        let mut sql = format!(
            "SELECT {POSITION_COLUMNS_SQL}
             FROM positions p
             INNER JOIN org_units u ON u.unit_uuid = p.unit_uuid
             WHERE p.title LIKE ? ESCAPE '\\'"
        );
        let mut bind_values: Vec<Value> = vec![Value::Text(like_pattern(search.keyword))];

        if search.active_only {
            sql.push_str(" AND p.is_active = 1 AND u.is_active = 1");
        }
        if let Some(region_id) = search.region_id {
            sql.push_str(" AND u.region_uuid = ?");
            bind_values.push(Value::Text(region_id.to_string()));
        }
        sql.push_str(
            " ORDER BY p.is_leadership DESC, p.display_order ASC, p.title ASC, p.position_uuid ASC LIMIT ?",
        );
        bind_values.push(Value::Integer(i64::from(search.limit)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut positions = Vec::new();
        while let Some(row) = rows.next()? {
            positions.push(parse_position_row(row)?);
        }
        Ok(positions)
    }
}

fn parse_position_row(row: &Row<'_>) -> RepoResult<Position> {
    let id_text: String = row.get("position_uuid")?;
    let unit_text: String = row.get("unit_uuid")?;
    let type_text: String = row.get("position_type")?;
    let position_type = PositionType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid position type `{type_text}` in positions.position_type"
        ))
    })?;

    Ok(Position {
        id: parse_uuid(&id_text, "positions.position_uuid")?,
        unit_id: parse_uuid(&unit_text, "positions.unit_uuid")?,
        title: row.get("title")?,
        slug: row.get("slug")?,
        position_type,
        is_leadership: parse_flag(row.get("is_leadership")?, "positions.is_leadership")?,
        display_order: row.get("display_order")?,
        is_active: parse_flag(row.get("is_active")?, "positions.is_active")?,
    })
}
