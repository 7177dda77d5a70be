//! Organization unit repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide flat unit reads for tree assembly and ancestor walks.
//! - Keep SQL filtering and ordering behavior inside the repository boundary.
//!
//! # Invariants
//! - Listing order is deterministic: `display_order ASC, name ASC, unit_uuid ASC`.
//! - `get_unit` returns inactive units too; callers decide visibility.

use crate::model::unit::{RegionId, Unit, UnitId, UnitScope};
use crate::repo::{
    bool_to_int, ensure_connection_ready, like_pattern, parse_flag, parse_optional_uuid,
    parse_uuid, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const UNIT_SELECT_SQL: &str = "SELECT
    unit_uuid,
    parent_uuid,
    name,
    slug,
    scope,
    region_uuid,
    is_active,
    display_order
FROM org_units";

/// Flat unit filter used by tree assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitQuery {
    pub scope: Option<UnitScope>,
    pub region_id: Option<RegionId>,
    pub active_only: bool,
}

/// Keyword filter for unit search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSearch<'a> {
    /// Already-normalized, non-empty keyword.
    pub keyword: &'a str,
    pub active_only: bool,
    pub region_id: Option<RegionId>,
    pub limit: u32,
}

/// Repository interface for organization units.
pub trait UnitRepository {
    /// Persists one unit after validation.
    fn create_unit(&self, unit: &Unit) -> RepoResult<UnitId>;
    /// Loads one unit by id regardless of its active flag.
    fn get_unit(&self, id: UnitId) -> RepoResult<Option<Unit>>;
    /// Lists units matching the filter in deterministic order.
    fn list_units(&self, query: &UnitQuery) -> RepoResult<Vec<Unit>>;
    /// Case-insensitive substring search on unit name.
    fn search_units(&self, search: &UnitSearch<'_>) -> RepoResult<Vec<Unit>>;
    /// Flips the active flag of one unit.
    fn set_unit_active(&self, id: UnitId, is_active: bool) -> RepoResult<()>;
}

impl<T: UnitRepository + ?Sized> UnitRepository for &T {
    fn create_unit(&self, unit: &Unit) -> RepoResult<UnitId> {
        (**self).create_unit(unit)
    }

    fn get_unit(&self, id: UnitId) -> RepoResult<Option<Unit>> {
        (**self).get_unit(id)
    }

    fn list_units(&self, query: &UnitQuery) -> RepoResult<Vec<Unit>> {
        (**self).list_units(query)
    }

    fn search_units(&self, search: &UnitSearch<'_>) -> RepoResult<Vec<Unit>> {
        (**self).search_units(search)
    }

    fn set_unit_active(&self, id: UnitId, is_active: bool) -> RepoResult<()> {
        (**self).set_unit_active(id, is_active)
    }
}

/// SQLite-backed unit repository.
pub struct SqliteUnitRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUnitRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["org_units", "regions"])?;
        Ok(Self { conn })
    }
}

impl UnitRepository for SqliteUnitRepository<'_> {
    fn create_unit(&self, unit: &Unit) -> RepoResult<UnitId> {
        unit.validate()?;
        self.conn.execute(
            "INSERT INTO org_units (
                unit_uuid,
                parent_uuid,
                name,
                slug,
                scope,
                region_uuid,
                is_active,
                display_order
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                unit.id.to_string(),
                unit.parent_id.map(|value| value.to_string()),
                unit.name.trim(),
                unit.slug.trim(),
                unit.scope.as_str(),
                unit.region_id.map(|value| value.to_string()),
                bool_to_int(unit.is_active),
                unit.display_order,
            ],
        )?;
        Ok(unit.id)
    }

    fn get_unit(&self, id: UnitId) -> RepoResult<Option<Unit>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{UNIT_SELECT_SQL} WHERE unit_uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_unit_row(row)?));
        }
        Ok(None)
    }

    fn list_units(&self, query: &UnitQuery) -> RepoResult<Vec<Unit>> {
        let mut sql = format!("{UNIT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(scope) = query.scope {
            sql.push_str(" AND scope = ?");
            bind_values.push(Value::Text(scope.as_str().to_string()));
        }
        if let Some(region_id) = query.region_id {
            sql.push_str(" AND region_uuid = ?");
            bind_values.push(Value::Text(region_id.to_string()));
        }
        if query.active_only {
            sql.push_str(" AND is_active = 1");
        }
        sql.push_str(" ORDER BY display_order ASC, name ASC, unit_uuid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut units = Vec::new();
        while let Some(row) = rows.next()? {
            units.push(parse_unit_row(row)?);
        }
        Ok(units)
    }

    fn search_units(&self, search: &UnitSearch<'_>) -> RepoResult<Vec<Unit>> {
        if search.limit == 0 {
            return Ok(Vec::new());
        }

        let mut sql = format!("{UNIT_SELECT_SQL} WHERE name LIKE ? ESCAPE '\\'");
        let mut bind_values: Vec<Value> = vec![Value::Text(like_pattern(search.keyword))];

        if search.active_only {
            sql.push_str(" AND is_active = 1");
        }
        if let Some(region_id) = search.region_id {
            sql.push_str(" AND region_uuid = ?");
            bind_values.push(Value::Text(region_id.to_string()));
        }
        sql.push_str(" ORDER BY display_order ASC, name ASC, unit_uuid ASC LIMIT ?");
        bind_values.push(Value::Integer(i64::from(search.limit)));

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut units = Vec::new();
        while let Some(row) = rows.next()? {
            units.push(parse_unit_row(row)?);
        }
        Ok(units)
    }

    fn set_unit_active(&self, id: UnitId, is_active: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE org_units
             SET is_active = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE unit_uuid = ?1;",
            params![id.to_string(), bool_to_int(is_active)],
        )?;
        if changed == 0 {
            return Err(RepoError::UnitNotFound(id));
        }
        Ok(())
    }
}

fn parse_unit_row(row: &Row<'_>) -> RepoResult<Unit> {
    let id_text: String = row.get("unit_uuid")?;
    let scope_text: String = row.get("scope")?;
    let scope = UnitScope::parse(&scope_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid unit scope `{scope_text}` in org_units.scope"))
    })?;

    Ok(Unit {
        id: parse_uuid(&id_text, "org_units.unit_uuid")?,
        parent_id: parse_optional_uuid(row.get("parent_uuid")?, "org_units.parent_uuid")?,
        name: row.get("name")?,
        slug: row.get("slug")?,
        scope,
        region_id: parse_optional_uuid(row.get("region_uuid")?, "org_units.region_uuid")?,
        is_active: parse_flag(row.get("is_active")?, "org_units.is_active")?,
        display_order: row.get("display_order")?,
    })
}
