#![allow(dead_code)]

use orgchart_core::db::open_db_in_memory;
use orgchart_core::repo::assignment_repo::{AssignmentRepository, SqliteAssignmentRepository};
use orgchart_core::repo::position_repo::{PositionRepository, SqlitePositionRepository};
use orgchart_core::repo::unit_repo::{SqliteUnitRepository, UnitRepository};
use orgchart_core::{
    Assignment, DirectoryConfig, Position, PositionId, PositionType, RegionId, SqliteOrgDirectoryService,
    Unit,
};
use rusqlite::{params, Connection};
use uuid::Uuid;

pub fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

pub fn service(conn: &Connection) -> SqliteOrgDirectoryService<'_> {
    SqliteOrgDirectoryService::from_connection(conn, DirectoryConfig::default()).unwrap()
}

pub fn insert_region(conn: &Connection, code: &str, name: &str) -> RegionId {
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO regions (region_uuid, code, name) VALUES (?1, ?2, ?3);",
        params![id.to_string(), code, name],
    )
    .unwrap();
    id
}

pub fn insert_member(
    conn: &Connection,
    full_name: &str,
    phone: Option<&str>,
    email: Option<&str>,
    status: &str,
) -> Uuid {
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO members (member_uuid, full_name, phone, email, photo_path, status)
         VALUES (?1, ?2, ?3, ?4, NULL, ?5);",
        params![id.to_string(), full_name, phone, email, status],
    )
    .unwrap();
    id
}

pub fn insert_caller(conn: &Connection, role: &str, region_id: Option<RegionId>) -> Uuid {
    let id = Uuid::new_v4();
    conn.execute(
        "INSERT INTO caller_roles (caller_uuid, role, region_uuid) VALUES (?1, ?2, ?3);",
        params![id.to_string(), role, region_id.map(|value| value.to_string())],
    )
    .unwrap();
    id
}

pub fn admin(conn: &Connection) -> Uuid {
    insert_caller(conn, "admin", None)
}

pub fn create_unit(conn: &Connection, unit: Unit) -> Unit {
    SqliteUnitRepository::try_new(conn)
        .unwrap()
        .create_unit(&unit)
        .unwrap();
    unit
}

pub fn deactivate_unit(conn: &Connection, unit: &Unit) {
    SqliteUnitRepository::try_new(conn)
        .unwrap()
        .set_unit_active(unit.id, false)
        .unwrap();
}

pub fn create_position(conn: &Connection, unit: &Unit, title: &str, slug: &str) -> Position {
    let position = Position::new(unit.id, title, slug, PositionType::Executive);
    SqlitePositionRepository::try_new(conn)
        .unwrap()
        .create_position(&position)
        .unwrap();
    position
}

pub fn assign(conn: &Connection, position_id: PositionId, person_id: Uuid, at: i64) -> Assignment {
    SqliteAssignmentRepository::try_new(conn)
        .unwrap()
        .create_assignment(position_id, person_id, at)
        .unwrap()
}

/// Points `child` at `parent` directly in storage.
pub fn reparent(conn: &Connection, child: &Unit, parent: &Unit) {
    conn.execute(
        "UPDATE org_units SET parent_uuid = ?2 WHERE unit_uuid = ?1;",
        params![child.id.to_string(), parent.id.to_string()],
    )
    .unwrap();
}
