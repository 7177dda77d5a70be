//! Caller role context supplied by the external auth collaborator.

use crate::directory::{parse_uuid, LookupError, LookupResult};
use crate::model::unit::RegionId;
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of an authenticated caller.
pub type CallerId = Uuid;

/// Directory-relevant role of a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerRole {
    SuperAdmin,
    Admin,
    /// Restricted to the caller's own region.
    Coordinator,
    Member,
}

impl CallerRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Admin => "admin",
            Self::Coordinator => "coordinator",
            Self::Member => "member",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "super_admin" => Some(Self::SuperAdmin),
            "admin" => Some(Self::Admin),
            "coordinator" => Some(Self::Coordinator),
            "member" => Some(Self::Member),
            _ => None,
        }
    }

    /// Elevated roles see every region unfiltered.
    pub fn is_elevated(self) -> bool {
        matches!(self, Self::SuperAdmin | Self::Admin)
    }
}

/// Role context of one caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerContext {
    pub caller_id: CallerId,
    pub role: CallerRole,
    /// Assigned region; meaningful for coordinators.
    pub region_id: Option<RegionId>,
}

/// Read interface onto caller identity/role context.
pub trait CallerDirectory {
    fn find_caller(&self, id: CallerId) -> LookupResult<Option<CallerContext>>;
}

impl<T: CallerDirectory + ?Sized> CallerDirectory for &T {
    fn find_caller(&self, id: CallerId) -> LookupResult<Option<CallerContext>> {
        (**self).find_caller(id)
    }
}

/// Caller directory backed by the `caller_roles` table.
pub struct SqliteCallerDirectory<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCallerDirectory<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CallerDirectory for SqliteCallerDirectory<'_> {
    fn find_caller(&self, id: CallerId) -> LookupResult<Option<CallerContext>> {
        let mut stmt = self.conn.prepare(
            "SELECT caller_uuid, role, region_uuid
             FROM caller_roles
             WHERE caller_uuid = ?1;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_caller_row(row)?));
        }
        Ok(None)
    }
}

fn parse_caller_row(row: &Row<'_>) -> LookupResult<CallerContext> {
    let id_text: String = row.get("caller_uuid")?;
    let role_text: String = row.get("role")?;
    let role = CallerRole::parse(&role_text).ok_or_else(|| {
        LookupError::InvalidData(format!("invalid caller role `{role_text}` in caller_roles.role"))
    })?;
    let region_id = row
        .get::<_, Option<String>>("region_uuid")?
        .map(|value| parse_uuid(&value, "caller_roles.region_uuid"))
        .transpose()?;

    Ok(CallerContext {
        caller_id: parse_uuid(&id_text, "caller_roles.caller_uuid")?,
        role,
        region_id,
    })
}
