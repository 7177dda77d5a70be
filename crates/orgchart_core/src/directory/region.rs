//! Region lookup used for filter validation.

use crate::directory::{parse_uuid, LookupResult};
use crate::model::unit::{Region, RegionId};
use rusqlite::{Connection, Row};

/// Read interface onto the region directory.
pub trait RegionDirectory {
    fn find_region(&self, id: RegionId) -> LookupResult<Option<Region>>;
    /// All regions ordered by name.
    fn list_regions(&self) -> LookupResult<Vec<Region>>;
}

impl<T: RegionDirectory + ?Sized> RegionDirectory for &T {
    fn find_region(&self, id: RegionId) -> LookupResult<Option<Region>> {
        (**self).find_region(id)
    }

    fn list_regions(&self) -> LookupResult<Vec<Region>> {
        (**self).list_regions()
    }
}

/// Region directory backed by the `regions` table.
pub struct SqliteRegionDirectory<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRegionDirectory<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl RegionDirectory for SqliteRegionDirectory<'_> {
    fn find_region(&self, id: RegionId) -> LookupResult<Option<Region>> {
        let mut stmt = self.conn.prepare(
            "SELECT region_uuid, code, name
             FROM regions
             WHERE region_uuid = ?1;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_region_row(row)?));
        }
        Ok(None)
    }

    fn list_regions(&self) -> LookupResult<Vec<Region>> {
        let mut stmt = self.conn.prepare(
            "SELECT region_uuid, code, name
             FROM regions
             ORDER BY name ASC, region_uuid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut regions = Vec::new();
        while let Some(row) = rows.next()? {
            regions.push(parse_region_row(row)?);
        }
        Ok(regions)
    }
}

fn parse_region_row(row: &Row<'_>) -> LookupResult<Region> {
    let id_text: String = row.get("region_uuid")?;
    Ok(Region {
        id: parse_uuid(&id_text, "regions.region_uuid")?,
        code: row.get("code")?,
        name: row.get("name")?,
    })
}
