//! Ancestor path resolution for one unit.
//!
//! # Invariants
//! - The walk terminates: it is bounded by `max_depth` levels (the same
//!   nesting limit tree assembly enforces) and by a visited set, both of
//!   which fail with `IntegrityError`.
//! - The returned path starts at a root and ends at the requested unit.

use crate::model::unit::{Unit, UnitId};
use crate::repo::unit_repo::UnitRepository;
use crate::service::error::{DirectoryError, DirectoryResult, NotFoundKind};
use log::error;
use std::collections::HashSet;

/// Resolves root-first ancestor paths.
pub struct BreadcrumbResolver<U: UnitRepository> {
    units: U,
    max_depth: usize,
}

impl<U: UnitRepository> BreadcrumbResolver<U> {
    pub fn new(units: U, max_depth: usize) -> Self {
        Self { units, max_depth }
    }

    /// Returns `[root, ..., unit_id]`.
    ///
    /// Inactive ancestors are included; the path describes stored structure.
    pub fn breadcrumb(&self, unit_id: UnitId) -> DirectoryResult<Vec<Unit>> {
        let mut trail: Vec<Unit> = Vec::new();
        let mut visited = HashSet::new();
        let mut cursor = Some(unit_id);

        while let Some(current) = cursor {
            if trail.len() >= self.max_depth {
                return Err(self.integrity(
                    unit_id,
                    format!("ancestry exceeds {} levels", self.max_depth),
                ));
            }
            if !visited.insert(current) {
                return Err(self.integrity(unit_id, format!("cycle through unit {current}")));
            }

            let unit = match self.units.get_unit(current)? {
                Some(unit) => unit,
                None if trail.is_empty() => {
                    return Err(DirectoryError::not_found(NotFoundKind::Unit, unit_id));
                }
                None => {
                    return Err(self.integrity(
                        unit_id,
                        format!("dangling parent reference to unit {current}"),
                    ));
                }
            };
            cursor = unit.parent_id;
            trail.push(unit);
        }

        trail.reverse();
        Ok(trail)
    }

    fn integrity(&self, unit_id: UnitId, message: String) -> DirectoryError {
        error!(
            "event=breadcrumb module=service status=error error_code=integrity_error unit_id={unit_id} error={message}"
        );
        DirectoryError::IntegrityError(message)
    }
}
