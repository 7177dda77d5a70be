//! Region-based access scoping for directory callers.
//!
//! # Responsibility
//! - Resolve a caller's permitted scope from the external role context.
//! - Force a coordinator's region into hierarchy, chart and search filters.
//!
//! # Invariants
//! - Resolution is request-scoped; nothing is cached across calls.
//! - A region-scoped caller never receives data of another region: asking
//!   for another region is `Forbidden`, asking for none forces their own.
//! - Elevated callers pass filters through unmodified.

use crate::directory::caller::{CallerDirectory, CallerId, CallerRole};
use crate::model::unit::{Region, RegionId, Unit, UnitScope};
use crate::service::error::{DirectoryError, DirectoryResult};
use crate::service::hierarchy::HierarchyFilter;
use crate::service::search::SearchFilter;
use log::{debug, warn};

/// What a resolved caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeGrant {
    /// Administrators: any scope, any region.
    Unrestricted,
    /// Coordinators: one region only.
    Region(RegionId),
}

impl ScopeGrant {
    /// Adjusts a tree filter to this grant.
    pub fn apply_to_hierarchy(&self, requested: HierarchyFilter) -> DirectoryResult<HierarchyFilter> {
        match *self {
            Self::Unrestricted => Ok(requested),
            Self::Region(region_id) => {
                ensure_same_region(region_id, requested.region_id)?;
                if requested.scope != UnitScope::Regional || requested.region_id.is_none() {
                    debug!(
                        "event=scope_forced module=scope_guard status=ok requested_scope={} region_id={region_id}",
                        requested.scope.as_str()
                    );
                }
                Ok(HierarchyFilter {
                    scope: UnitScope::Regional,
                    region_id: Some(region_id),
                    active_only: requested.active_only,
                })
            }
        }
    }

    /// Adjusts a search filter to this grant.
    pub fn apply_to_search(&self, requested: SearchFilter) -> DirectoryResult<SearchFilter> {
        match *self {
            Self::Unrestricted => Ok(requested),
            Self::Region(region_id) => {
                ensure_same_region(region_id, requested.region_id)?;
                Ok(SearchFilter {
                    region_id: Some(region_id),
                    ..requested
                })
            }
        }
    }

    /// Checks that a single unit lies inside this grant.
    pub fn authorize_unit(&self, unit: &Unit) -> DirectoryResult<()> {
        match *self {
            Self::Unrestricted => Ok(()),
            Self::Region(region_id) if unit.region_id == Some(region_id) => Ok(()),
            Self::Region(region_id) => {
                warn!(
                    "event=scope_denied module=scope_guard status=forbidden region_id={region_id} unit_id={}",
                    unit.id
                );
                Err(DirectoryError::Forbidden("unit is outside the caller's region"))
            }
        }
    }

    /// Keeps only the regions visible under this grant.
    pub fn visible_regions(&self, regions: Vec<Region>) -> Vec<Region> {
        match *self {
            Self::Unrestricted => regions,
            Self::Region(region_id) => regions
                .into_iter()
                .filter(|region| region.id == region_id)
                .collect(),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Self::Unrestricted)
    }
}

fn ensure_same_region(granted: RegionId, requested: Option<RegionId>) -> DirectoryResult<()> {
    match requested {
        Some(requested) if requested != granted => {
            warn!(
                "event=scope_denied module=scope_guard status=forbidden granted_region={granted} requested_region={requested}"
            );
            Err(DirectoryError::Forbidden(
                "requested region is outside the caller's region",
            ))
        }
        _ => Ok(()),
    }
}

/// Resolves callers into scope grants.
pub struct RegionScopeGuard<C: CallerDirectory> {
    callers: C,
}

impl<C: CallerDirectory> RegionScopeGuard<C> {
    pub fn new(callers: C) -> Self {
        Self { callers }
    }

    /// Resolves the scope of one caller.
    ///
    /// # Errors
    /// - `Forbidden` for unknown callers, plain members and coordinators
    ///   without an assigned region.
    /// - `ExternalLookupFailure` when the caller directory fails.
    pub fn resolve_scope(&self, caller_id: CallerId) -> DirectoryResult<ScopeGrant> {
        let Some(caller) = self.callers.find_caller(caller_id)? else {
            warn!("event=scope_resolve module=scope_guard status=forbidden reason=unknown_caller caller_id={caller_id}");
            return Err(DirectoryError::Forbidden("unknown caller"));
        };

        let grant = match (caller.role, caller.region_id) {
            (role, _) if role.is_elevated() => ScopeGrant::Unrestricted,
            (CallerRole::Coordinator, Some(region_id)) => ScopeGrant::Region(region_id),
            (CallerRole::Coordinator, None) => {
                warn!("event=scope_resolve module=scope_guard status=forbidden reason=coordinator_without_region caller_id={caller_id}");
                return Err(DirectoryError::Forbidden("coordinator has no assigned region"));
            }
            (role, _) => {
                warn!(
                    "event=scope_resolve module=scope_guard status=forbidden reason=role_without_access caller_id={caller_id} role={}",
                    role.as_str()
                );
                return Err(DirectoryError::Forbidden("role has no directory access"));
            }
        };
        debug!("event=scope_resolve module=scope_guard status=ok caller_id={caller_id} grant={grant:?}");
        Ok(grant)
    }
}
