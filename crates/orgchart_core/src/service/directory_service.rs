//! Caller-facing organization directory service.
//!
//! # Responsibility
//! - Compose scope resolution, tree assembly, enrichment, chart projection,
//!   breadcrumb resolution and search into use-case level entry points.
//! - Log every failed operation with its stable error code.
//!
//! # Invariants
//! - Every entry point resolves the caller's scope first; nothing is read
//!   before the caller is authorized.
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Inactive units are invisible to `get_unit_data`.

use crate::config::DirectoryConfig;
use crate::directory::caller::{CallerDirectory, CallerId, SqliteCallerDirectory};
use crate::directory::person::{PersonDirectory, SqlitePersonDirectory};
use crate::directory::region::{RegionDirectory, SqliteRegionDirectory};
use crate::model::assignment::{Assignment, AssignmentId};
use crate::model::unit::{Region, Unit, UnitId};
use crate::privacy::PrivacyProjector;
use crate::repo::assignment_repo::{AssignmentRepository, SqliteAssignmentRepository};
use crate::repo::position_repo::{PositionRepository, SqlitePositionRepository};
use crate::repo::unit_repo::{SqliteUnitRepository, UnitRepository};
use crate::repo::RepoResult;
use crate::service::breadcrumb::BreadcrumbResolver;
use crate::service::chart::{to_chart_nodes, ChartNode};
use crate::service::enrichment::{CancelFlag, EnrichmentPipeline};
use crate::service::error::{DirectoryError, DirectoryResult, NotFoundKind};
use crate::service::hierarchy::{Forest, HierarchyBuilder, HierarchyFilter, PositionNode};
use crate::service::scope_guard::{RegionScopeGuard, ScopeGrant};
use crate::service::search::{SearchFilter, SearchResults, SearchService};
use log::{error, info, warn};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

/// Unit detail with enriched positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitData {
    pub unit: Unit,
    pub positions: Vec<PositionNode>,
}

/// Directory service wired to the SQLite-backed repositories and directories.
pub type SqliteOrgDirectoryService<'conn> = OrgDirectoryService<
    SqliteUnitRepository<'conn>,
    SqlitePositionRepository<'conn>,
    SqliteAssignmentRepository<'conn>,
    SqlitePersonDirectory<'conn>,
    SqliteRegionDirectory<'conn>,
    SqliteCallerDirectory<'conn>,
>;

/// Use-case facade over the organization directory.
pub struct OrgDirectoryService<U, P, A, D, G, C>
where
    U: UnitRepository,
    P: PositionRepository,
    A: AssignmentRepository,
    D: PersonDirectory,
    G: RegionDirectory,
    C: CallerDirectory,
{
    units: U,
    positions: P,
    assignments: A,
    people: D,
    regions: G,
    guard: RegionScopeGuard<C>,
    projector: PrivacyProjector,
    config: DirectoryConfig,
    cancel: CancelFlag,
}

impl<'conn> SqliteOrgDirectoryService<'conn> {
    /// Wires every collaborator to one connection.
    ///
    /// Fails when the connection is not bootstrapped with the current schema.
    pub fn from_connection(conn: &'conn Connection, config: DirectoryConfig) -> RepoResult<Self> {
        Ok(Self::new(
            SqliteUnitRepository::try_new(conn)?,
            SqlitePositionRepository::try_new(conn)?,
            SqliteAssignmentRepository::try_new(conn)?,
            SqlitePersonDirectory::new(conn),
            SqliteRegionDirectory::new(conn),
            SqliteCallerDirectory::new(conn),
            config,
        ))
    }
}

impl<U, P, A, D, G, C> OrgDirectoryService<U, P, A, D, G, C>
where
    U: UnitRepository,
    P: PositionRepository,
    A: AssignmentRepository,
    D: PersonDirectory,
    G: RegionDirectory,
    C: CallerDirectory,
{
    pub fn new(
        units: U,
        positions: P,
        assignments: A,
        people: D,
        regions: G,
        callers: C,
        config: DirectoryConfig,
    ) -> Self {
        Self {
            units,
            positions,
            assignments,
            people,
            regions,
            guard: RegionScopeGuard::new(callers),
            projector: PrivacyProjector::new(config.photos.clone()),
            config,
            cancel: CancelFlag::default(),
        }
    }

    /// Shares a cancellation flag that stops person lookups in flight.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns one active unit with its enriched positions.
    ///
    /// # Errors
    /// - `NotFound` when the unit is missing or inactive.
    /// - `Forbidden` when the unit lies outside the caller's region.
    pub fn get_unit_data(&self, caller_id: CallerId, unit_id: UnitId) -> DirectoryResult<UnitData> {
        self.observe("get_unit_data", caller_id, || {
            let grant = self.guard.resolve_scope(caller_id)?;
            let unit = self
                .units
                .get_unit(unit_id)?
                .filter(|unit| unit.is_active)
                .ok_or(DirectoryError::not_found(NotFoundKind::Unit, unit_id))?;
            grant.authorize_unit(&unit)?;
            let positions = self.pipeline().positions_for(unit.id)?;
            Ok(UnitData { unit, positions })
        })
    }

    /// Keyword search over units, positions and members.
    pub fn search(
        &self,
        caller_id: CallerId,
        keyword: &str,
        active_only: bool,
    ) -> DirectoryResult<SearchResults> {
        self.observe("search", caller_id, || {
            let grant = self.guard.resolve_scope(caller_id)?;
            let filter = grant.apply_to_search(SearchFilter {
                active_only,
                region_id: None,
            })?;
            SearchService::new(
                &self.units,
                &self.positions,
                &self.assignments,
                &self.people,
                self.projector.clone(),
                self.config.search,
            )
            .search(keyword, &filter)
        })
    }

    /// Builds and enriches the forest for one scope/region filter.
    pub fn get_hierarchy(
        &self,
        caller_id: CallerId,
        filter: HierarchyFilter,
    ) -> DirectoryResult<Forest> {
        self.observe("get_hierarchy", caller_id, || {
            let grant = self.guard.resolve_scope(caller_id)?;
            self.enriched_forest(grant, filter)
        })
    }

    /// Chart-widget projection of [`Self::get_hierarchy`].
    pub fn get_chart_data(
        &self,
        caller_id: CallerId,
        filter: HierarchyFilter,
    ) -> DirectoryResult<Vec<ChartNode>> {
        self.observe("get_chart_data", caller_id, || {
            let grant = self.guard.resolve_scope(caller_id)?;
            let forest = self.enriched_forest(grant, filter)?;
            Ok(to_chart_nodes(&forest))
        })
    }

    /// Root-first ancestor path ending at `unit_id`.
    pub fn get_breadcrumb(&self, caller_id: CallerId, unit_id: UnitId) -> DirectoryResult<Vec<Unit>> {
        self.observe("get_breadcrumb", caller_id, || {
            let grant = self.guard.resolve_scope(caller_id)?;
            let trail = BreadcrumbResolver::new(&self.units, self.config.max_depth)
                .breadcrumb(unit_id)?;
            if let Some(target) = trail.last() {
                grant.authorize_unit(target)?;
            }
            Ok(trail)
        })
    }

    /// Ends one active assignment.
    ///
    /// # Errors
    /// - `Forbidden` for region-scoped callers.
    /// - `NotFound` / `Conflict` from the assignment transition.
    pub fn end_assignment(
        &self,
        caller_id: CallerId,
        assignment_id: AssignmentId,
        ended_at: i64,
    ) -> DirectoryResult<Assignment> {
        self.observe("end_assignment", caller_id, || {
            let grant = self.guard.resolve_scope(caller_id)?;
            if !grant.is_unrestricted() {
                return Err(DirectoryError::Forbidden(
                    "only administrators may end assignments",
                ));
            }
            Ok(self.assignments.end_assignment(assignment_id, ended_at)?)
        })
    }

    /// Regions visible to the caller, ordered by name.
    pub fn list_regions(&self, caller_id: CallerId) -> DirectoryResult<Vec<Region>> {
        self.observe("list_regions", caller_id, || {
            let grant = self.guard.resolve_scope(caller_id)?;
            Ok(grant.visible_regions(self.regions.list_regions()?))
        })
    }

    fn enriched_forest(&self, grant: ScopeGrant, filter: HierarchyFilter) -> DirectoryResult<Forest> {
        let filter = grant.apply_to_hierarchy(filter)?;
        let forest = HierarchyBuilder::new(&self.units, &self.regions, self.config.max_depth)
            .build_tree(&filter)?;
        self.pipeline().enrich(forest)
    }

    fn pipeline(&self) -> EnrichmentPipeline<&P, &A, &D> {
        EnrichmentPipeline::new(
            &self.positions,
            &self.assignments,
            &self.people,
            self.projector.clone(),
        )
        .with_lookup_timeout(self.config.lookup_timeout)
        .with_cancel_flag(self.cancel.clone())
    }

    fn observe<T>(
        &self,
        operation: &'static str,
        caller_id: CallerId,
        run: impl FnOnce() -> DirectoryResult<T>,
    ) -> DirectoryResult<T> {
        let result = run();
        match &result {
            Ok(_) => info!("event={operation} module=directory status=ok caller_id={caller_id}"),
            Err(err @ (DirectoryError::IntegrityError(_) | DirectoryError::Repo(_))) => error!(
                "event={operation} module=directory status=error caller_id={caller_id} error_code={} error={err}",
                err.code()
            ),
            Err(err) => warn!(
                "event={operation} module=directory status=error caller_id={caller_id} error_code={} error={err}",
                err.code()
            ),
        }
        result
    }
}
