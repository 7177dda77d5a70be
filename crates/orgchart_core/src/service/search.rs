//! Federated keyword search across units, positions and members.
//!
//! # Responsibility
//! - Match units by name, positions by title and members by full name.
//! - Denormalize member hits with their active assignments, positions and
//!   units so callers need no further round trips.
//!
//! # Invariants
//! - Blank keywords return three empty lists, never an error.
//! - Each category is bounded independently.
//! - With a region filter nothing outside that region is returned.

use crate::config::SearchLimits;
use crate::directory::person::{PersonDirectory, PersonSearch};
use crate::model::assignment::Assignment;
use crate::model::person::PublicPerson;
use crate::model::position::{Position, PositionId};
use crate::model::unit::{RegionId, Unit, UnitId};
use crate::privacy::PrivacyProjector;
use crate::repo::assignment_repo::AssignmentRepository;
use crate::repo::position_repo::{PositionRepository, PositionSearch};
use crate::repo::unit_repo::{UnitRepository, UnitSearch};
use crate::service::error::{DirectoryError, DirectoryResult};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Search restrictions applied to every category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchFilter {
    pub active_only: bool,
    /// Set for region-scoped callers.
    pub region_id: Option<RegionId>,
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self {
            active_only: true,
            region_id: None,
        }
    }
}

/// Position match with its owning unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionHit {
    pub position: Position,
    pub unit: Unit,
}

/// Active assignment of a matched member with full context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberAssignment {
    pub assignment: Assignment,
    pub position: Position,
    pub unit: Unit,
}

/// Member match with public person data and current roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberHit {
    pub person: PublicPerson,
    pub assignments: Vec<MemberAssignment>,
}

/// Three independently bounded result lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub units: Vec<Unit>,
    pub positions: Vec<PositionHit>,
    pub members: Vec<MemberHit>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.units.is_empty() && self.positions.is_empty() && self.members.is_empty()
    }
}

/// Trims and collapses internal whitespace; `None` for blank input.
pub fn normalize_keyword(keyword: &str) -> Option<String> {
    let collapsed = WHITESPACE_RE.replace_all(keyword.trim(), " ");
    if collapsed.is_empty() {
        return None;
    }
    Some(collapsed.into_owned())
}

/// Federated search over the directory.
pub struct SearchService<U, P, A, D>
where
    U: UnitRepository,
    P: PositionRepository,
    A: AssignmentRepository,
    D: PersonDirectory,
{
    units: U,
    positions: P,
    assignments: A,
    people: D,
    projector: PrivacyProjector,
    limits: SearchLimits,
}

impl<U, P, A, D> SearchService<U, P, A, D>
where
    U: UnitRepository,
    P: PositionRepository,
    A: AssignmentRepository,
    D: PersonDirectory,
{
    pub fn new(
        units: U,
        positions: P,
        assignments: A,
        people: D,
        projector: PrivacyProjector,
        limits: SearchLimits,
    ) -> Self {
        Self {
            units,
            positions,
            assignments,
            people,
            projector,
            limits,
        }
    }

    /// Runs the three searches for `keyword`.
    ///
    /// # Errors
    /// - `ExternalLookupFailure` when the member directory cannot be searched.
    /// - `IntegrityError` when a matched row references a missing unit/position.
    pub fn search(&self, keyword: &str, filter: &SearchFilter) -> DirectoryResult<SearchResults> {
        let Some(keyword) = normalize_keyword(keyword) else {
            return Ok(SearchResults::default());
        };

        let cache = UnitCache::default();
        let units = self.units.search_units(&UnitSearch {
            keyword: &keyword,
            active_only: filter.active_only,
            region_id: filter.region_id,
            limit: self.limits.units,
        })?;
        for unit in &units {
            cache.remember(unit.clone());
        }

        let positions = self
            .positions
            .search_positions(&PositionSearch {
                keyword: &keyword,
                active_only: filter.active_only,
                region_id: filter.region_id,
                limit: self.limits.positions,
            })?
            .into_iter()
            .map(|position| -> DirectoryResult<PositionHit> {
                let unit = cache.unit(&self.units, position.unit_id)?;
                Ok(PositionHit { position, unit })
            })
            .collect::<DirectoryResult<Vec<_>>>()?;

        let members = self.search_members(&keyword, filter, &cache)?;

        debug!(
            "event=search module=service status=ok units={} positions={} members={}",
            units.len(),
            positions.len(),
            members.len()
        );
        Ok(SearchResults {
            units,
            positions,
            members,
        })
    }

    fn search_members(
        &self,
        keyword: &str,
        filter: &SearchFilter,
        cache: &UnitCache,
    ) -> DirectoryResult<Vec<MemberHit>> {
        let people = self.people.search_people(&PersonSearch {
            keyword,
            status: self.limits.member_status,
            region_id: filter.region_id,
            active_only: filter.active_only,
            limit: self.limits.members,
        })?;
        let mut position_cache: HashMap<PositionId, Option<Position>> = HashMap::new();

        let mut hits = Vec::with_capacity(people.len());
        for person in people {
            let mut assignments = Vec::new();
            for assignment in self.assignments.list_active_for_person(person.id)? {
                let position = match position_cache.get(&assignment.position_id) {
                    Some(cached) => cached.clone(),
                    None => {
                        let loaded = self.positions.get_position(assignment.position_id)?;
                        position_cache.insert(assignment.position_id, loaded.clone());
                        loaded
                    }
                };
                let position = position.ok_or_else(|| {
                    DirectoryError::IntegrityError(format!(
                        "assignment {} references missing position {}",
                        assignment.id, assignment.position_id
                    ))
                })?;
                let unit = cache.unit(&self.units, position.unit_id)?;

                if filter.active_only && !(position.is_active && unit.is_active) {
                    continue;
                }
                if filter.region_id.is_some() && unit.region_id != filter.region_id {
                    continue;
                }
                assignments.push(MemberAssignment {
                    assignment,
                    position,
                    unit,
                });
            }

            if filter.region_id.is_some() && assignments.is_empty() {
                continue;
            }
            hits.push(MemberHit {
                person: self.projector.public_person(&person),
                assignments,
            });
        }
        Ok(hits)
    }
}

/// Request-local unit lookup cache.
#[derive(Default)]
struct UnitCache {
    units: RefCell<HashMap<UnitId, Unit>>,
}

impl UnitCache {
    fn remember(&self, unit: Unit) {
        self.units.borrow_mut().insert(unit.id, unit);
    }

    fn unit(&self, repo: &impl UnitRepository, id: UnitId) -> DirectoryResult<Unit> {
        if let Some(unit) = self.units.borrow().get(&id) {
            return Ok(unit.clone());
        }
        let unit = repo.get_unit(id)?.ok_or_else(|| {
            DirectoryError::IntegrityError(format!("search hit references missing unit {id}"))
        })?;
        self.remember(unit.clone());
        Ok(unit)
    }
}
