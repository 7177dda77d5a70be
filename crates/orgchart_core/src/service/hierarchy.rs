//! Organization forest assembly.
//!
//! # Responsibility
//! - Validate scope/region filters and fetch matching units flatly.
//! - Assemble the flat set into a forest through an adjacency map keyed by
//!   parent id plus a node table keyed by unit id.
//!
//! # Invariants
//! - A unit whose parent is not in the fetched set becomes a forest root.
//! - Siblings are ordered by `display_order ASC, name ASC` (id breaks ties).
//! - Every fetched unit appears exactly once, or the build fails with
//!   `IntegrityError` (cycles, over-deep nesting).

use crate::directory::region::RegionDirectory;
use crate::model::assignment::Assignment;
use crate::model::person::PublicPerson;
use crate::model::position::Position;
use crate::model::unit::{RegionId, Unit, UnitId, UnitScope};
use crate::repo::unit_repo::{UnitQuery, UnitRepository};
use crate::service::error::{DirectoryError, DirectoryResult, NotFoundKind};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Forest of unit trees; order of roots follows sibling ordering.
pub type Forest = Vec<UnitNode>;

/// Scope/region filter for tree queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HierarchyFilter {
    pub scope: UnitScope,
    /// Required iff `scope == UnitScope::Regional`.
    pub region_id: Option<RegionId>,
    pub active_only: bool,
}

impl HierarchyFilter {
    /// Active headquarters units.
    pub fn headquarters() -> Self {
        Self {
            scope: UnitScope::Headquarters,
            region_id: None,
            active_only: true,
        }
    }

    /// Active units of one region.
    pub fn regional(region_id: RegionId) -> Self {
        Self {
            scope: UnitScope::Regional,
            region_id: Some(region_id),
            active_only: true,
        }
    }

    /// Rejects malformed scope/region combinations.
    pub fn validate(&self) -> DirectoryResult<()> {
        match (self.scope, self.region_id) {
            (UnitScope::Regional, None) => Err(DirectoryError::InvalidFilter(
                "regional scope requires region_id".to_string(),
            )),
            (UnitScope::Headquarters, Some(region_id)) => Err(DirectoryError::InvalidFilter(
                format!("headquarters scope does not accept region_id {region_id}"),
            )),
            _ => Ok(()),
        }
    }
}

/// One unit of the forest with its enrichment payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitNode {
    pub unit: Unit,
    /// Empty until enrichment runs.
    pub positions: Vec<PositionNode>,
    pub children: Vec<UnitNode>,
}

impl UnitNode {
    pub fn new(unit: Unit) -> Self {
        Self {
            unit,
            positions: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn subtree_size(&self) -> usize {
        1 + self.children.iter().map(UnitNode::subtree_size).sum::<usize>()
    }
}

/// Position attached to a unit node with its current holders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionNode {
    pub position: Position,
    pub holders: Vec<HolderNode>,
}

/// Active assignment with the resolved public person, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderNode {
    pub assignment: Assignment,
    /// `None` when the person lookup failed, timed out or found nothing.
    pub person: Option<PublicPerson>,
}

/// Counts every node of a forest.
pub fn forest_size(forest: &[UnitNode]) -> usize {
    forest.iter().map(UnitNode::subtree_size).sum()
}

/// Builds unit forests from repository data.
pub struct HierarchyBuilder<U: UnitRepository, G: RegionDirectory> {
    units: U,
    regions: G,
    max_depth: usize,
}

impl<U: UnitRepository, G: RegionDirectory> HierarchyBuilder<U, G> {
    pub fn new(units: U, regions: G, max_depth: usize) -> Self {
        Self {
            units,
            regions,
            max_depth,
        }
    }

    /// Builds the bare forest for one filter.
    ///
    /// # Errors
    /// - `InvalidFilter` for malformed scope/region combinations.
    /// - `NotFound` when `region_id` is unknown to the region directory.
    /// - `IntegrityError` for cyclic or over-deep stored ancestry.
    pub fn build_tree(&self, filter: &HierarchyFilter) -> DirectoryResult<Forest> {
        filter.validate()?;
        if let Some(region_id) = filter.region_id {
            self.regions
                .find_region(region_id)?
                .ok_or(DirectoryError::not_found(NotFoundKind::Region, region_id))?;
        }

        let units = self.units.list_units(&UnitQuery {
            scope: Some(filter.scope),
            region_id: filter.region_id,
            active_only: filter.active_only,
        })?;
        debug!(
            "event=hierarchy_fetch module=service status=ok scope={} units={}",
            filter.scope.as_str(),
            units.len()
        );
        assemble_forest(units, self.max_depth)
    }
}

/// Assembles a flat unit list into a forest.
///
/// Units whose parent is absent from `units` are promoted to roots.
pub fn assemble_forest(units: Vec<Unit>, max_depth: usize) -> DirectoryResult<Forest> {
    let mut table: HashMap<UnitId, Unit> = HashMap::with_capacity(units.len());
    for unit in units {
        if table.contains_key(&unit.id) {
            return Err(integrity(format!("unit {} listed twice", unit.id)));
        }
        table.insert(unit.id, unit);
    }

    let mut adjacency: HashMap<Option<UnitId>, Vec<UnitId>> = HashMap::new();
    for unit in table.values() {
        let bucket = unit.parent_id.filter(|parent| table.contains_key(parent));
        adjacency.entry(bucket).or_default().push(unit.id);
    }
    for siblings in adjacency.values_mut() {
        siblings.sort_by(|left, right| {
            let (left, right) = (&table[left], &table[right]);
            left.display_order
                .cmp(&right.display_order)
                .then_with(|| left.name.cmp(&right.name))
                .then_with(|| left.id.cmp(&right.id))
        });
    }

    let root_ids = adjacency.remove(&None).unwrap_or_default();
    let mut forest = Vec::with_capacity(root_ids.len());
    for root_id in root_ids {
        forest.push(attach(root_id, 1, max_depth, &mut table, &mut adjacency)?);
    }

    if !table.is_empty() {
        return Err(integrity(format!(
            "{} unit(s) unreachable from any root; parent chain is cyclic",
            table.len()
        )));
    }
    Ok(forest)
}

fn attach(
    id: UnitId,
    depth: usize,
    max_depth: usize,
    table: &mut HashMap<UnitId, Unit>,
    adjacency: &mut HashMap<Option<UnitId>, Vec<UnitId>>,
) -> DirectoryResult<UnitNode> {
    if depth > max_depth {
        return Err(integrity(format!(
            "unit {id} nested deeper than {max_depth} levels"
        )));
    }
    let unit = table
        .remove(&id)
        .ok_or_else(|| integrity(format!("unit {id} reached twice while building tree")))?;

    let mut node = UnitNode::new(unit);
    for child_id in adjacency.remove(&Some(id)).unwrap_or_default() {
        node.children
            .push(attach(child_id, depth + 1, max_depth, table, adjacency)?);
    }
    Ok(node)
}

fn integrity(message: String) -> DirectoryError {
    error!("event=hierarchy_build module=service status=error error_code=integrity_error error={message}");
    DirectoryError::IntegrityError(message)
}
