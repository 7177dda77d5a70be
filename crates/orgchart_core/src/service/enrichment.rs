//! Forest enrichment with positions, holders and public person data.
//!
//! # Responsibility
//! - Attach active positions, their active assignments and privacy-safe
//!   person projections to every node of a forest.
//!
//! # Invariants
//! - Enrichment replaces previously attached data; running it twice on the
//!   same source data yields the same forest.
//! - Each node is processed independently; a failed, skipped or timed-out
//!   person lookup only empties that holder's `person`.
//! - Every unit node gets its own lookup budget; an exhausted budget skips
//!   the remaining lookups of that node only.
//! - Each lookup receives the node deadline; a result arriving after it is
//!   discarded.
//! - Repository failures (positions/assignments) fail the whole walk.

use crate::directory::person::PersonDirectory;
use crate::directory::LookupError;
use crate::model::assignment::Assignment;
use crate::model::person::PublicPerson;
use crate::model::unit::UnitId;
use crate::privacy::PrivacyProjector;
use crate::repo::assignment_repo::AssignmentRepository;
use crate::repo::position_repo::PositionRepository;
use crate::service::error::DirectoryResult;
use crate::service::hierarchy::{Forest, HolderNode, PositionNode, UnitNode};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared flag that stops further person lookups once set.
///
/// The walk still completes; holders visited after cancellation render
/// without person data.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-node person lookup budget.
#[derive(Debug, Clone, Copy)]
struct LookupBudget {
    deadline: Option<Instant>,
}

impl LookupBudget {
    fn start(timeout: Option<Duration>) -> Self {
        Self {
            deadline: timeout.map(|timeout| Instant::now() + timeout),
        }
    }

    fn is_exhausted(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Enrichment outcome counters, computed from the enriched forest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentSummary {
    pub units: usize,
    pub positions: usize,
    pub holders: usize,
    /// Holders rendered without person data.
    pub unresolved_holders: usize,
}

impl EnrichmentSummary {
    pub fn of(forest: &[UnitNode]) -> Self {
        let mut summary = Self::default();
        let mut stack: Vec<&UnitNode> = forest.iter().collect();
        while let Some(node) = stack.pop() {
            summary.units += 1;
            summary.positions += node.positions.len();
            for position in &node.positions {
                summary.holders += position.holders.len();
                summary.unresolved_holders += position
                    .holders
                    .iter()
                    .filter(|holder| holder.person.is_none())
                    .count();
            }
            stack.extend(node.children.iter());
        }
        summary
    }
}

/// Walks a forest and attaches position/holder/person data.
pub struct EnrichmentPipeline<P: PositionRepository, A: AssignmentRepository, D: PersonDirectory>
{
    positions: P,
    assignments: A,
    people: D,
    projector: PrivacyProjector,
    lookup_timeout: Option<Duration>,
    cancel: CancelFlag,
}

impl<P: PositionRepository, A: AssignmentRepository, D: PersonDirectory>
    EnrichmentPipeline<P, A, D>
{
    pub fn new(positions: P, assignments: A, people: D, projector: PrivacyProjector) -> Self {
        Self {
            positions,
            assignments,
            people,
            projector,
            lookup_timeout: None,
            cancel: CancelFlag::default(),
        }
    }

    /// Sets the per-node person lookup budget.
    pub fn with_lookup_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Shares a cancellation flag with the caller.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Enriches every node of `forest`.
    pub fn enrich(&self, forest: Forest) -> DirectoryResult<Forest> {
        let started_at = Instant::now();
        let enriched = forest
            .into_iter()
            .map(|node| self.enrich_node(node))
            .collect::<DirectoryResult<Forest>>()?;

        let summary = EnrichmentSummary::of(&enriched);
        info!(
            "event=enrich module=service status=ok units={} positions={} holders={} unresolved={} cancelled={} duration_ms={}",
            summary.units,
            summary.positions,
            summary.holders,
            summary.unresolved_holders,
            self.cancel.is_cancelled(),
            started_at.elapsed().as_millis()
        );
        Ok(enriched)
    }

    /// Loads the enriched positions of one unit.
    pub fn positions_for(&self, unit_id: UnitId) -> DirectoryResult<Vec<PositionNode>> {
        let budget = LookupBudget::start(self.lookup_timeout);
        self.positions
            .list_positions(unit_id, true)?
            .into_iter()
            .map(|position| -> DirectoryResult<PositionNode> {
                let holders = self
                    .assignments
                    .list_active_for_position(position.id)?
                    .into_iter()
                    .map(|assignment| {
                        let person = self.resolve_person(unit_id, &assignment, &budget);
                        HolderNode { assignment, person }
                    })
                    .collect();
                Ok(PositionNode { position, holders })
            })
            .collect()
    }

    fn enrich_node(&self, node: UnitNode) -> DirectoryResult<UnitNode> {
        let positions = self.positions_for(node.unit.id)?;
        let children = node
            .children
            .into_iter()
            .map(|child| self.enrich_node(child))
            .collect::<DirectoryResult<Vec<_>>>()?;
        Ok(UnitNode {
            unit: node.unit,
            positions,
            children,
        })
    }

    fn resolve_person(
        &self,
        unit_id: UnitId,
        assignment: &Assignment,
        budget: &LookupBudget,
    ) -> Option<PublicPerson> {
        if self.cancel.is_cancelled() {
            debug!(
                "event=person_lookup module=enrichment status=skipped reason=cancelled unit_id={unit_id} person_id={}",
                assignment.person_id
            );
            return None;
        }
        if budget.is_exhausted() {
            warn!(
                "event=person_lookup module=enrichment status=skipped reason=node_budget_exhausted unit_id={unit_id} person_id={}",
                assignment.person_id
            );
            return None;
        }

        match self.people.find_person(assignment.person_id, budget.deadline) {
            Ok(_) if budget.is_exhausted() => {
                warn!(
                    "event=person_lookup module=enrichment status=timed_out reason=late_result unit_id={unit_id} person_id={}",
                    assignment.person_id
                );
                None
            }
            Ok(Some(person)) => Some(self.projector.public_person(&person)),
            Ok(None) => {
                debug!(
                    "event=person_lookup module=enrichment status=not_found unit_id={unit_id} person_id={}",
                    assignment.person_id
                );
                None
            }
            Err(LookupError::TimedOut { collaborator }) => {
                warn!(
                    "event=person_lookup module=enrichment status=timed_out collaborator={collaborator} unit_id={unit_id} person_id={}",
                    assignment.person_id
                );
                None
            }
            Err(err) => {
                warn!(
                    "event=person_lookup module=enrichment status=error error_code=external_lookup_failure unit_id={unit_id} person_id={} error={}",
                    assignment.person_id, err
                );
                None
            }
        }
    }
}
