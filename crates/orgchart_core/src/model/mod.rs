//! Domain model for the organization directory.
//!
//! # Responsibility
//! - Define canonical records for units, positions and assignments.
//! - Define read-only projections of external aggregates (person, region).
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Deactivation and ending are flags/timestamps, never hard deletes.

pub mod assignment;
pub mod person;
pub mod position;
pub mod unit;
