//! Time-bounded binding of a person to a position.
//!
//! # Invariants
//! - Rows are append-only; leaving a role sets `status=Inactive` and
//!   `ended_at`, it never deletes.
//! - `ended_at` is `Some` iff `status == AssignmentStatus::Inactive`.

use crate::model::person::PersonId;
use crate::model::position::PositionId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one assignment row.
pub type AssignmentId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Active,
    Inactive,
}

impl AssignmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub position_id: PositionId,
    pub person_id: PersonId,
    pub status: AssignmentStatus,
    /// Epoch milliseconds.
    pub assigned_at: i64,
    /// Epoch milliseconds; set when the assignment ends.
    pub ended_at: Option<i64>,
}

impl Assignment {
    /// Returns whether the person currently holds the position.
    pub fn is_active(&self) -> bool {
        self.status == AssignmentStatus::Active
    }
}
