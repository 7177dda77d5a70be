//! Position records defined inside one unit.

use crate::model::unit::UnitId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one position.
pub type PositionId = Uuid;

/// Category of a position within its unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionType {
    Executive,
    Staff,
    Advisory,
    Committee,
}

impl PositionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Executive => "executive",
            Self::Staff => "staff",
            Self::Advisory => "advisory",
            Self::Committee => "committee",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "executive" => Some(Self::Executive),
            "staff" => Some(Self::Staff),
            "advisory" => Some(Self::Advisory),
            "committee" => Some(Self::Committee),
            _ => None,
        }
    }
}

/// A role defined within exactly one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub unit_id: UnitId,
    pub title: String,
    /// Unique within the owning unit.
    pub slug: String,
    pub position_type: PositionType,
    pub is_leadership: bool,
    pub display_order: i64,
    pub is_active: bool,
}

impl Position {
    /// Creates an active, non-leadership position with a generated id.
    pub fn new(
        unit_id: UnitId,
        title: impl Into<String>,
        slug: impl Into<String>,
        position_type: PositionType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            unit_id,
            title: title.into(),
            slug: slug.into(),
            position_type,
            is_leadership: false,
            display_order: 0,
            is_active: true,
        }
    }

    pub fn leadership(mut self) -> Self {
        self.is_leadership = true;
        self
    }

    pub fn with_display_order(mut self, display_order: i64) -> Self {
        self.display_order = display_order;
        self
    }
}
