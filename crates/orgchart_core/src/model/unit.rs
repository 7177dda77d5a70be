//! Organization unit and region records.
//!
//! # Invariants
//! - `region_id` is `Some` iff `scope == UnitScope::Regional`.
//! - `scope` never changes after creation.
//! - The `parent_id` chain is acyclic and finite.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one organization unit.
pub type UnitId = Uuid;

/// Stable identifier of one region in the region directory.
pub type RegionId = Uuid;

/// Whether a unit is part of the national headquarters or a regional chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitScope {
    Headquarters,
    Regional,
}

impl UnitScope {
    /// Stable storage/wire value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Headquarters => "headquarters",
            Self::Regional => "regional",
        }
    }

    /// Parses a storage/wire value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "headquarters" => Some(Self::Headquarters),
            "regional" => Some(Self::Regional),
            _ => None,
        }
    }
}

/// One node of the organization tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    /// `None` marks a root unit.
    pub parent_id: Option<UnitId>,
    pub name: String,
    /// Unique among active units.
    pub slug: String,
    pub scope: UnitScope,
    pub region_id: Option<RegionId>,
    pub is_active: bool,
    pub display_order: i64,
}

/// Validation failures for unit records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitValidationError {
    BlankName,
    BlankSlug,
    /// Regional unit without region, or headquarters unit with one.
    ScopeRegionMismatch { scope: UnitScope },
    SelfParent(UnitId),
}

impl Display for UnitValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "unit name must not be blank"),
            Self::BlankSlug => write!(f, "unit slug must not be blank"),
            Self::ScopeRegionMismatch { scope } => match scope {
                UnitScope::Regional => write!(f, "regional unit requires region_id"),
                UnitScope::Headquarters => {
                    write!(f, "headquarters unit must not carry region_id")
                }
            },
            Self::SelfParent(id) => write!(f, "unit cannot be its own parent: {id}"),
        }
    }
}

impl Error for UnitValidationError {}

impl Unit {
    /// Creates an active headquarters unit with a generated id.
    pub fn headquarters(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: None,
            name: name.into(),
            slug: slug.into(),
            scope: UnitScope::Headquarters,
            region_id: None,
            is_active: true,
            display_order: 0,
        }
    }

    /// Creates an active regional unit with a generated id.
    pub fn regional(
        region_id: RegionId,
        name: impl Into<String>,
        slug: impl Into<String>,
    ) -> Self {
        Self {
            scope: UnitScope::Regional,
            region_id: Some(region_id),
            ..Self::headquarters(name, slug)
        }
    }

    /// Sets the parent unit.
    pub fn with_parent(mut self, parent_id: UnitId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Sets the sibling order key.
    pub fn with_display_order(mut self, display_order: i64) -> Self {
        self.display_order = display_order;
        self
    }

    /// Checks record-level invariants before persistence.
    pub fn validate(&self) -> Result<(), UnitValidationError> {
        if self.name.trim().is_empty() {
            return Err(UnitValidationError::BlankName);
        }
        if self.slug.trim().is_empty() {
            return Err(UnitValidationError::BlankSlug);
        }
        let region_ok = match self.scope {
            UnitScope::Regional => self.region_id.is_some(),
            UnitScope::Headquarters => self.region_id.is_none(),
        };
        if !region_ok {
            return Err(UnitValidationError::ScopeRegionMismatch { scope: self.scope });
        }
        if self.parent_id == Some(self.id) {
            return Err(UnitValidationError::SelfParent(self.id));
        }
        Ok(())
    }
}

/// Region directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub code: String,
    pub name: String,
}
