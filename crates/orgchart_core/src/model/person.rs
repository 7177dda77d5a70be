//! Read-only person projection and its public, privacy-safe counterpart.
//!
//! `Person` is owned by the external member-management collaborator; this
//! crate only reads it. `PrivacyProjection` is derived per request and never
//! persisted.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one person in the member directory.
pub type PersonId = Uuid;

/// Membership status as reported by the member directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Active,
    Pending,
    Inactive,
    Suspended,
}

impl MemberStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "pending" => Some(Self::Pending),
            "inactive" => Some(Self::Inactive),
            "suspended" => Some(Self::Suspended),
            _ => None,
        }
    }
}

/// Person record with raw contact data. Never serialized to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub id: PersonId,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Storage reference of the photo; resolved to a URL before leaving core.
    pub photo_path: Option<String>,
    pub status: MemberStatus,
}

/// Masked, public-safe contact fields of one person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacyProjection {
    pub photo_url: String,
    pub masked_phone: Option<String>,
    pub masked_email: Option<String>,
}

/// Public view of a person attached to directory results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicPerson {
    pub id: PersonId,
    pub full_name: String,
    pub status: MemberStatus,
    #[serde(flatten)]
    pub contact: PrivacyProjection,
}

impl Person {
    /// Creates an active person without contact data.
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            full_name: full_name.into(),
            phone: None,
            email: None,
            photo_path: None,
            status: MemberStatus::Active,
        }
    }
}
