//! Core domain logic for the organization directory.
//! This crate is the single source of truth for hierarchy, assignment and
//! privacy invariants.

pub mod config;
pub mod db;
pub mod directory;
pub mod logging;
pub mod model;
pub mod privacy;
pub mod repo;
pub mod service;

pub use config::{ConfigError, DirectoryConfig, PhotoConfig, SearchLimits};
pub use directory::caller::{CallerContext, CallerDirectory, CallerId, CallerRole};
pub use directory::person::{PersonDirectory, PersonSearch};
pub use directory::region::RegionDirectory;
pub use directory::{LookupError, LookupResult};
pub use logging::{
    default_log_level, init_logging, init_logging_from_env, logging_status, LoggingError,
};
pub use model::assignment::{Assignment, AssignmentId, AssignmentStatus};
pub use model::person::{MemberStatus, Person, PersonId, PrivacyProjection, PublicPerson};
pub use model::position::{Position, PositionId, PositionType};
pub use model::unit::{Region, RegionId, Unit, UnitId, UnitScope, UnitValidationError};
pub use privacy::{mask_email, mask_phone, resolve_photo_url, PrivacyProjector};
pub use repo::{RepoError, RepoResult};
pub use service::chart::{to_chart_nodes, ChartHolder, ChartNode, ChartPosition};
pub use service::directory_service::{OrgDirectoryService, SqliteOrgDirectoryService, UnitData};
pub use service::enrichment::CancelFlag;
pub use service::error::{DirectoryError, DirectoryResult, NotFoundKind};
pub use service::hierarchy::{Forest, HierarchyFilter, HolderNode, PositionNode, UnitNode};
pub use service::scope_guard::ScopeGrant;
pub use service::search::{MemberAssignment, MemberHit, PositionHit, SearchResults};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
