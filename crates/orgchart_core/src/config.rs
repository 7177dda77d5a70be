//! Directory engine configuration.
//!
//! # Responsibility
//! - Hold tunables shared by the services (search bounds, depth guard,
//!   photo URLs, lookup budget).
//! - Read overrides from `ORGCHART_*` environment variables.
//!
//! # Invariants
//! - Defaults are usable without any environment.
//! - Invalid overrides are rejected, never silently replaced by defaults.

use crate::model::person::MemberStatus;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const ENV_PHOTO_BASE_URL: &str = "ORGCHART_PHOTO_BASE_URL";
pub const ENV_DEFAULT_AVATAR_URL: &str = "ORGCHART_DEFAULT_AVATAR_URL";
pub const ENV_LOOKUP_TIMEOUT_MS: &str = "ORGCHART_LOOKUP_TIMEOUT_MS";
pub const ENV_SEARCH_LIMIT: &str = "ORGCHART_SEARCH_LIMIT";
pub const ENV_MAX_DEPTH: &str = "ORGCHART_MAX_DEPTH";

const DEFAULT_PHOTO_BASE_URL: &str = "/media/members";
const DEFAULT_AVATAR_URL: &str = "/static/img/default-avatar.png";
const DEFAULT_SEARCH_LIMIT: u32 = 10;
const SEARCH_LIMIT_MAX: u32 = 50;
const DEFAULT_MAX_DEPTH: usize = 64;
const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_millis(1500);

/// Configuration error for environment overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidNumber { key: &'static str, value: String },
    OutOfRange { key: &'static str, value: String },
    BlankValue(&'static str),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNumber { key, value } => {
                write!(f, "{key} must be a non-negative integer, got `{value}`")
            }
            Self::OutOfRange { key, value } => write!(f, "{key} is out of range: `{value}`"),
            Self::BlankValue(key) => write!(f, "{key} must not be blank"),
        }
    }
}

impl Error for ConfigError {}

/// Photo URL settings used by the privacy projector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoConfig {
    /// Public prefix under which member photos are served.
    pub base_url: String,
    /// Returned when a person has no photo.
    pub default_avatar_url: String,
}

impl Default for PhotoConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_PHOTO_BASE_URL.to_string(),
            default_avatar_url: DEFAULT_AVATAR_URL.to_string(),
        }
    }
}

/// Bounds for the federated search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub units: u32,
    pub positions: u32,
    pub members: u32,
    /// Only members in this status are searchable.
    pub member_status: MemberStatus,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            units: DEFAULT_SEARCH_LIMIT,
            positions: DEFAULT_SEARCH_LIMIT,
            members: DEFAULT_SEARCH_LIMIT,
            member_status: MemberStatus::Active,
        }
    }
}

/// Top-level configuration of the directory services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryConfig {
    pub photos: PhotoConfig,
    pub search: SearchLimits,
    /// Maximum ancestor hops / nesting depth before data is deemed corrupt.
    pub max_depth: usize,
    /// Person-lookup budget per unit node; `None` disables the budget.
    pub lookup_timeout: Option<Duration>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            photos: PhotoConfig::default(),
            search: SearchLimits::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            lookup_timeout: Some(DEFAULT_LOOKUP_TIMEOUT),
        }
    }
}

impl DirectoryConfig {
    /// Builds configuration from defaults plus process environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from defaults plus overrides from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_PHOTO_BASE_URL) {
            config.photos.base_url = non_blank(ENV_PHOTO_BASE_URL, &value)?
                .trim_end_matches('/')
                .to_string();
        }
        if let Some(value) = lookup(ENV_DEFAULT_AVATAR_URL) {
            config.photos.default_avatar_url =
                non_blank(ENV_DEFAULT_AVATAR_URL, &value)?.to_string();
        }
        if let Some(value) = lookup(ENV_LOOKUP_TIMEOUT_MS) {
            config.lookup_timeout = match parse_u64(ENV_LOOKUP_TIMEOUT_MS, &value)? {
                0 => None,
                millis => Some(Duration::from_millis(millis)),
            };
        }
        if let Some(value) = lookup(ENV_SEARCH_LIMIT) {
            let limit = parse_u64(ENV_SEARCH_LIMIT, &value)?;
            if limit == 0 || limit > u64::from(SEARCH_LIMIT_MAX) {
                return Err(ConfigError::OutOfRange {
                    key: ENV_SEARCH_LIMIT,
                    value,
                });
            }
            let limit = limit as u32;
            config.search.units = limit;
            config.search.positions = limit;
            config.search.members = limit;
        }
        if let Some(value) = lookup(ENV_MAX_DEPTH) {
            let depth = parse_u64(ENV_MAX_DEPTH, &value)?;
            if depth == 0 || depth > 1024 {
                return Err(ConfigError::OutOfRange {
                    key: ENV_MAX_DEPTH,
                    value,
                });
            }
            config.max_depth = depth as usize;
        }

        Ok(config)
    }
}

fn non_blank<'a>(key: &'static str, value: &'a str) -> Result<&'a str, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::BlankValue(key));
    }
    Ok(trimmed)
}

fn parse_u64(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidNumber {
            key,
            value: value.to_string(),
        })
}
