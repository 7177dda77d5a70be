//! Use-case API for programmatic and page callers.
//!
//! # Responsibility
//! - Expose directory operations as JSON-serializable envelopes.
//! - Translate ids and filters from wire strings.
//! - Replace internal error detail with fixed public messages.
//!
//! # Invariants
//! - Exported functions never panic.
//! - Failed envelopes carry `success=false`, no `data` and a public message.
//! - Page entry points degrade every failure into `PageState::NotFound`.

use log::warn;
use orgchart_core::db::open_db;
use orgchart_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    Assignment, ChartNode, DirectoryConfig, DirectoryError, Forest, HierarchyFilter, Region,
    SearchResults, SqliteOrgDirectoryService, Unit, UnitData, UnitScope,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;
use uuid::Uuid;

const DB_FILE_NAME: &str = "orgchart_directory.sqlite3";
const ENV_DB_PATH: &str = "ORGCHART_DB_PATH";
static DEFAULT_API: OnceLock<DirectoryApi> = OnceLock::new();

const MSG_NOT_FOUND: &str = "The requested item was not found.";
const MSG_FORBIDDEN: &str = "You do not have access to this data.";
const MSG_INVALID_FILTER: &str = "The selected filter is not valid.";
const MSG_INVALID_REQUEST: &str = "The request is not valid.";
const MSG_CONFLICT: &str = "The change conflicts with the current state.";
const MSG_UNAVAILABLE: &str = "The directory is temporarily unavailable.";
const MSG_FAILED: &str = "Unable to load directory data.";

/// Minimal health-check API.
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Core crate version.
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes core logging once per process.
///
/// Returns an empty string on success and the error message otherwise.
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Uniform response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    fn failure(message: &str) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.to_string()),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    /// Serializes the envelope; serialization failures become a failure envelope.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            warn!("event=api_serialize module=api status=error error={err}");
            format!(r#"{{"success":false,"message":"{MSG_FAILED}"}}"#)
        })
    }
}

/// Render state of a unit page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PageState<T> {
    Found { data: T },
    NotFound,
}

/// Everything a unit detail page renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPage {
    pub breadcrumb: Vec<Unit>,
    #[serde(flatten)]
    pub detail: UnitData,
}

enum ApiFailure {
    InvalidRequest(&'static str),
    Unavailable(String),
    Directory(DirectoryError),
}

impl ApiFailure {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::Unavailable(_) => "unavailable",
            Self::Directory(err) => err.code(),
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => MSG_INVALID_REQUEST,
            Self::Unavailable(_) => MSG_UNAVAILABLE,
            Self::Directory(DirectoryError::NotFound { .. }) => MSG_NOT_FOUND,
            Self::Directory(DirectoryError::Forbidden(_)) => MSG_FORBIDDEN,
            Self::Directory(DirectoryError::InvalidFilter(_)) => MSG_INVALID_FILTER,
            Self::Directory(DirectoryError::Conflict(_)) => MSG_CONFLICT,
            Self::Directory(DirectoryError::ExternalLookupFailure(_)) => MSG_UNAVAILABLE,
            Self::Directory(_) => MSG_FAILED,
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::InvalidRequest(field) => format!("malformed {field}"),
            Self::Unavailable(message) => message.clone(),
            Self::Directory(err) => err.to_string(),
        }
    }
}

impl From<DirectoryError> for ApiFailure {
    fn from(value: DirectoryError) -> Self {
        Self::Directory(value)
    }
}

/// Directory API bound to one database file and configuration.
#[derive(Debug, Clone)]
pub struct DirectoryApi {
    db_path: PathBuf,
    config: DirectoryConfig,
}

impl DirectoryApi {
    pub fn new(db_path: impl Into<PathBuf>, config: DirectoryConfig) -> Self {
        Self {
            db_path: db_path.into(),
            config,
        }
    }

    /// `ORGCHART_DB_PATH` (or a temp-dir file) plus environment configuration.
    ///
    /// Invalid configuration falls back to defaults with a warning.
    pub fn from_env() -> Self {
        let config = DirectoryConfig::from_env().unwrap_or_else(|err| {
            warn!("event=api_config module=api status=fallback error={err}");
            DirectoryConfig::default()
        });
        Self::new(resolve_db_path(), config)
    }

    pub fn unit_data(&self, caller_id: &str, unit_id: &str) -> ApiResponse<UnitData> {
        self.respond("unit_data", |service| {
            let caller_id = parse_id(caller_id, "caller_id")?;
            let unit_id = parse_id(unit_id, "unit_id")?;
            Ok(service.get_unit_data(caller_id, unit_id)?)
        })
    }

    pub fn search(&self, caller_id: &str, keyword: &str, active_only: bool) -> ApiResponse<SearchResults> {
        self.respond("search", |service| {
            let caller_id = parse_id(caller_id, "caller_id")?;
            Ok(service.search(caller_id, keyword, active_only)?)
        })
    }

    pub fn hierarchy(
        &self,
        caller_id: &str,
        scope: &str,
        region_id: Option<&str>,
    ) -> ApiResponse<Forest> {
        self.respond("hierarchy", |service| {
            let caller_id = parse_id(caller_id, "caller_id")?;
            let filter = parse_filter(scope, region_id)?;
            Ok(service.get_hierarchy(caller_id, filter)?)
        })
    }

    pub fn chart_data(
        &self,
        caller_id: &str,
        scope: &str,
        region_id: Option<&str>,
    ) -> ApiResponse<Vec<ChartNode>> {
        self.respond("chart_data", |service| {
            let caller_id = parse_id(caller_id, "caller_id")?;
            let filter = parse_filter(scope, region_id)?;
            Ok(service.get_chart_data(caller_id, filter)?)
        })
    }

    pub fn breadcrumb(&self, caller_id: &str, unit_id: &str) -> ApiResponse<Vec<Unit>> {
        self.respond("breadcrumb", |service| {
            let caller_id = parse_id(caller_id, "caller_id")?;
            let unit_id = parse_id(unit_id, "unit_id")?;
            Ok(service.get_breadcrumb(caller_id, unit_id)?)
        })
    }

    pub fn end_assignment(
        &self,
        caller_id: &str,
        assignment_id: &str,
        ended_at: i64,
    ) -> ApiResponse<Assignment> {
        self.respond("end_assignment", |service| {
            let caller_id = parse_id(caller_id, "caller_id")?;
            let assignment_id = parse_id(assignment_id, "assignment_id")?;
            Ok(service.end_assignment(caller_id, assignment_id, ended_at)?)
        })
    }

    pub fn regions(&self, caller_id: &str) -> ApiResponse<Vec<Region>> {
        self.respond("regions", |service| {
            let caller_id = parse_id(caller_id, "caller_id")?;
            Ok(service.list_regions(caller_id)?)
        })
    }

    /// Unit page data; any failure renders as `NotFound`.
    pub fn unit_page(&self, caller_id: &str, unit_id: &str) -> PageState<UnitPage> {
        let response = self.respond("unit_page", |service| {
            let caller_id = parse_id(caller_id, "caller_id")?;
            let unit_id = parse_id(unit_id, "unit_id")?;
            let detail = service.get_unit_data(caller_id, unit_id)?;
            let breadcrumb = service.get_breadcrumb(caller_id, unit_id)?;
            Ok(UnitPage { breadcrumb, detail })
        });
        match response.data {
            Some(data) => PageState::Found { data },
            None => PageState::NotFound,
        }
    }

    fn respond<T>(
        &self,
        operation: &'static str,
        run: impl FnOnce(&SqliteOrgDirectoryService<'_>) -> Result<T, ApiFailure>,
    ) -> ApiResponse<T> {
        let result = open_db(&self.db_path)
            .map_err(|err| ApiFailure::Unavailable(format!("db open failed: {err}")))
            .and_then(|conn| {
                let service = SqliteOrgDirectoryService::from_connection(&conn, self.config.clone())
                    .map_err(|err| ApiFailure::Unavailable(format!("service init failed: {err}")))?;
                run(&service)
            });

        match result {
            Ok(data) => ApiResponse::success(data),
            Err(failure) => {
                warn!(
                    "event=api_call module=api status=error operation={operation} error_code={} error={}",
                    failure.code(),
                    failure.detail()
                );
                ApiResponse::failure(failure.public_message())
            }
        }
    }
}

/// Unit detail through the process-wide API.
pub fn unit_data(caller_id: String, unit_id: String) -> ApiResponse<UnitData> {
    default_api().unit_data(&caller_id, &unit_id)
}

/// Keyword search through the process-wide API.
pub fn directory_search(caller_id: String, keyword: String, active_only: bool) -> ApiResponse<SearchResults> {
    default_api().search(&caller_id, &keyword, active_only)
}

/// Enriched forest through the process-wide API.
pub fn hierarchy(caller_id: String, scope: String, region_id: Option<String>) -> ApiResponse<Forest> {
    default_api().hierarchy(&caller_id, &scope, region_id.as_deref())
}

/// Chart nodes through the process-wide API.
pub fn chart_data(
    caller_id: String,
    scope: String,
    region_id: Option<String>,
) -> ApiResponse<Vec<ChartNode>> {
    default_api().chart_data(&caller_id, &scope, region_id.as_deref())
}

/// Ancestor path through the process-wide API.
pub fn breadcrumb(caller_id: String, unit_id: String) -> ApiResponse<Vec<Unit>> {
    default_api().breadcrumb(&caller_id, &unit_id)
}

/// Assignment end transition through the process-wide API.
pub fn end_assignment(caller_id: String, assignment_id: String, ended_at: i64) -> ApiResponse<Assignment> {
    default_api().end_assignment(&caller_id, &assignment_id, ended_at)
}

/// Region filter options through the process-wide API.
pub fn regions(caller_id: String) -> ApiResponse<Vec<Region>> {
    default_api().regions(&caller_id)
}

/// Unit page state through the process-wide API.
pub fn unit_page(caller_id: String, unit_id: String) -> PageState<UnitPage> {
    default_api().unit_page(&caller_id, &unit_id)
}

fn default_api() -> &'static DirectoryApi {
    DEFAULT_API.get_or_init(DirectoryApi::from_env)
}

fn resolve_db_path() -> PathBuf {
    if let Ok(raw) = std::env::var(ENV_DB_PATH) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    std::env::temp_dir().join(DB_FILE_NAME)
}

fn parse_id(raw: &str, field: &'static str) -> Result<Uuid, ApiFailure> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiFailure::InvalidRequest(field))
}

fn parse_filter(scope: &str, region_id: Option<&str>) -> Result<HierarchyFilter, ApiFailure> {
    let scope = UnitScope::parse(scope.trim().to_ascii_lowercase().as_str())
        .ok_or(ApiFailure::InvalidRequest("scope"))?;
    let region_id = region_id
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| parse_id(value, "region_id"))
        .transpose()?;
    Ok(HierarchyFilter {
        scope,
        region_id,
        active_only: true,
    })
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, init_logging, parse_filter, ping, ApiResponse, DirectoryApi, PageState,
        MSG_FORBIDDEN, MSG_INVALID_FILTER, MSG_INVALID_REQUEST, MSG_NOT_FOUND,
    };
    use orgchart_core::db::open_db;
    use orgchart_core::repo::assignment_repo::{AssignmentRepository, SqliteAssignmentRepository};
    use orgchart_core::repo::position_repo::{PositionRepository, SqlitePositionRepository};
    use orgchart_core::repo::unit_repo::{SqliteUnitRepository, UnitRepository};
    use orgchart_core::{DirectoryConfig, Position, PositionType, Unit, UnitScope};
    use rusqlite::params;
    use std::path::Path;
    use tempfile::TempDir;
    use uuid::Uuid;

    struct Fixture {
        _dir: TempDir,
        api: DirectoryApi,
        seeded: Seeded,
    }

    struct Seeded {
        admin: Uuid,
        coordinator: Uuid,
        region: Uuid,
        board: Unit,
        chapter: Unit,
        assignment: Uuid,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("directory.sqlite3");
        let seeded = seed(&path);
        Fixture {
            api: DirectoryApi::new(&path, DirectoryConfig::default()),
            _dir: dir,
            seeded,
        }
    }

    fn seed(path: &Path) -> Seeded {
        let conn = open_db(path).expect("open seeded db");
        let region = Uuid::new_v4();
        let other_region = Uuid::new_v4();
        for (id, code, name) in [(region, "north", "North"), (other_region, "south", "South")] {
            conn.execute(
                "INSERT INTO regions (region_uuid, code, name) VALUES (?1, ?2, ?3);",
                params![id.to_string(), code, name],
            )
            .expect("insert region");
        }

        let admin = Uuid::new_v4();
        let coordinator = Uuid::new_v4();
        conn.execute(
            "INSERT INTO caller_roles (caller_uuid, role, region_uuid) VALUES (?1, 'admin', NULL);",
            params![admin.to_string()],
        )
        .expect("insert admin");
        conn.execute(
            "INSERT INTO caller_roles (caller_uuid, role, region_uuid) VALUES (?1, 'coordinator', ?2);",
            params![coordinator.to_string(), region.to_string()],
        )
        .expect("insert coordinator");

        let member = Uuid::new_v4();
        conn.execute(
            "INSERT INTO members (member_uuid, full_name, phone, email, photo_path, status)
             VALUES (?1, 'Jane Doe', '081234567890', 'jane.doe@example.com', 'photos/jane.jpg', 'active');",
            params![member.to_string()],
        )
        .expect("insert member");

        let units = SqliteUnitRepository::try_new(&conn).expect("unit repo");
        let board = Unit::headquarters("Board", "board");
        let chapter = Unit::regional(region, "North Chapter", "north-chapter");
        units.create_unit(&board).expect("create board");
        units.create_unit(&chapter).expect("create chapter");

        let positions = SqlitePositionRepository::try_new(&conn).expect("position repo");
        let chair = Position::new(board.id, "Chair", "chair", PositionType::Executive).leadership();
        positions.create_position(&chair).expect("create chair");

        let assignments = SqliteAssignmentRepository::try_new(&conn).expect("assignment repo");
        let assignment = assignments
            .create_assignment(chair.id, member, 1_000)
            .expect("assign chair");

        Seeded {
            admin,
            coordinator,
            region,
            board,
            chapter,
            assignment: assignment.id,
        }
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        assert!(!init_logging("info".to_string(), String::new()).is_empty());
    }

    #[test]
    fn unit_data_envelope_carries_masked_holder() {
        let fixture = fixture();
        let response = fixture
            .api
            .unit_data(&fixture.seeded.admin.to_string(), &fixture.seeded.board.id.to_string());
        assert!(response.success);

        let json: serde_json::Value =
            serde_json::from_str(&response.to_json()).expect("envelope should be valid JSON");
        assert_eq!(json["success"], true);
        assert!(json.get("message").is_none());
        let person = &json["data"]["positions"][0]["holders"][0]["person"];
        assert_eq!(person["full_name"], "Jane Doe");
        assert_eq!(person["masked_phone"], "0812****7890");
        assert_eq!(person["masked_email"], "ja******@example.com");
        assert_eq!(person["photo_url"], "/media/members/jane.jpg");
        assert!(person.get("phone").is_none());
    }

    #[test]
    fn failures_use_fixed_public_messages() {
        let fixture = fixture();
        let admin = fixture.seeded.admin.to_string();

        let missing = fixture.api.unit_data(&admin, &Uuid::new_v4().to_string());
        assert_eq!(missing, ApiResponse::failure(MSG_NOT_FOUND));

        let malformed = fixture.api.unit_data(&admin, "not-a-uuid");
        assert_eq!(malformed.message.as_deref(), Some(MSG_INVALID_REQUEST));

        let bad_filter = fixture.api.hierarchy(&admin, "regional", None);
        assert_eq!(bad_filter.message.as_deref(), Some(MSG_INVALID_FILTER));

        let json: serde_json::Value =
            serde_json::from_str(&missing.to_json()).expect("valid JSON");
        assert_eq!(json["success"], false);
        assert!(json.get("data").is_none());
    }

    #[test]
    fn coordinator_is_forbidden_outside_own_region() {
        let fixture = fixture();
        let coordinator = fixture.seeded.coordinator.to_string();

        let foreign = fixture.api.chart_data(
            &coordinator,
            "regional",
            Some(&Uuid::new_v4().to_string()),
        );
        assert_eq!(foreign.message.as_deref(), Some(MSG_FORBIDDEN));

        let own = fixture
            .api
            .chart_data(&coordinator, "headquarters", None);
        let nodes = own.data.expect("coordinator sees own region");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, fixture.seeded.chapter.id);

        let regions = fixture
            .api
            .regions(&coordinator)
            .data
            .expect("regions should load");
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].id, fixture.seeded.region);
    }

    #[test]
    fn unit_page_degrades_failures_to_not_found() {
        let fixture = fixture();
        let coordinator = fixture.seeded.coordinator.to_string();

        let forbidden = fixture
            .api
            .unit_page(&coordinator, &fixture.seeded.board.id.to_string());
        assert_eq!(forbidden, PageState::NotFound);

        match fixture
            .api
            .unit_page(&coordinator, &fixture.seeded.chapter.id.to_string())
        {
            PageState::Found { data } => {
                assert_eq!(data.detail.unit.id, fixture.seeded.chapter.id);
                assert_eq!(data.breadcrumb.len(), 1);
            }
            PageState::NotFound => panic!("own-region unit should render"),
        }
    }

    #[test]
    fn end_assignment_requires_elevated_caller() {
        let fixture = fixture();
        let assignment = fixture.seeded.assignment.to_string();

        let denied = fixture
            .api
            .end_assignment(&fixture.seeded.coordinator.to_string(), &assignment, 2_000);
        assert_eq!(denied.message.as_deref(), Some(MSG_FORBIDDEN));

        let ended = fixture
            .api
            .end_assignment(&fixture.seeded.admin.to_string(), &assignment, 2_000)
            .data
            .expect("admin ends assignment");
        assert_eq!(ended.ended_at, Some(2_000));
        assert!(!ended.is_active());
    }

    #[test]
    fn parse_filter_accepts_case_insensitive_scope() {
        let filter = parse_filter(" Headquarters ", Some("  ")).ok().expect("valid filter");
        assert_eq!(filter.scope, UnitScope::Headquarters);
        assert_eq!(filter.region_id, None);
        assert!(parse_filter("national", None).is_err());
    }
}
