//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `orgchart_core` linkage with deterministic output.
//! - When `ORGCHART_DB_PATH` is set, print a per-scope chart summary read
//!   through the directory service as the given caller.
//!
//! Usage: `orgchart_cli [CALLER_UUID]`

use orgchart_core::db::open_db;
use orgchart_core::service::hierarchy::forest_size;
use orgchart_core::{
    init_logging_from_env, DirectoryConfig, HierarchyFilter, SqliteOrgDirectoryService,
};
use std::process::ExitCode;
use uuid::Uuid;

fn main() -> ExitCode {
    println!("orgchart_core ping={}", orgchart_core::ping());
    println!("orgchart_core version={}", orgchart_core::core_version());

    if let Err(err) = init_logging_from_env() {
        eprintln!("logging disabled: {err}");
    }

    let Some(db_path) = std::env::var("ORGCHART_DB_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
    else {
        return ExitCode::SUCCESS;
    };
    let Some(caller_id) = std::env::args().nth(1) else {
        println!("chart summary skipped: pass a caller uuid");
        return ExitCode::SUCCESS;
    };

    match print_summary(db_path.trim(), &caller_id) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("chart summary failed: {message}");
            ExitCode::FAILURE
        }
    }
}

fn print_summary(db_path: &str, caller_id: &str) -> Result<(), String> {
    let caller_id = Uuid::parse_str(caller_id).map_err(|err| format!("invalid caller: {err}"))?;
    let config = DirectoryConfig::from_env().map_err(|err| err.to_string())?;
    let conn = open_db(db_path).map_err(|err| err.to_string())?;
    let service =
        SqliteOrgDirectoryService::from_connection(&conn, config).map_err(|err| err.to_string())?;

    let regions = service
        .list_regions(caller_id)
        .map_err(|err| err.to_string())?;

    let mut filters = Vec::with_capacity(regions.len() + 1);
    filters.push(("headquarters".to_string(), HierarchyFilter::headquarters()));
    filters.extend(
        regions
            .iter()
            .map(|region| (format!("region:{}", region.code), HierarchyFilter::regional(region.id))),
    );

    for (label, filter) in filters {
        match service.get_hierarchy(caller_id, filter) {
            Ok(forest) => println!(
                "chart {label} roots={} units={}",
                forest.len(),
                forest_size(&forest)
            ),
            Err(err) => println!("chart {label} error_code={}", err.code()),
        }
    }
    Ok(())
}
