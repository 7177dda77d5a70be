//! Directory use-case services.
//!
//! # Responsibility
//! - Orchestrate repository and directory calls into use-case level APIs.
//! - Keep API/CLI layers decoupled from storage details.

pub mod breadcrumb;
pub mod chart;
pub mod directory_service;
pub mod enrichment;
pub mod error;
pub mod hierarchy;
pub mod scope_guard;
pub mod search;
