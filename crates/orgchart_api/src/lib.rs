//! Envelope-level entry points over the organization directory.

pub mod api;
