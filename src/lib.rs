//! A git-compatible version control core
//!
//! - `areas`: object database, index, refs, config and working tree, tied
//!   together by the [`Repository`](areas::repository::Repository) handle
//! - `artifacts`: the formats and algorithms those areas are built from
//! - `commands`: one `impl Repository` block per sub-command
//! - `errors`: the typed failures callers can match on

pub mod areas;
pub mod artifacts;
pub mod commands;
pub mod errors;
