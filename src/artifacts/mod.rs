//! Data structures and algorithms behind the repository areas
//!
//! - `branch`: Branch names and revision parsing
//! - `checkout`: Working tree materialization
//! - `core`: Shared utilities (lock files, ignore rules, pager writer)
//! - `database`: Database entry types
//! - `index`: Index file format
//! - `log`: Commit history traversal
//! - `objects`: Object types (blob, tree, commit)
//! - `status`: Working tree status inspection

pub mod branch;
pub mod checkout;
pub mod core;
pub mod database;
pub mod index;
pub mod log;
pub mod objects;
pub mod status;
