//! Core repository components
//!
//! - `config`: The repository `config` file
//! - `database`: Object database for storing blobs, trees, and commits
//! - `index`: Staging area (index/cache) for tracking file changes
//! - `refs`: Reference management (branches, HEAD, tags)
//! - `repository`: Repository handle tying the areas together
//! - `workspace`: Working directory file system operations

pub mod config;
pub mod database;
pub mod index;
pub mod refs;
pub mod repository;
pub mod workspace;
