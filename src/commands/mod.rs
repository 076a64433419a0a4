//! Command implementations
//!
//! - `plumbing`: Low-level commands for direct object manipulation
//! - `porcelain`: User-facing workflows (add, commit, checkout, log, ...)
//!
//! Plumbing commands provide building blocks, while porcelain commands
//! compose them into higher-level operations.

pub mod plumbing;
pub mod porcelain;
