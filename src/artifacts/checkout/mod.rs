//! Working tree materialization
//!
//! Checking out a commit makes the working tree match its tree:
//! - Files that differ from the target (content, kind or executable bit)
//!   are rewritten
//! - Files absent from the target are removed unless ignored, and emptied
//!   directories are pruned
//!
//! Files that already match are left alone, so checking out the current
//! commit again writes nothing. The index is not touched.

pub mod migration;

/// Filesystem changes made by one checkout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckoutReport {
    pub written: usize,
    pub removed: usize,
}
