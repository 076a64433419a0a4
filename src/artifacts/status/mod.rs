//! Working tree status
//!
//! Every path known to HEAD, the index or the working tree is compared
//! across the three and filed under one category.
//!
//! ## Components
//!
//! - `file_change`: change flags and the categories they collapse into
//! - `inspector`: per-path comparison
//! - `status_info`: the scan itself and the resulting report

pub mod file_change;
pub mod inspector;
pub mod status_info;
