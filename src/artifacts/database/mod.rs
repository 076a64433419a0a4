//! Database entry types
//!
//! Entries read back from stored trees: an object id with its mode.

pub mod database_entry;
