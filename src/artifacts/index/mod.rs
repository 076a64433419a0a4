//! Index file format
//!
//! The index (also called staging area or cache) records which blob each
//! tracked path will have in the next commit.
//!
//! ## File Format (Version 2)
//!
//! ```text
//! Header (12 bytes):
//!   - Signature: "DIRC" (4 bytes)
//!   - Version: 2 (4 bytes)
//!   - Entry count (4 bytes)
//!
//! Entries (variable length):
//!   - Sorted by path bytes
//!   - Each entry padded with NULs to 8-byte alignment
//!
//! Checksum (20 bytes):
//!   - SHA-1 hash of all preceding bytes
//! ```

pub mod checksum;
pub mod entry_mode;
pub mod index_entry;
pub mod index_header;

/// Size of SHA-1 checksum in bytes
pub const CHECKSUM_SIZE: usize = 20;

/// 4 bytes signature, 4 version, 4 entry count
pub const HEADER_SIZE: usize = 12;

pub const SIGNATURE: &str = "DIRC";

pub const VERSION: u32 = 2;
