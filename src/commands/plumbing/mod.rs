//! Plumbing commands (low-level object access)
//!
//! ## Commands
//!
//! - `hash-object`: Compute an object id and optionally store the object
//! - `cat-file`: Print an object's kind, size or content
//! - `write-tree`: Store the index as trees

pub mod cat_file;
pub mod hash_object;
pub mod write_tree;
