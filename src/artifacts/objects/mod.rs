//! Object types and their on-disk encoding
//!
//! Every stored object is framed as `<type> <size>\0<payload>` and identified
//! by the SHA-1 digest of that frame:
//!
//! - **Blob**: file content (raw bytes, also used for symlink targets)
//! - **Tree**: one directory level (mode, name and id per entry)
//! - **Commit**: a tree snapshot with parents, identities and a message

pub mod blob;
pub mod commit;
pub mod object;
pub mod object_id;
pub mod object_type;
pub mod tree;

/// Length of a SHA-1 hash in hexadecimal format
pub const OBJECT_ID_LENGTH: usize = 40;

/// Length of a SHA-1 hash in raw bytes
pub const OBJECT_ID_BYTES: usize = OBJECT_ID_LENGTH / 2;
