//! Object identifier (SHA-1 hash)
//!
//! Object ids are 40-character lowercase hexadecimal strings. Objects are
//! stored under `objects/<first-2-chars>/<remaining-38-chars>`.

use crate::artifacts::objects::{OBJECT_ID_BYTES, OBJECT_ID_LENGTH};
use crate::errors::RepositoryError;
use std::io;
use std::path::PathBuf;

/// Hex-encoded SHA-1 digest identifying a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse and validate a full object id.
    ///
    /// Upper-case digits are accepted and normalized. Anything that is not
    /// exactly 40 hex digits fails with [`RepositoryError::InvalidObjectId`].
    pub fn try_parse(id: impl AsRef<str>) -> anyhow::Result<Self> {
        let id = id.as_ref();
        if id.len() != OBJECT_ID_LENGTH || !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(RepositoryError::InvalidObjectId(id.to_string()).into());
        }

        Ok(Self(id.to_ascii_lowercase()))
    }

    /// Build an id from a raw 20-byte digest.
    pub fn from_digest(digest: &[u8]) -> anyhow::Result<Self> {
        if digest.len() != OBJECT_ID_BYTES {
            return Err(RepositoryError::InvalidObjectId(format!("{digest:02x?}")).into());
        }

        Ok(Self(digest.iter().map(|byte| format!("{byte:02x}")).collect()))
    }

    /// Write the id in its binary form (20 bytes), as used by trees and the index.
    pub fn write_h40_to<W: io::Write>(&self, writer: &mut W) -> anyhow::Result<()> {
        let hex40 = self.as_ref();

        for i in (0..OBJECT_ID_LENGTH).step_by(2) {
            let byte = u8::from_str_radix(&hex40[i..i + 2], 16)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "Invalid hex digit"))?;
            writer.write_all(&[byte])?;
        }

        Ok(())
    }

    /// Read an id from its binary form (20 bytes).
    pub fn read_h40_from<R: io::Read + ?Sized>(reader: &mut R) -> anyhow::Result<Self> {
        let mut digest = [0u8; OBJECT_ID_BYTES];
        reader.read_exact(&mut digest)?;

        Self::from_digest(&digest)
    }

    /// Relative storage path, `ab/c123...` for `abc123...`.
    pub fn to_path(&self) -> PathBuf {
        let (dir, file) = self.0.split_at(2);
        PathBuf::from(dir).join(file)
    }

    /// First 7 characters of the hash
    pub fn to_short_oid(&self) -> String {
        self.0.split_at(7).0.to_string()
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
