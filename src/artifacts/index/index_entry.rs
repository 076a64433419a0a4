//! Index entry representation
//!
//! Each entry in the index represents a tracked file with:
//! - File path
//! - Content hash (object ID)
//! - File metadata (mode, size, timestamps)
//!
//! ## Entry Format
//!
//! Entries are stored in a binary format with 8-byte alignment. The stat
//! fields (times, size, inode) are only a cache: when they still match the
//! file on disk the content does not need to be hashed again.

use crate::artifacts::index::entry_mode::{EntryMode, FileMode};
use crate::artifacts::objects::object::{Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::RepositoryError;
use byteorder::{ByteOrder, WriteBytesExt};
use bytes::Bytes;
use derive_new::new;
use is_executable::IsExecutable;
use std::cmp::min;
use std::fs::Metadata;
use std::io::{BufRead, Write};
use std::os::unix::prelude::MetadataExt;
use std::path::{Path, PathBuf};

/// Path lengths at or above this are stored as the sentinel itself
const MAX_PATH_SIZE: usize = 0xFFF;

/// Block size for entry alignment (8 bytes)
pub const ENTRY_BLOCK: usize = 8;

/// 62 fixed bytes, at least one path byte and the NUL terminator
pub const ENTRY_MIN_SIZE: usize = 64;

#[derive(Debug, Clone, Default, new)]
pub struct IndexEntry {
    /// File path relative to the working tree root
    pub name: PathBuf,
    /// Blob id of the staged content
    pub oid: ObjectId,
    pub metadata: EntryMetadata,
}

impl IndexEntry {
    pub fn basename(&self) -> anyhow::Result<&str> {
        self.name
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid file name"))
    }

    /// Path as stored in the index, `/`-separated.
    pub fn key(&self) -> anyhow::Result<&str> {
        self.name
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid entry name {:?}", self.name))
    }

    /// Ancestor directories, outermost first, excluding the root.
    pub fn parent_dirs(&self) -> Vec<&Path> {
        let mut dirs = self
            .name
            .ancestors()
            .skip(1)
            .filter(|dir| !dir.as_os_str().is_empty())
            .collect::<Vec<_>>();
        dirs.reverse();
        dirs
    }

    /// Cheap check: a size or mode difference means the file changed.
    pub fn stat_match(&self, other: &EntryMetadata) -> bool {
        (self.metadata.size == 0 || self.metadata.size == other.size)
            && self.metadata.mode == other.mode
    }

    /// When times match as well, the stored id can be trusted without hashing.
    pub fn times_match(&self, other: &EntryMetadata) -> bool {
        self.metadata.ctime == other.ctime
            && self.metadata.ctime_nsec == other.ctime_nsec
            && self.metadata.mtime == other.mtime
            && self.metadata.mtime_nsec == other.mtime_nsec
    }
}

impl PartialEq for IndexEntry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for IndexEntry {}

impl PartialOrd for IndexEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexEntry {
    // Byte order, not component order: "a-b" sorts before "a/b"
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name
            .as_os_str()
            .as_encoded_bytes()
            .cmp(other.name.as_os_str().as_encoded_bytes())
    }
}

/// Stat data cached per entry.
///
/// - `ctime`: inode change time
/// - `mtime`: content modification time
///
/// Both include nanoseconds. Values are truncated to 32 bits on disk, the
/// same way git does it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryMetadata {
    pub ctime: i64,
    pub ctime_nsec: i64,
    pub mtime: i64,
    pub mtime_nsec: i64,
    pub dev: u64,
    pub ino: u64,
    pub mode: EntryMode,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    /// Path length in the low 12 bits; stage bits are always 0
    pub flags: u32,
}

impl EntryMetadata {
    /// Drop the bits the on-disk format cannot hold, so that freshly
    /// gathered stat data compares equal to data read back from the index.
    pub fn truncated(self) -> Self {
        EntryMetadata {
            ctime: self.ctime as u32 as i64,
            ctime_nsec: self.ctime_nsec as u32 as i64,
            mtime: self.mtime as u32 as i64,
            mtime_nsec: self.mtime_nsec as u32 as i64,
            dev: self.dev as u32 as u64,
            ino: self.ino as u32 as u64,
            size: self.size as u32 as u64,
            ..self
        }
    }
}

impl Packable for IndexEntry {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let entry_name = self.key()?;
        let flags = min(entry_name.len(), MAX_PATH_SIZE) as u16;

        let mut entry_bytes = Vec::with_capacity(ENTRY_MIN_SIZE + entry_name.len());
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.ctime as u32)?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.ctime_nsec as u32)?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.mtime as u32)?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.mtime_nsec as u32)?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.dev as u32)?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.ino as u32)?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.mode.as_u32())?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.uid)?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.gid)?;
        entry_bytes.write_u32::<byteorder::NetworkEndian>(self.metadata.size as u32)?;
        self.oid.write_h40_to(&mut entry_bytes)?;
        entry_bytes.write_u16::<byteorder::NetworkEndian>(flags)?;
        entry_bytes.write_all(entry_name.as_bytes())?;

        // At least one NUL, then pad to the block size
        entry_bytes.push(0);
        while entry_bytes.len() % ENTRY_BLOCK != 0 {
            entry_bytes.push(0);
        }

        Ok(Bytes::from(entry_bytes))
    }
}

impl Unpackable for IndexEntry {
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self> {
        let mut bytes = Vec::new();
        let mut reader = reader;
        reader.read_to_end(&mut bytes)?;

        if bytes.len() < ENTRY_MIN_SIZE {
            return Err(RepositoryError::IndexCorrupt("truncated entry".into()).into());
        }

        let ctime = byteorder::NetworkEndian::read_u32(&bytes[0..4]) as i64;
        let ctime_nsec = byteorder::NetworkEndian::read_u32(&bytes[4..8]) as i64;
        let mtime = byteorder::NetworkEndian::read_u32(&bytes[8..12]) as i64;
        let mtime_nsec = byteorder::NetworkEndian::read_u32(&bytes[12..16]) as i64;
        let dev = byteorder::NetworkEndian::read_u32(&bytes[16..20]) as u64;
        let ino = byteorder::NetworkEndian::read_u32(&bytes[20..24]) as u64;
        let raw_mode = byteorder::NetworkEndian::read_u32(&bytes[24..28]);
        let mode = EntryMode::try_from(raw_mode).map_err(|_| {
            RepositoryError::IndexCorrupt(format!("invalid entry mode {raw_mode:o}"))
        })?;
        let uid = byteorder::NetworkEndian::read_u32(&bytes[28..32]);
        let gid = byteorder::NetworkEndian::read_u32(&bytes[32..36]);
        let size = byteorder::NetworkEndian::read_u32(&bytes[36..40]) as u64;
        let oid = ObjectId::read_h40_from(&mut &bytes[40..60])?;
        let flags = byteorder::NetworkEndian::read_u16(&bytes[60..62]) as u32;

        let name_end = bytes[62..].iter().position(|&b| b == 0).ok_or_else(|| {
            RepositoryError::IndexCorrupt("missing NUL terminator in entry name".into())
        })?;
        let name = std::str::from_utf8(&bytes[62..62 + name_end])
            .map_err(|_| RepositoryError::IndexCorrupt("entry name is not UTF-8".into()))?;

        Ok(IndexEntry {
            name: PathBuf::from(name),
            oid,
            metadata: EntryMetadata {
                ctime,
                ctime_nsec,
                mtime,
                mtime_nsec,
                dev,
                ino,
                mode,
                uid,
                gid,
                size,
                flags,
            },
        })
    }
}

/// Gather stat data for `file_path`; `metadata` must come from
/// `symlink_metadata` so links are recorded as links.
impl TryFrom<(&Path, Metadata)> for EntryMetadata {
    type Error = anyhow::Error;

    fn try_from((file_path, metadata): (&Path, Metadata)) -> Result<Self, Self::Error> {
        let mode = if metadata.is_symlink() {
            EntryMode::Symlink
        } else if metadata.is_dir() {
            EntryMode::Directory
        } else {
            match file_path.is_executable() {
                true => EntryMode::File(FileMode::Executable),
                false => EntryMode::File(FileMode::Regular),
            }
        };
        let path_len = file_path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid file path {file_path:?}"))?
            .len();

        Ok(Self {
            ctime: metadata.ctime(),
            ctime_nsec: metadata.ctime_nsec(),
            mtime: metadata.mtime(),
            mtime_nsec: metadata.mtime_nsec(),
            dev: metadata.dev(),
            ino: metadata.ino(),
            mode,
            uid: metadata.uid(),
            gid: metadata.gid(),
            size: metadata.size(),
            flags: min(path_len, MAX_PATH_SIZE) as u32,
        }
        .truncated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::io::Cursor;

    #[fixture]
    fn oid() -> ObjectId {
        ObjectId::try_parse("95d09f2b10159347eece71399a7e2e907ea3df4f").unwrap()
    }

    #[fixture]
    fn entry_metadata() -> EntryMetadata {
        EntryMetadata {
            mode: EntryMode::File(FileMode::Regular),
            mtime: 1_700_000_000,
            size: 11,
            ..Default::default()
        }
    }

    #[rstest]
    fn parent_dirs_are_listed_outermost_first(oid: ObjectId, entry_metadata: EntryMetadata) {
        let entry = IndexEntry::new(PathBuf::from("a/b/c"), oid, entry_metadata);

        pretty_assertions::assert_eq!(entry.parent_dirs(), vec![Path::new("a"), Path::new("a/b")]);
    }

    #[rstest]
    fn top_level_entry_has_no_parent_dirs(oid: ObjectId, entry_metadata: EntryMetadata) {
        let entry = IndexEntry::new(PathBuf::from("a"), oid, entry_metadata);

        pretty_assertions::assert_eq!(entry.parent_dirs(), Vec::<&Path>::new());
        pretty_assertions::assert_eq!(entry.basename().unwrap(), "a");
    }

    #[rstest]
    #[case("a")]
    #[case("abcdefg")]
    #[case("nested/dir/file.txt")]
    fn serialized_entries_are_block_aligned(
        #[case] name: &str,
        oid: ObjectId,
        entry_metadata: EntryMetadata,
    ) {
        let entry = IndexEntry::new(PathBuf::from(name), oid, entry_metadata);
        let bytes = entry.serialize().unwrap();

        assert_eq!(bytes.len() % ENTRY_BLOCK, 0);
        assert_eq!(bytes[62 + name.len()], 0);

        let parsed = IndexEntry::deserialize(Cursor::new(bytes)).unwrap();
        assert_eq!(parsed.name, PathBuf::from(name));
        assert_eq!(parsed.metadata.flags as usize, name.len());
        assert_eq!(parsed.metadata.size, 11);
    }

    #[rstest]
    fn entries_order_by_path_bytes(oid: ObjectId, entry_metadata: EntryMetadata) {
        let nested = IndexEntry::new(PathBuf::from("a/b"), oid.clone(), entry_metadata.clone());
        let dashed = IndexEntry::new(PathBuf::from("a-b"), oid, entry_metadata);

        assert!(dashed < nested);
    }

    #[rstest]
    fn unknown_mode_is_corruption(oid: ObjectId, entry_metadata: EntryMetadata) {
        let entry = IndexEntry::new(PathBuf::from("x"), oid, entry_metadata);
        let mut bytes = entry.serialize().unwrap().to_vec();
        bytes[24..28].copy_from_slice(&0o100600u32.to_be_bytes());

        let error = IndexEntry::deserialize(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(
            RepositoryError::find(&error),
            Some(RepositoryError::IndexCorrupt(_))
        ));
    }
}
