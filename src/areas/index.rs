//! Index (staging area)
//!
//! The index tracks which blob each path will have in the next commit,
//! together with cached stat data for cheap change detection.
//!
//! An [`Index`] is a plain owned value: [`Index::load`] reads it from disk,
//! callers mutate it, and [`Index::write`] persists it through
//! `<root>/index.lock`. Nothing is shared between operations.
//!
//! ## Data Structures
//!
//! - `entries`: path -> entry, ordered by path bytes (the on-disk order)
//! - `children`: directory -> every tracked path below it, so a file can
//!   replace a directory (and vice versa) without scanning all entries

use crate::areas::database::Database;
use crate::areas::workspace::{Workspace, path_key};
use crate::artifacts::core::lockfile::LockFile;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::checksum::Checksum;
use crate::artifacts::index::index_entry::{ENTRY_BLOCK, ENTRY_MIN_SIZE, EntryMetadata, IndexEntry};
use crate::artifacts::index::index_header::IndexHeader;
use crate::artifacts::index::HEADER_SIZE;
use crate::artifacts::objects::object::{Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::{Tree, TreeBuilder};
use anyhow::Context;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read};
use std::ops::DerefMut;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Index {
    /// Path to the index file (typically `.git/index`)
    path: PathBuf,
    entries: BTreeMap<String, IndexEntry>,
    children: BTreeMap<String, BTreeSet<String>>,
    changed: bool,
}

impl Index {
    /// An empty index that will be written to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Index {
            path: path.into(),
            entries: BTreeMap::new(),
            children: BTreeMap::new(),
            changed: false,
        }
    }

    /// Read the index file under a shared lock. A missing or empty file is
    /// an empty index.
    pub fn load(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let mut index = Index::new(path);

        let mut index_file = match std::fs::File::open(&index.path) {
            Ok(file) => file,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(index),
            Err(error) => {
                return Err(anyhow::Error::new(error)
                    .context(format!("Unable to open index {}", index.path.display())));
            }
        };

        let mut content = Vec::new();
        {
            let mut lock = file_guard::lock(&mut index_file, file_guard::Lock::Shared, 0, 1)?;
            lock.deref_mut().read_to_end(&mut content)?;
        }

        if content.is_empty() {
            return Ok(index);
        }

        let mut reader = Checksum::new(Cursor::new(content));
        let entries_count = Self::parse_header(&mut reader)?;
        index.parse_entries(entries_count, &mut reader)?;
        reader.verify()?;

        tracing::debug!(entries = index.len(), "loaded index");
        Ok(index)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn entry_by_path(&self, path: &str) -> Option<&IndexEntry> {
        self.entries.get(path)
    }

    /// True for a tracked file, or a directory containing tracked files.
    pub fn is_directly_tracked(&self, path: &str) -> bool {
        self.entries.contains_key(path) || self.children.contains_key(path)
    }

    fn parse_header(reader: &mut Checksum<Cursor<Vec<u8>>>) -> anyhow::Result<u32> {
        let header_bytes = reader.read(HEADER_SIZE)?;
        let header = IndexHeader::deserialize(Cursor::new(header_bytes))?;
        header.validate()?;

        Ok(header.entries_count)
    }

    /// Each entry is at least [`ENTRY_MIN_SIZE`] bytes and ends with a NUL
    /// on an 8-byte boundary.
    fn parse_entries(
        &mut self,
        entries_count: u32,
        reader: &mut Checksum<Cursor<Vec<u8>>>,
    ) -> anyhow::Result<()> {
        for _ in 0..entries_count {
            let mut entry_bytes = reader.read(ENTRY_MIN_SIZE)?.to_vec();

            while entry_bytes.last() != Some(&0) {
                entry_bytes.extend_from_slice(&reader.read(ENTRY_BLOCK)?);
            }

            let entry = IndexEntry::deserialize(Cursor::new(entry_bytes))?;
            self.store_entry(entry)?;
        }

        Ok(())
    }

    /// Insert or replace an entry. Tracked files at any of its parent paths
    /// and tracked paths below it are dropped first.
    pub fn add(&mut self, entry: IndexEntry) -> anyhow::Result<()> {
        self.discard_conflicts(&entry)?;
        self.store_entry(entry)?;
        self.changed = true;

        Ok(())
    }

    /// Drop `path` and everything tracked below it.
    pub fn remove(&mut self, path: &str) -> anyhow::Result<()> {
        self.remove_entry(path)?;
        self.remove_children(path)?;
        self.changed = true;

        Ok(())
    }

    pub fn update_entry_stat(&mut self, path: &str, stat: EntryMetadata) {
        if let Some(existing_entry) = self.entries.get_mut(path) {
            existing_entry.metadata = EntryMetadata {
                mode: existing_entry.metadata.mode,
                ..stat
            };
            self.changed = true;
        }
    }

    fn discard_conflicts(&mut self, entry: &IndexEntry) -> anyhow::Result<()> {
        for parent in entry.parent_dirs() {
            self.remove_entry(&path_key(parent)?)?;
        }
        self.remove_children(entry.key()?)
    }

    fn store_entry(&mut self, entry: IndexEntry) -> anyhow::Result<()> {
        let key = entry.key()?.to_string();

        for parent in entry.parent_dirs() {
            self.children
                .entry(path_key(parent)?)
                .or_default()
                .insert(key.clone());
        }
        self.entries.insert(key, entry);

        Ok(())
    }

    fn remove_children(&mut self, path: &str) -> anyhow::Result<()> {
        if let Some(children) = self.children.remove(path) {
            for child in children {
                self.remove_entry(&child)?;
            }
        }

        Ok(())
    }

    fn remove_entry(&mut self, path: &str) -> anyhow::Result<()> {
        if let Some(entry) = self.entries.remove(path) {
            for parent in entry.parent_dirs() {
                let parent = path_key(parent)?;
                if let Some(children) = self.children.get_mut(&parent) {
                    children.remove(path);
                    if children.is_empty() {
                        self.children.remove(&parent);
                    }
                }
            }
        }

        Ok(())
    }

    /// Persist through `<index>.lock`. The previous index stays in place
    /// until the final rename.
    pub fn write(&mut self) -> anyhow::Result<()> {
        let lock = LockFile::acquire(&self.path)?;
        let mut writer = Checksum::new(lock);

        let header = IndexHeader::for_entries(self.entries.len() as u32);
        writer.write(&header.serialize()?)?;

        for entry in self.entries() {
            writer.write(&entry.serialize()?)?;
        }

        writer.write_checksum()?;
        writer.into_inner().commit()?;
        self.changed = false;

        tracing::debug!(entries = self.entries.len(), "wrote index");
        Ok(())
    }

    /// Store one tree per directory level, bottom-up, and return the root id.
    pub fn write_tree(&self, database: &Database) -> anyhow::Result<ObjectId> {
        let builder = TreeBuilder::build(self.entries())?;
        let root = builder.traverse(&mut |tree: &Tree| database.store(tree))?;

        tracing::debug!(tree = %root, "wrote tree");
        Ok(root)
    }

    /// Replace all entries with the flattened contents of a tree. Stat data
    /// is taken from the working tree where a matching file exists.
    pub fn read_tree(
        &mut self,
        flat_tree: BTreeMap<String, DatabaseEntry>,
        workspace: Option<&Workspace>,
    ) -> anyhow::Result<()> {
        self.entries.clear();
        self.children.clear();

        for (path, entry) in flat_tree {
            let stat = match workspace {
                Some(workspace) => workspace
                    .try_stat(Path::new(&path))
                    .with_context(|| format!("Unable to stat {path}"))?
                    .filter(|stat| stat.mode == entry.mode),
                None => None,
            };
            let metadata = stat.unwrap_or(EntryMetadata {
                mode: entry.mode,
                ..Default::default()
            });

            self.store_entry(IndexEntry::new(PathBuf::from(path), entry.oid, metadata))?;
        }
        self.changed = true;

        Ok(())
    }

    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    pub fn into_entries(self) -> impl Iterator<Item = IndexEntry> {
        self.entries.into_values()
    }
}
