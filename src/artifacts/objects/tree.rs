//! Tree object
//!
//! Trees are directory snapshots: each entry names a blob (file or symlink)
//! or a nested tree, together with its mode.
//!
//! ## Format
//!
//! On disk: `tree <size>\0<entries>`
//! Each entry: `<octal mode> <name>\0<20-byte-sha1>`
//!
//! Entries are ordered by name, with directory names compared as if they
//! ended in `/`. Keeping that order is what makes tree ids stable.
//!
//! ## Tree Building
//!
//! [`TreeBuilder`] turns the flat list of index paths into nested levels and
//! stores them children-first, since a parent needs its children's ids.

use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::index::index_entry::IndexEntry;
use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::Component;

/// One stored directory level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    /// Keyed by sort name (`name/` for directories)
    entries: BTreeMap<String, DatabaseEntry>,
}

fn sort_key(name: &str, mode: &EntryMode) -> String {
    if mode.is_tree() {
        format!("{name}/")
    } else {
        name.to_string()
    }
}

impl Tree {
    /// Insert or replace an entry. An existing entry with the same name but
    /// a different kind (file vs directory) is replaced as well.
    pub fn insert(&mut self, name: &str, entry: DatabaseEntry) {
        self.entries.remove(name);
        self.entries.remove(&format!("{name}/"));
        self.entries.insert(sort_key(name, &entry.mode), entry);
    }

    pub fn get(&self, name: &str) -> Option<&DatabaseEntry> {
        self.entries
            .get(name)
            .or_else(|| self.entries.get(&format!("{name}/")))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries in storage order, with plain names.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &DatabaseEntry)> {
        self.entries
            .iter()
            .map(|(key, entry)| (key.trim_end_matches('/'), entry))
    }

    pub fn into_entries(self) -> impl Iterator<Item = (String, DatabaseEntry)> {
        self.entries.into_iter().map(|(mut key, entry)| {
            if entry.is_tree() {
                key.pop();
            }
            (key, entry)
        })
    }
}

impl Packable for Tree {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut content = Vec::new();

        for (name, entry) in self.entries() {
            write!(content, "{:o} {}", entry.mode.as_u32(), name)?;
            content.push(0);
            entry.oid.write_h40_to(&mut content)?;
        }

        Ok(Bytes::from(content))
    }
}

impl Unpackable for Tree {
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self> {
        let mut tree = Tree::default();
        let mut reader = reader;

        // Reuse scratch buffers to reduce allocs
        let mut mode_bytes = Vec::new();
        let mut name_bytes = Vec::new();

        loop {
            mode_bytes.clear();
            let n = reader.read_until(b' ', &mut mode_bytes)?;
            if n == 0 {
                break; // clean EOF: no more entries
            }
            if mode_bytes.pop() != Some(b' ') {
                anyhow::bail!("unexpected EOF in tree entry mode");
            }
            let mode = EntryMode::from_octal_str(std::str::from_utf8(&mode_bytes)?)?;

            name_bytes.clear();
            reader.read_until(b'\0', &mut name_bytes)?;
            if name_bytes.pop() != Some(b'\0') {
                anyhow::bail!("unexpected EOF in tree entry name");
            }
            let name = std::str::from_utf8(&name_bytes)?;

            let oid = ObjectId::read_h40_from(&mut reader)
                .context("unexpected EOF in tree entry object id")?;

            tree.entries
                .insert(sort_key(name, &mode), DatabaseEntry::new(oid, mode));
        }

        Ok(tree)
    }
}

impl Object for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }

    fn display(&self) -> String {
        self.entries()
            .map(|(name, entry)| {
                let object_type = if entry.is_tree() {
                    ObjectType::Tree
                } else {
                    ObjectType::Blob
                };
                format!("{} {} {}\t{}", entry.mode, object_type, entry.oid, name)
            })
            .collect::<Vec<String>>()
            .join("\n")
    }
}

#[derive(Debug, Clone)]
enum BuilderEntry {
    Leaf(DatabaseEntry),
    Directory(TreeBuilder),
}

/// Nested, not-yet-stored tree assembled from index entries.
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    children: BTreeMap<String, BuilderEntry>,
}

impl TreeBuilder {
    /// Group index entries by path segment into nested levels.
    ///
    /// The result only depends on the set of `(path, id, mode)` triples, not
    /// on the order in which they are supplied.
    pub fn build<'e>(entries: impl IntoIterator<Item = &'e IndexEntry>) -> anyhow::Result<Self> {
        let mut root = Self::default();

        for entry in entries {
            let segments = entry
                .name
                .components()
                .map(|component| match component {
                    Component::Normal(segment) => segment
                        .to_str()
                        .map(str::to_string)
                        .with_context(|| format!("non UTF-8 path {:?}", entry.name)),
                    _ => Err(anyhow::anyhow!("invalid index path {:?}", entry.name)),
                })
                .collect::<anyhow::Result<Vec<_>>>()?;

            root.add_entry(
                &segments,
                DatabaseEntry::new(entry.oid.clone(), entry.metadata.mode),
            )?;
        }

        Ok(root)
    }

    fn add_entry(&mut self, segments: &[String], entry: DatabaseEntry) -> anyhow::Result<()> {
        match segments {
            [] => anyhow::bail!("empty index path"),
            [name] => {
                self.children.insert(name.clone(), BuilderEntry::Leaf(entry));
            }
            [parent, rest @ ..] => {
                let child = self
                    .children
                    .entry(parent.clone())
                    .or_insert_with(|| BuilderEntry::Directory(TreeBuilder::default()));

                match child {
                    BuilderEntry::Directory(tree) => tree.add_entry(rest, entry)?,
                    BuilderEntry::Leaf(_) => {
                        anyhow::bail!("'{parent}' is both a file and a directory in the index")
                    }
                }
            }
        }

        Ok(())
    }

    /// Store every level children-first through `store`, returning the root id.
    pub fn traverse<F>(&self, store: &mut F) -> anyhow::Result<ObjectId>
    where
        F: FnMut(&Tree) -> anyhow::Result<ObjectId>,
    {
        let mut tree = Tree::default();

        for (name, child) in &self.children {
            let entry = match child {
                BuilderEntry::Leaf(entry) => entry.clone(),
                BuilderEntry::Directory(subtree) => {
                    DatabaseEntry::new(subtree.traverse(store)?, EntryMode::Directory)
                }
            };
            tree.insert(name, entry);
        }

        store(&tree)
    }
}
