//! Loose object database
//!
//! Objects live under `objects/<2 hex>/<38 hex>`, zlib-compressed, each one
//! the framed `<type> <size>\0<payload>` whose SHA-1 is its id. Writes go to
//! a temp file in the fan-out directory and are renamed into place, so a
//! reader never sees a partial object. Reads decompress and re-hash, so a
//! damaged file is reported instead of silently returning wrong content.

use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::{self, Object, ObjectBox, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use crate::errors::RepositoryError;
use anyhow::Context;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

// TODO: read objects from packfiles so clones of git-created repositories work
impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Database { path: path.into() }
    }

    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self, object_id: &ObjectId) -> bool {
        self.path.join(object_id.to_path()).is_file()
    }

    /// Store an object unless an object with the same id is already present.
    pub fn store(&self, object: &impl Object) -> anyhow::Result<ObjectId> {
        self.store_raw(object.object_type(), &object.serialize()?)
    }

    pub fn store_raw(&self, object_type: ObjectType, payload: &[u8]) -> anyhow::Result<ObjectId> {
        let framed = object::frame(object_type, payload);
        let object_id = object::hash_framed(&framed)?;
        let object_path = self.path.join(object_id.to_path());

        if !object_path.exists() {
            tracing::debug!(%object_id, %object_type, size = payload.len(), "storing object");
            self.write_object(&object_path, &framed)?;
        }

        Ok(object_id)
    }

    /// Read and verify an object, returning its type and payload.
    pub fn load(&self, object_id: &ObjectId) -> anyhow::Result<(ObjectType, Bytes)> {
        let object_path = self.path.join(object_id.to_path());
        let compressed = match std::fs::read(&object_path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(RepositoryError::ObjectNotFound(object_id.to_string()).into());
            }
            Err(error) => {
                return Err(anyhow::Error::new(error).context(format!(
                    "Unable to read object file {}",
                    object_path.display()
                )));
            }
        };

        let corrupt = |reason: String| RepositoryError::ObjectCorrupt {
            id: object_id.to_string(),
            reason,
        };

        let framed = Self::decompress(&compressed)
            .map_err(|error| corrupt(format!("zlib stream: {error}")))?;

        if object::hash_framed(&framed)? != *object_id {
            return Err(corrupt("content does not hash to its id".into()).into());
        }

        let mut reader = Cursor::new(&framed[..]);
        let (object_type, size) = ObjectType::parse_header(&mut reader)
            .map_err(|error| corrupt(format!("header: {error}")))?;
        let payload = framed.slice(reader.position() as usize..);

        if payload.len() != size {
            return Err(corrupt(format!(
                "header declares {size} bytes, payload has {}",
                payload.len()
            ))
            .into());
        }

        tracing::trace!(%object_id, %object_type, size, "loaded object");
        Ok((object_type, payload))
    }

    pub fn parse_object(&self, object_id: &ObjectId) -> anyhow::Result<ObjectBox> {
        let (object_type, payload) = self.load(object_id)?;
        let reader = Cursor::new(payload);

        let parsed = match object_type {
            ObjectType::Blob => Blob::deserialize(reader).map(|blob| ObjectBox::Blob(Box::new(blob))),
            ObjectType::Tree => Tree::deserialize(reader).map(|tree| ObjectBox::Tree(Box::new(tree))),
            ObjectType::Commit => {
                Commit::deserialize(reader).map(|commit| ObjectBox::Commit(Box::new(commit)))
            }
        };

        parsed.map_err(|error| {
            RepositoryError::ObjectCorrupt {
                id: object_id.to_string(),
                reason: error.to_string(),
            }
            .into()
        })
    }

    pub fn load_blob(&self, object_id: &ObjectId) -> anyhow::Result<Blob> {
        match self.parse_object(object_id)? {
            ObjectBox::Blob(blob) => Ok(*blob),
            other => Err(Self::unexpected(object_id, ObjectType::Blob, other.object_type())),
        }
    }

    pub fn load_tree(&self, object_id: &ObjectId) -> anyhow::Result<Tree> {
        match self.parse_object(object_id)? {
            ObjectBox::Tree(tree) => Ok(*tree),
            other => Err(Self::unexpected(object_id, ObjectType::Tree, other.object_type())),
        }
    }

    pub fn load_commit(&self, object_id: &ObjectId) -> anyhow::Result<Commit> {
        match self.parse_object(object_id)? {
            ObjectBox::Commit(commit) => Ok(*commit),
            other => Err(Self::unexpected(object_id, ObjectType::Commit, other.object_type())),
        }
    }

    fn unexpected(object_id: &ObjectId, expected: ObjectType, actual: ObjectType) -> anyhow::Error {
        RepositoryError::UnexpectedObjectKind {
            id: object_id.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
        .into()
    }

    /// Every blob and symlink reachable from `tree_id`, keyed by its
    /// `/`-separated path. Keys sort by bytes, like index paths.
    pub fn flatten_tree(&self, tree_id: &ObjectId) -> anyhow::Result<BTreeMap<String, DatabaseEntry>> {
        let mut entries = BTreeMap::new();
        self.flatten_into(tree_id, "", &mut entries)?;
        Ok(entries)
    }

    fn flatten_into(
        &self,
        tree_id: &ObjectId,
        prefix: &str,
        entries: &mut BTreeMap<String, DatabaseEntry>,
    ) -> anyhow::Result<()> {
        for (name, entry) in self.load_tree(tree_id)?.into_entries() {
            let path = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}/{name}")
            };

            if entry.is_tree() {
                self.flatten_into(&entry.oid, &path, entries)?;
            } else {
                entries.insert(path, entry);
            }
        }

        Ok(())
    }

    /// All objects whose id starts with `prefix`.
    ///
    /// Prefixes of 2+ characters only look inside their fan-out directory.
    pub fn find_by_prefix(&self, prefix: &str) -> anyhow::Result<Vec<ObjectId>> {
        let prefix = prefix.to_ascii_lowercase();
        let mut matches = Vec::new();

        let dirs = if prefix.len() >= 2 {
            vec![prefix[..2].to_string()]
        } else {
            (0..=255u8).map(|i| format!("{i:02x}")).collect()
        };

        for dir_name in dirs {
            let dir_path = self.path.join(&dir_name);
            if !dir_path.is_dir() {
                continue;
            }

            for entry in std::fs::read_dir(&dir_path)? {
                let file_name = entry?.file_name();
                let full_oid = format!("{dir_name}{}", file_name.to_string_lossy());

                // temp files and other strays are skipped
                if full_oid.len() == OBJECT_ID_LENGTH
                    && full_oid.starts_with(&prefix)
                    && let Ok(oid) = ObjectId::try_parse(&full_oid)
                {
                    matches.push(oid);
                }
            }
        }

        matches.sort();
        Ok(matches)
    }

    fn write_object(&self, object_path: &Path, framed: &[u8]) -> anyhow::Result<()> {
        let object_dir = object_path
            .parent()
            .with_context(|| format!("Invalid object path {}", object_path.display()))?;
        std::fs::create_dir_all(object_dir).with_context(|| {
            format!("Unable to create object directory {}", object_dir.display())
        })?;

        let temp_object_path = object_dir.join(Self::generate_temp_name());
        let compressed = Self::compress(framed)?;

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_object_path)
            .with_context(|| {
                format!("Unable to open object file {}", temp_object_path.display())
            })?;

        let written = file
            .write_all(&compressed)
            .and_then(|_| file.sync_all())
            .with_context(|| format!("Unable to write object file {}", temp_object_path.display()))
            .and_then(|_| {
                std::fs::rename(&temp_object_path, object_path).with_context(|| {
                    format!("Unable to rename object file to {}", object_path.display())
                })
            });

        if written.is_err() {
            let _ = std::fs::remove_file(&temp_object_path);
        }

        written
    }

    fn compress(data: &[u8]) -> anyhow::Result<Vec<u8>> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(data)
            .context("Unable to compress object content")?;

        encoder
            .finish()
            .context("Unable to finish compressing object content")
    }

    fn decompress(data: &[u8]) -> std::io::Result<Bytes> {
        let mut decoder = flate2::read::ZlibDecoder::new(data);
        let mut decompressed_content = Vec::new();
        decoder.read_to_end(&mut decompressed_content)?;

        Ok(decompressed_content.into())
    }

    fn generate_temp_name() -> String {
        format!(
            "tmp-obj-{}-{}",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        )
    }
}
