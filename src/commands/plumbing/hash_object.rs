use crate::areas::repository::Repository;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::RepositoryError;
use anyhow::Context;
use std::path::Path;

/// Blob for the file at `path`.
pub fn read_blob_file(path: &Path) -> anyhow::Result<Blob> {
    match std::fs::read(path) {
        Ok(content) => Ok(Blob::new(content)),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            Err(RepositoryError::FileNotFound(path.to_path_buf()).into())
        }
        Err(_) if path.is_dir() => Err(RepositoryError::PathIsDirectory(path.to_path_buf()).into()),
        Err(error) => {
            Err(anyhow::Error::new(error).context(format!("Unable to read {}", path.display())))
        }
    }
}

/// Id the file at `path` would have as a blob, without a repository.
pub fn hash_file(path: &Path) -> anyhow::Result<ObjectId> {
    read_blob_file(path)?.object_id()
}

impl Repository {
    /// Id of the file at `path` as a blob; stored as well when `write` is set.
    pub fn hash_object(&self, path: &Path, write: bool) -> anyhow::Result<ObjectId> {
        let blob = read_blob_file(path)?;

        if write {
            self.database()
                .store(&blob)
                .with_context(|| format!("Unable to store {}", path.display()))
        } else {
            blob.object_id()
        }
    }
}
