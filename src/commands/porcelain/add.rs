use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::index::index_entry::IndexEntry;
use crate::artifacts::objects::object_id::ObjectId;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::task::JoinSet;

impl Repository {
    /// Stage one file: store its content as a blob and upsert its entry.
    /// Fails with `FileNotFound`, `PathIsDirectory` or
    /// `PathOutsideRepository` without touching the index.
    pub fn add_by_path(&self, index: &mut Index, path: impl AsRef<Path>) -> anyhow::Result<ObjectId> {
        let workspace = self.workspace()?;
        let path = workspace.relative_path(path.as_ref())?;

        let blob = workspace.read_blob(&path)?;
        let stat = workspace.stat_file(&path)?;
        let oid = self.database().store(&blob)?;

        index.add(IndexEntry::new(path, oid.clone(), stat))?;
        Ok(oid)
    }

    /// Stage `paths` (files, or directories expanded to the files below
    /// them), store the tree they describe, then write the index. Nothing
    /// is written to the index when any path fails. Returns the paths as
    /// given.
    pub async fn add(&self, paths: &[impl AsRef<Path>]) -> anyhow::Result<Vec<String>> {
        let workspace = self.workspace()?;
        let ignore = self.ignore_rules()?;
        let mut index = self.refresh_index()?;

        let relatives = paths
            .iter()
            .map(|path| workspace.relative_path(path.as_ref()))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let mut files = BTreeSet::<PathBuf>::new();
        for relative in &relatives {
            files.extend(workspace.list_files(relative, &ignore)?);
        }

        let mut tasks = JoinSet::new();
        for file in files {
            let workspace = workspace.clone();
            let database = self.database().clone();

            tasks.spawn_blocking(move || -> anyhow::Result<IndexEntry> {
                let blob = workspace.read_blob(&file)?;
                let stat = workspace.stat_file(&file)?;
                let oid = database.store(&blob)?;
                Ok(IndexEntry::new(file, oid, stat))
            });
        }

        let mut entries = Vec::new();
        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined.map_err(anyhow::Error::from).and_then(|staged| staged) {
                Ok(entry) => entries.push(entry),
                Err(error) => {
                    first_error.get_or_insert(error);
                }
            }
        }
        if let Some(error) = first_error {
            return Err(error);
        }

        entries.sort();
        for entry in entries {
            index.add(entry)?;
        }
        // a tree that cannot be built must not reach the index file
        let tree_oid = index.write_tree(self.database())?;
        index.write()?;
        tracing::debug!(files = index.len(), tree = %tree_oid, "staged paths");

        Ok(paths
            .iter()
            .map(|path| path.as_ref().to_string_lossy().into_owned())
            .collect())
    }
}
