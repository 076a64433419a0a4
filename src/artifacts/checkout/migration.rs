//! Checkout planning and execution
//!
//! A [`Migration`] is planned against the current working tree first and
//! applied afterwards:
//!
//! 1. Flatten the target tree and compare each entry with the file on disk,
//!    reusing staged ids through the index stat cache
//! 2. Remove working tree files the target does not have, one at a time,
//!    pruning directories they leave empty
//! 3. Write the differing entries, each on the blocking thread pool, and
//!    wait for every write before reporting

use crate::areas::database::Database;
use crate::areas::repository::Repository;
use crate::areas::workspace::Workspace;
use crate::artifacts::checkout::CheckoutReport;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::status::inspector::Inspector;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::task::JoinSet;

#[derive(Debug)]
pub struct Migration {
    database: Database,
    workspace: Workspace,
    /// Entries that must be (re)written
    writes: BTreeMap<String, DatabaseEntry>,
    /// Working tree files with no counterpart in the target
    removals: Vec<String>,
}

impl Migration {
    pub fn plan(repository: &Repository, tree_oid: &ObjectId) -> anyhow::Result<Self> {
        let workspace = repository.workspace()?;
        let database = repository.database();
        let target = database.flatten_tree(tree_oid)?;

        let ignore = repository.ignore_rules()?;
        let scan = workspace.scan(&ignore)?;
        let index = repository.refresh_index()?;
        let inspector = Inspector::new(workspace);

        let mut writes = BTreeMap::new();
        for (path, entry) in target.iter() {
            // ignored paths are missing from the scan but may still be tracked
            let stat = match scan.files.get(path) {
                Some(stat) => Some(stat.clone()),
                None => workspace
                    .try_stat(Path::new(path))?
                    .filter(|stat| !stat.mode.is_tree()),
            };

            let up_to_date = match stat {
                Some(stat) => {
                    inspector.workspace_entry(path, &stat, index.entry_by_path(path))? == *entry
                }
                None => false,
            };
            if !up_to_date {
                writes.insert(path.clone(), entry.clone());
            }
        }

        let removals = scan
            .files
            .keys()
            .filter(|path| !target.contains_key(*path))
            .cloned()
            .collect::<Vec<_>>();

        tracing::debug!(
            tree = %tree_oid,
            writes = writes.len(),
            removals = removals.len(),
            "planned checkout"
        );

        Ok(Migration {
            database: database.clone(),
            workspace: workspace.clone(),
            writes,
            removals,
        })
    }

    pub fn is_noop(&self) -> bool {
        self.writes.is_empty() && self.removals.is_empty()
    }

    /// Apply the plan. Every write has finished (or failed) by the time this
    /// returns; the first failure is returned.
    pub async fn apply(self) -> anyhow::Result<CheckoutReport> {
        let mut report = CheckoutReport::default();

        for path in &self.removals {
            let path = Path::new(path);
            self.workspace.remove_file(path)?;
            self.workspace.prune_empty_dirs(path)?;
            report.removed += 1;
        }

        let mut tasks = JoinSet::new();
        for (path, entry) in self.writes {
            let database = self.database.clone();
            let workspace = self.workspace.clone();

            tasks.spawn_blocking(move || -> anyhow::Result<()> {
                let blob = database.load_blob(&entry.oid)?;
                workspace.write_file(Path::new(&path), blob.content(), entry.mode)?;
                tracing::trace!(%path, oid = %entry.oid, "wrote file");
                Ok(())
            });
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined.map_err(anyhow::Error::from).and_then(|written| written) {
                Ok(()) => report.written += 1,
                Err(error) => {
                    first_error.get_or_insert(error);
                }
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(report),
        }
    }
}
