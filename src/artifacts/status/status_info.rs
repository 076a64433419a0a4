use crate::areas::index::Index;
use crate::areas::repository::Repository;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::index_entry::EntryMetadata;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::status::file_change::{StatusCategory, StatusFlags};
use crate::artifacts::status::inspector::{Inspector, WorkspaceState};
use derive_new::new;
use std::collections::{BTreeMap, BTreeSet};

pub type HeadTree = BTreeMap<String, DatabaseEntry>;

/// Paths grouped by their strongest difference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    categories: BTreeMap<StatusCategory, BTreeSet<String>>,
    /// old path -> new path
    renames: BTreeMap<String, String>,
}

impl StatusReport {
    /// Sorted paths in one category. Renamed paths are listed by new name.
    pub fn paths(&self, category: StatusCategory) -> Vec<&str> {
        self.categories
            .get(&category)
            .map(|paths| paths.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn renames(&self) -> impl Iterator<Item = (&str, &str)> {
        self.renames
            .iter()
            .map(|(old, new)| (old.as_str(), new.as_str()))
    }

    /// Nothing differs apart from ignored paths.
    pub fn is_clean(&self) -> bool {
        self.categories
            .iter()
            .all(|(category, paths)| *category == StatusCategory::Ignored || paths.is_empty())
    }

    /// Every reported line as (category, path), renames as `old -> new`.
    pub fn lines(&self) -> Vec<(StatusCategory, String)> {
        let old_names = self
            .renames
            .iter()
            .map(|(old, new)| (new.as_str(), old.as_str()))
            .collect::<BTreeMap<_, _>>();

        StatusCategory::ALL
            .iter()
            .flat_map(|category| {
                self.paths(*category).into_iter().map(|path| {
                    let line = match old_names.get(path) {
                        Some(old) if *category == StatusCategory::Renamed => {
                            format!("{old} -> {path}")
                        }
                        _ => path.to_string(),
                    };
                    (*category, line)
                })
            })
            .collect()
    }

    fn insert(&mut self, category: StatusCategory, path: String) {
        self.categories.entry(category).or_default().insert(path);
    }
}

#[derive(new)]
pub struct Status<'r> {
    repository: &'r Repository,
}

impl<'r> Status<'r> {
    /// Compare HEAD, `index` and the working tree. Index entries whose files
    /// were only touched get their stat data refreshed in `index`.
    pub fn collect(&self, index: &mut Index) -> anyhow::Result<StatusReport> {
        let workspace = self.repository.workspace()?;
        let ignore = self.repository.ignore_rules()?;
        let scan = workspace.scan(&ignore)?;
        let head_tree = self.load_head_tree()?;
        let inspector = Inspector::new(workspace);

        let mut paths = head_tree.keys().cloned().collect::<BTreeSet<_>>();
        for entry in index.entries() {
            paths.insert(entry.key()?.to_string());
        }
        paths.extend(scan.files.keys().cloned());

        let mut flags = BTreeMap::<String, StatusFlags>::new();
        let mut current_ids = BTreeMap::<String, ObjectId>::new();
        let mut refreshed = Vec::<(String, EntryMetadata)>::new();

        for path in paths {
            if Self::is_hidden(&path, &scan.ignored) {
                continue;
            }

            let head_entry = head_tree.get(&path);
            let index_entry = index.entry_by_path(&path);

            let state = match scan.files.get(&path) {
                Some(stat) => {
                    let current = inspector.workspace_entry(&path, stat, index_entry)?;
                    if let Some(index_entry) = index_entry
                        && !Inspector::is_stat_clean(index_entry, stat)
                        && index_entry.oid == current.oid
                        && index_entry.metadata.mode == current.mode
                    {
                        refreshed.push((path.clone(), stat.clone()));
                    }
                    current_ids.insert(path.clone(), current.oid.clone());
                    WorkspaceState::Entry(current)
                }
                None if scan.dirs.contains(&path) => WorkspaceState::Directory,
                None => WorkspaceState::Missing,
            };

            let path_flags = Inspector::classify(head_entry, index_entry, &state);
            if !path_flags.is_empty() {
                flags.insert(path, path_flags);
            }
        }

        for path in &scan.ignored {
            *flags.entry(path.clone()).or_default() |= StatusFlags::IGNORED;
        }

        let renames = Self::detect_renames(&mut flags, &head_tree, index, &current_ids);

        for (path, stat) in refreshed {
            index.update_entry_stat(&path, stat);
        }

        let mut report = StatusReport {
            renames,
            ..Default::default()
        };
        for (path, path_flags) in flags {
            if let Some(category) = path_flags.category() {
                report.insert(category, path);
            }
        }

        tracing::debug!(clean = report.is_clean(), "collected status");
        Ok(report)
    }

    fn load_head_tree(&self) -> anyhow::Result<HeadTree> {
        match self.repository.head_oid()? {
            Some(head_oid) => {
                let commit = self.repository.database().load_commit(&head_oid)?;
                self.repository.database().flatten_tree(commit.tree_oid())
            }
            None => Ok(HeadTree::new()),
        }
    }

    /// A tracked path inside an ignored directory is not looked at.
    fn is_hidden(path: &str, ignored: &BTreeSet<String>) -> bool {
        path.match_indices('/')
            .any(|(position, _)| ignored.contains(&path[..=position]))
    }

    /// Pair each deleted path with a new path holding the same content.
    fn detect_renames(
        flags: &mut BTreeMap<String, StatusFlags>,
        head_tree: &HeadTree,
        index: &Index,
        current_ids: &BTreeMap<String, ObjectId>,
    ) -> BTreeMap<String, String> {
        let of_category = |flags: &BTreeMap<String, StatusFlags>, category| {
            flags
                .iter()
                .filter(|(_, path_flags)| path_flags.category() == Some(category))
                .map(|(path, _)| path.clone())
                .collect::<Vec<_>>()
        };

        let deleted = of_category(flags, StatusCategory::Deleted);
        let mut added = of_category(flags, StatusCategory::New);
        let mut renames = BTreeMap::new();

        for old_path in deleted {
            let old_oid = match head_tree.get(&old_path) {
                Some(entry) => Some(&entry.oid),
                None => index.entry_by_path(&old_path).map(|entry| &entry.oid),
            };
            let Some(old_oid) = old_oid else {
                continue;
            };

            let matching = added
                .iter()
                .position(|new_path| current_ids.get(new_path) == Some(old_oid));
            if let Some(position) = matching {
                let new_path = added.remove(position);
                flags.remove(&old_path);
                if let Some(path_flags) = flags.get_mut(&new_path) {
                    *path_flags |= StatusFlags::RENAMED;
                }
                renames.insert(old_path, new_path);
            }
        }

        renames
    }
}
