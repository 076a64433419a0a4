use crate::areas::workspace::Workspace;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::index_entry::{EntryMetadata, IndexEntry};
use crate::artifacts::objects::object::Object;
use crate::artifacts::status::file_change::StatusFlags;
use derive_new::new;
use std::path::Path;

/// What the working tree holds at a tracked or untracked path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceState {
    Missing,
    Directory,
    Entry(DatabaseEntry),
}

#[derive(new)]
pub struct Inspector<'w> {
    workspace: &'w Workspace,
}

impl<'w> Inspector<'w> {
    /// The file has not been touched since it was staged.
    pub fn is_stat_clean(index_entry: &IndexEntry, stat: &EntryMetadata) -> bool {
        index_entry.stat_match(stat) && index_entry.times_match(stat)
    }

    /// Id and mode of a working tree file. The staged id is reused when the
    /// stat cache is clean; otherwise the file is hashed.
    pub fn workspace_entry(
        &self,
        path: &str,
        stat: &EntryMetadata,
        index_entry: Option<&IndexEntry>,
    ) -> anyhow::Result<DatabaseEntry> {
        if let Some(index_entry) = index_entry
            && Self::is_stat_clean(index_entry, stat)
        {
            return Ok(DatabaseEntry::new(index_entry.oid.clone(), stat.mode));
        }

        let oid = self.workspace.read_blob(Path::new(path))?.object_id()?;
        Ok(DatabaseEntry::new(oid, stat.mode))
    }

    /// Compare one path across HEAD, the index and the working tree.
    pub fn classify(
        head_entry: Option<&DatabaseEntry>,
        index_entry: Option<&IndexEntry>,
        workspace: &WorkspaceState,
    ) -> StatusFlags {
        let mut flags = StatusFlags::empty();

        match (head_entry, workspace) {
            (None, WorkspaceState::Entry(_)) => flags |= StatusFlags::NEW,
            (None, WorkspaceState::Missing) if index_entry.is_some() => {
                flags |= StatusFlags::DELETED
            }
            (None, WorkspaceState::Directory) if index_entry.is_some() => {
                flags |= StatusFlags::TYPECHANGE
            }
            (None, _) => {}
            (Some(_), WorkspaceState::Missing) => flags |= StatusFlags::DELETED,
            (Some(_), WorkspaceState::Directory) => flags |= StatusFlags::TYPECHANGE,
            (Some(head), WorkspaceState::Entry(current)) => flags |= Self::compare(head, current),
        }

        if let (Some(head), Some(index_entry)) = (head_entry, index_entry) {
            let staged = DatabaseEntry::new(index_entry.oid.clone(), index_entry.metadata.mode);
            flags |= Self::compare(head, &staged);
        }

        flags
    }

    fn compare(old: &DatabaseEntry, new: &DatabaseEntry) -> StatusFlags {
        if old.mode.kind() != new.mode.kind() {
            StatusFlags::TYPECHANGE
        } else if old.oid != new.oid || old.mode != new.mode {
            StatusFlags::MODIFIED
        } else {
            StatusFlags::empty()
        }
    }
}
