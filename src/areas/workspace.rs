//! Working tree access
//!
//! All paths handed to and returned from the workspace are relative to its
//! root. The repository's own `.git` directory is never listed or touched.

use crate::artifacts::core::ignore_rules::IgnoreRules;
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::index::index_entry::EntryMetadata;
use crate::artifacts::objects::blob::Blob;
use crate::errors::RepositoryError;
use anyhow::Context;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

const GIT_DIR_NAME: &str = ".git";

/// Snapshot of the working tree as seen by `status`.
#[derive(Debug, Default)]
pub struct WorkspaceScan {
    /// Files and symlinks that are not ignored
    pub files: BTreeMap<String, EntryMetadata>,
    /// Directories that are not ignored
    pub dirs: BTreeSet<String>,
    /// Ignored files, and ignored directories as `dir/` (not descended into)
    pub ignored: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub struct Workspace {
    path: PathBuf,
}

impl Workspace {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Workspace { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Turn a path given by a caller (absolute, or relative to the working
    /// tree root) into a normalized root-relative path. Anything that lands
    /// outside the root is `PathOutsideRepository`.
    pub fn relative_path(&self, path: &Path) -> anyhow::Result<PathBuf> {
        let outside = || RepositoryError::PathOutsideRepository(path.to_path_buf());

        let relative = match path.strip_prefix(&self.path) {
            Ok(relative) => relative.to_path_buf(),
            Err(_) if path.is_absolute() => lexical_normalize(path)
                .strip_prefix(lexical_normalize(&self.path))
                .map_err(|_| outside())?
                .to_path_buf(),
            Err(_) => path.to_path_buf(),
        };

        let mut normalized = PathBuf::new();
        for component in relative.components() {
            match component {
                Component::CurDir => {}
                Component::Normal(name) => normalized.push(name),
                Component::ParentDir if normalized.pop() => {}
                _ => return Err(outside().into()),
            }
        }

        Ok(normalized)
    }

    /// Root-relative form of a path produced by walking the working tree.
    fn walked_path(&self, full_path: &Path) -> PathBuf {
        full_path
            .strip_prefix(&self.path)
            .unwrap_or(full_path)
            .to_path_buf()
    }

    /// Content of a file, or the target of a symlink.
    pub fn read_blob(&self, file_path: &Path) -> anyhow::Result<Blob> {
        let full_path = self.path.join(file_path);
        let metadata = self.symlink_metadata(file_path)?;

        if metadata.is_dir() {
            return Err(RepositoryError::PathIsDirectory(file_path.to_path_buf()).into());
        }

        let content = if metadata.is_symlink() {
            std::fs::read_link(&full_path)
                .with_context(|| format!("Unable to read link {}", file_path.display()))?
                .as_os_str()
                .as_bytes()
                .to_vec()
        } else {
            std::fs::read(&full_path)
                .with_context(|| format!("Unable to read file {}", file_path.display()))?
        };

        Ok(Blob::new(content))
    }

    pub fn stat_file(&self, file_path: &Path) -> anyhow::Result<EntryMetadata> {
        let metadata = self.symlink_metadata(file_path)?;
        (self.path.join(file_path).as_path(), metadata).try_into()
    }

    /// Stat data for a path, `None` when nothing exists there.
    pub fn try_stat(&self, file_path: &Path) -> anyhow::Result<Option<EntryMetadata>> {
        match self.stat_file(file_path) {
            Ok(metadata) => Ok(Some(metadata)),
            Err(error) if matches!(
                RepositoryError::find(&error),
                Some(RepositoryError::FileNotFound(_))
            ) => Ok(None),
            Err(error) => Err(error),
        }
    }

    fn symlink_metadata(&self, file_path: &Path) -> anyhow::Result<std::fs::Metadata> {
        match std::fs::symlink_metadata(self.path.join(file_path)) {
            Ok(metadata) => Ok(metadata),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                Err(RepositoryError::FileNotFound(file_path.to_path_buf()).into())
            }
            Err(error) => Err(anyhow::Error::new(error)
                .context(format!("Unable to stat {}", file_path.display()))),
        }
    }

    /// Files (and symlinks) at or below `root_file_path`, skipping `.git`
    /// and ignored paths. A single file is returned as-is, ignored or not,
    /// since it was named explicitly.
    pub fn list_files(
        &self,
        root_file_path: &Path,
        ignore: &IgnoreRules,
    ) -> anyhow::Result<Vec<PathBuf>> {
        let metadata = self.symlink_metadata(root_file_path)?;
        if !metadata.is_dir() {
            return Ok(vec![root_file_path.to_path_buf()]);
        }

        let mut files = Vec::new();
        let mut walker = WalkDir::new(self.path.join(root_file_path))
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = entry?;
            let relative = self.walked_path(entry.path());
            if relative.as_os_str().is_empty() {
                continue;
            }

            let is_dir = entry.file_type().is_dir();
            if entry.file_name() == GIT_DIR_NAME || ignore.is_ignored(&relative, is_dir) {
                if is_dir {
                    walker.skip_current_dir();
                }
                continue;
            }

            if !is_dir {
                files.push(relative);
            }
        }

        Ok(files)
    }

    /// Walk the whole working tree once, sorting paths into tracked-able
    /// files, directories and ignored paths.
    pub fn scan(&self, ignore: &IgnoreRules) -> anyhow::Result<WorkspaceScan> {
        let mut scan = WorkspaceScan::default();
        let mut walker = WalkDir::new(&self.path)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = entry?;
            let is_dir = entry.file_type().is_dir();

            if is_dir && entry.file_name() == GIT_DIR_NAME {
                walker.skip_current_dir();
                continue;
            }

            let relative = self.walked_path(entry.path());
            let Some(key) = relative.to_str().map(str::to_string) else {
                tracing::warn!(path = ?relative, "skipping path that is not valid UTF-8");
                if is_dir {
                    walker.skip_current_dir();
                }
                continue;
            };

            if ignore.is_ignored(&relative, is_dir) {
                if is_dir {
                    scan.ignored.insert(format!("{key}/"));
                    walker.skip_current_dir();
                } else {
                    scan.ignored.insert(key);
                }
                continue;
            }

            if is_dir {
                scan.dirs.insert(key);
            } else {
                let metadata = entry.metadata()?;
                scan.files
                    .insert(key, (entry.path(), metadata).try_into()?);
            }
        }

        tracing::debug!(
            files = scan.files.len(),
            ignored = scan.ignored.len(),
            "scanned working tree"
        );
        Ok(scan)
    }

    /// Replace whatever is at `file_path` with `content`, creating parent
    /// directories as needed. Symlinks get `content` as their target.
    pub fn write_file(&self, file_path: &Path, content: &[u8], mode: EntryMode) -> anyhow::Result<()> {
        let full_path = self.path.join(file_path);

        for parent in file_path.ancestors().skip(1) {
            if parent.as_os_str().is_empty() {
                break;
            }
            // a file where a directory is needed
            let parent_path = self.path.join(parent);
            if let Ok(metadata) = std::fs::symlink_metadata(&parent_path)
                && !metadata.is_dir()
            {
                std::fs::remove_file(&parent_path)?;
            }
        }
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory for {}", file_path.display()))?;
        }

        if let Ok(metadata) = std::fs::symlink_metadata(&full_path) {
            if metadata.is_dir() {
                std::fs::remove_dir_all(&full_path).with_context(|| {
                    format!("Failed to remove existing directory: {}", file_path.display())
                })?;
            } else {
                std::fs::remove_file(&full_path)
                    .with_context(|| format!("Failed to remove file: {}", file_path.display()))?;
            }
        }

        match mode {
            EntryMode::Symlink => {
                let target = std::ffi::OsStr::from_bytes(content);
                std::os::unix::fs::symlink(target, &full_path)
                    .with_context(|| format!("Failed to create symlink: {}", file_path.display()))?;
            }
            EntryMode::File(_) => {
                let mut file = std::fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&full_path)
                    .with_context(|| format!("Failed to open file: {}", file_path.display()))?;
                file.write_all(content)
                    .with_context(|| format!("Failed to write to file: {}", file_path.display()))?;

                use std::os::unix::fs::PermissionsExt;
                let permissions = std::fs::Permissions::from_mode(match mode.is_executable() {
                    true => 0o755,
                    false => 0o644,
                });
                std::fs::set_permissions(&full_path, permissions).with_context(|| {
                    format!("Failed to set permissions for file: {}", file_path.display())
                })?;
            }
            EntryMode::Directory => {
                anyhow::bail!("Cannot write a tree as a file: {}", file_path.display())
            }
        }

        Ok(())
    }

    pub fn remove_file(&self, file_path: &Path) -> anyhow::Result<()> {
        let full_path = self.path.join(file_path);
        match std::fs::remove_file(&full_path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(anyhow::Error::new(error)
                .context(format!("Failed to remove file: {}", file_path.display()))),
        }
    }

    /// Remove the now-empty directories between `file_path` and the root.
    pub fn prune_empty_dirs(&self, file_path: &Path) -> anyhow::Result<()> {
        for parent in file_path.ancestors().skip(1) {
            if parent.as_os_str().is_empty() {
                break;
            }

            let dir_path = self.path.join(parent);
            let is_empty = match std::fs::read_dir(&dir_path) {
                Ok(mut entries) => entries.next().is_none(),
                Err(_) => false,
            };
            if !is_empty {
                break;
            }

            std::fs::remove_dir(&dir_path)?;
        }

        Ok(())
    }
}

/// Resolve `.` and `..` without touching the file system.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// `/`-separated string form of a root-relative path.
pub fn path_key(path: &Path) -> anyhow::Result<String> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Invalid path {path:?}"))
}
