//! Exclusive `<file>.lock` writes
//!
//! The lock file is created with `create_new`, so a second writer fails
//! immediately instead of waiting. Content is written to the lock file and
//! renamed over the target on [`LockFile::commit`]. Dropping an uncommitted
//! lock removes it and leaves the target untouched.

use anyhow::Context;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct LockFile {
    target: PathBuf,
    lock_path: PathBuf,
    file: Option<File>,
}

impl LockFile {
    pub fn acquire(target: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let target = target.into();
        let mut lock_name = target.clone().into_os_string();
        lock_name.push(".lock");
        let lock_path = PathBuf::from(lock_name);

        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .map_err(|error| match error.kind() {
                io::ErrorKind::AlreadyExists => anyhow::anyhow!(
                    "Unable to create '{}': File exists. Another process may be writing to it",
                    lock_path.display()
                ),
                _ => anyhow::Error::new(error)
                    .context(format!("Unable to create '{}'", lock_path.display())),
            })?;

        tracing::trace!(lock = %lock_path.display(), "acquired lock");

        Ok(LockFile {
            target,
            lock_path,
            file: Some(file),
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Flush and atomically replace the target with the written content.
    pub fn commit(mut self) -> anyhow::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()?;
            file.sync_all()?;
        }

        std::fs::rename(&self.lock_path, &self.target).with_context(|| {
            format!(
                "Unable to rename '{}' to '{}'",
                self.lock_path.display(),
                self.target.display()
            )
        })?;

        tracing::trace!(target = %self.target.display(), "committed lock");
        Ok(())
    }
}

impl Write for LockFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.file.as_mut() {
            Some(file) => file.write(buf),
            None => Err(io::Error::other("lock already committed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        // still holding the file means commit never ran
        if self.file.take().is_some() {
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;

    #[test]
    fn commit_replaces_the_target() {
        let dir = TempDir::new().unwrap();
        let target = dir.child("HEAD");
        target.write_str("old\n").unwrap();

        let mut lock = LockFile::acquire(target.path()).unwrap();
        lock.write_all(b"new\n").unwrap();
        lock.commit().unwrap();

        target.assert("new\n");
        dir.child("HEAD.lock").assert(predicates::path::missing());
    }

    #[test]
    fn second_writer_fails_fast() {
        let dir = TempDir::new().unwrap();
        let target = dir.child("index");

        let _held = LockFile::acquire(target.path()).unwrap();
        let error = LockFile::acquire(target.path()).unwrap_err();

        assert!(error.to_string().contains("File exists"));
    }

    #[test]
    fn dropped_lock_leaves_target_untouched() {
        let dir = TempDir::new().unwrap();
        let target = dir.child("index");
        target.write_str("intact").unwrap();

        {
            let mut lock = LockFile::acquire(target.path()).unwrap();
            lock.write_all(b"partial").unwrap();
        }

        target.assert("intact");
        dir.child("index.lock").assert(predicates::path::missing());
    }
}
