use crate::areas::refs::HeadState;
use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::{REF_PREFIX, SymRefName};
use crate::artifacts::checkout::migration::Migration;
use crate::artifacts::objects::object_id::ObjectId;
use crate::commands::porcelain::remote::fetch_refspec;
use crate::errors::RepositoryError;
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const REMOTE_NAME: &str = "origin";
const FILE_URL_PREFIX: &str = "file://";

#[derive(Debug, Clone, Default)]
pub struct CloneOptions {
    /// Directory whose files are copied into the new git directory
    pub template: Option<PathBuf>,
    /// No working tree; branches are copied as `refs/heads/*`
    pub bare: bool,
    /// Every ref copied verbatim; implies `bare`
    pub mirror: bool,
}

impl CloneOptions {
    pub fn is_bare(&self) -> bool {
        self.bare || self.mirror
    }

    fn validate(&self) -> anyhow::Result<()> {
        if let Some(template) = &self.template
            && !template.is_dir()
        {
            anyhow::bail!("template directory '{}' does not exist", template.display());
        }

        Ok(())
    }
}

/// Local path named by a clone source: a plain path or a `file://` URL.
pub fn local_source_path(url: &str) -> anyhow::Result<PathBuf> {
    if let Some(path) = url.strip_prefix(FILE_URL_PREFIX) {
        return Ok(PathBuf::from(path));
    }

    let is_remote = url.contains("://")
        || url
            .split_once(':')
            .is_some_and(|(host, _)| !host.contains('/') && host.contains('@'));
    if is_remote {
        return Err(RepositoryError::UnsupportedTransport(url.to_string()).into());
    }

    Ok(PathBuf::from(url))
}

/// Directory name git would pick for a clone of `url`: the last path
/// component without `.git`, with `.git` added back for bare clones.
pub fn default_clone_directory(url: &str, bare: bool) -> anyhow::Result<PathBuf> {
    let trimmed = url.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix("/.git").unwrap_or(trimmed);
    let name = trimmed
        .rsplit(['/', ':'])
        .next()
        .map(|name| name.strip_suffix(".git").unwrap_or(name))
        .filter(|name| !name.is_empty())
        .with_context(|| format!("cannot derive a directory name from '{url}'"))?;

    Ok(match bare {
        true => PathBuf::from(format!("{name}.git")),
        false => PathBuf::from(name),
    })
}

impl Repository {
    /// Clone the local repository at `url` into `directory`.
    ///
    /// Objects are copied as they are. Branches become
    /// `refs/remotes/origin/*` in a working clone, which then checks out the
    /// source's current branch with an index to match.
    pub async fn clone_repository(
        url: &str,
        directory: impl AsRef<Path>,
        options: &CloneOptions,
    ) -> anyhow::Result<Repository> {
        options.validate()?;
        let directory = directory.as_ref();

        let source = Repository::open(local_source_path(url)?)?;
        let is_occupied = match fs::read_dir(directory) {
            Ok(mut entries) => entries.next().is_some(),
            Err(_) => directory.exists(),
        };
        if is_occupied {
            return Err(RepositoryError::DestinationExists(directory.to_path_buf()).into());
        }

        let repository = Repository::init(directory, options.is_bare())?;
        if let Some(template) = &options.template {
            copy_missing_files(template, repository.git_dir())?;
        }
        copy_missing_files(source.database().objects_path(), repository.database().objects_path())?;

        repository.copy_refs(&source, options)?;
        repository.write_remote_config(&source, options)?;

        match source.refs().head_state()? {
            HeadState::Detached(oid) => {
                repository.refs().set_direct(&SymRefName::head(), &oid)?;
                if !repository.is_bare() {
                    repository.materialize_with_index(&oid).await?;
                }
            }
            HeadState::Attached(branch_name) | HeadState::Unborn(branch_name) => {
                let tracking = SymRefName::new(format!("refs/remotes/{REMOTE_NAME}/{branch_name}"));
                let tip = match repository.is_bare() {
                    true => None,
                    false => repository.refs().follow(&tracking)?.1,
                };

                if let Some(oid) = &tip {
                    repository.refs().create_branch(&branch_name, oid)?;
                    repository.refs().set_symbolic(
                        &SymRefName::new(format!("refs/remotes/{REMOTE_NAME}/HEAD")),
                        &tracking,
                    )?;
                }
                repository
                    .refs()
                    .set_symbolic(&SymRefName::head(), &SymRefName::for_branch(&branch_name))?;
                if let Some(oid) = tip {
                    repository.materialize_with_index(&oid).await?;
                }
            }
        }

        tracing::debug!(
            source = %source.git_dir().display(),
            destination = %repository.git_dir().display(),
            "cloned repository"
        );
        Ok(repository)
    }

    fn copy_refs(&self, source: &Repository, options: &CloneOptions) -> anyhow::Result<()> {
        for (sym_ref_name, oid) in source.refs().list_refs("refs")? {
            let name = sym_ref_name.as_ref_path();

            let target = if options.mirror {
                Some(name.to_string())
            } else if let Some(branch) = name.strip_prefix(REF_PREFIX) {
                match options.bare {
                    true => Some(name.to_string()),
                    false => Some(format!("refs/remotes/{REMOTE_NAME}/{branch}")),
                }
            } else if name.starts_with("refs/tags/") {
                Some(name.to_string())
            } else {
                None
            };

            if let Some(target) = target {
                self.refs().set_direct(&SymRefName::new(target), &oid)?;
            }
        }

        Ok(())
    }

    fn write_remote_config(&self, source: &Repository, options: &CloneOptions) -> anyhow::Result<()> {
        let mut config = self.config()?;
        let url = match source.work_dir() {
            Some(work_dir) => work_dir,
            None => source.git_dir(),
        };

        config.set_string(
            &format!("remote.{REMOTE_NAME}.url"),
            &url.to_string_lossy(),
        )?;
        if options.mirror {
            config.set_string(&format!("remote.{REMOTE_NAME}.fetch"), "+refs/*:refs/*")?;
            config.set_string(&format!("remote.{REMOTE_NAME}.mirror"), "true")?;
        } else if !options.bare {
            config.set_string(
                &format!("remote.{REMOTE_NAME}.fetch"),
                &fetch_refspec(REMOTE_NAME, None),
            )?;
        }

        config.save()
    }

    /// Check out `commit_oid` into an empty working tree and stage it.
    async fn materialize_with_index(&self, commit_oid: &ObjectId) -> anyhow::Result<()> {
        let commit = self.database().load_commit(commit_oid)?;
        Migration::plan(self, commit.tree_oid())?.apply().await?;

        let mut index = self.refresh_index()?;
        index.read_tree(
            self.database().flatten_tree(commit.tree_oid())?,
            Some(self.workspace()?),
        )?;
        index.write()
    }
}

/// Copy every file below `from` into the same place below `to`, keeping
/// files that already exist there.
fn copy_missing_files(from: &Path, to: &Path) -> anyhow::Result<()> {
    for entry in WalkDir::new(from).min_depth(1) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .with_context(|| format!("{} is outside {}", entry.path().display(), from.display()))?;
        let destination = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)?;
        } else if !destination.exists() {
            fs::copy(entry.path(), &destination).with_context(|| {
                format!("Failed to copy {} to {}", entry.path().display(), destination.display())
            })?;
        }
    }

    Ok(())
}
