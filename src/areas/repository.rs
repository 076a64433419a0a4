//! Repository handle
//!
//! A [`Repository`] owns the resolved git directory (and working tree, when
//! there is one) and hands out the storage areas. Every operation is called
//! on an explicit handle; nothing in the core reads the process's current
//! directory.

use crate::areas::config::Config;
use crate::areas::database::Database;
use crate::areas::index::Index;
use crate::areas::refs::Refs;
use crate::areas::workspace::Workspace;
use crate::artifacts::branch::revision::Revision;
use crate::artifacts::core::ignore_rules::IgnoreRules;
use crate::artifacts::log::rev_list::{RevWalk, WalkOptions};
use crate::artifacts::objects::commit::{Author, Commit};
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::RepositoryError;
use std::path::{Path, PathBuf};

pub const GIT_DIR_NAME: &str = ".git";
pub const DEFAULT_BRANCH: &str = "master";

#[derive(Debug, Clone)]
pub struct Repository {
    git_dir: PathBuf,
    workspace: Option<Workspace>,
    database: Database,
    refs: Refs,
}

impl Repository {
    pub(crate) fn at(git_dir: PathBuf, work_dir: Option<PathBuf>) -> Self {
        Repository {
            database: Database::new(git_dir.join("objects")),
            refs: Refs::new(&git_dir),
            workspace: work_dir.map(Workspace::new),
            git_dir,
        }
    }

    /// Open the repository at `path`: `path/.git` for a working repository,
    /// `path` itself when it is a bare git directory.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let not_a_repository = || RepositoryError::NotARepository(path.to_path_buf());
        let path = path.canonicalize().map_err(|_| not_a_repository())?;

        let dot_git = path.join(GIT_DIR_NAME);
        if Self::is_git_dir(&dot_git) {
            tracing::debug!(work_dir = %path.display(), "opened repository");
            return Ok(Self::at(dot_git, Some(path)));
        }

        if Self::is_git_dir(&path) {
            tracing::debug!(git_dir = %path.display(), "opened bare repository");
            return Ok(Self::at(path, None));
        }

        Err(not_a_repository().into())
    }

    /// Open the closest repository at or above `start`.
    pub fn discover(start: impl AsRef<Path>) -> anyhow::Result<Self> {
        let start = start.as_ref();
        let start = start
            .canonicalize()
            .map_err(|_| RepositoryError::NotARepository(start.to_path_buf()))?;

        start
            .ancestors()
            .find(|dir| Self::is_git_dir(&dir.join(GIT_DIR_NAME)) || Self::is_git_dir(dir))
            .map(Self::open)
            .unwrap_or_else(|| Err(RepositoryError::NotARepository(start.clone()).into()))
    }

    fn is_git_dir(path: &Path) -> bool {
        path.join("HEAD").is_file() && path.join("objects").is_dir()
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn work_dir(&self) -> Option<&Path> {
        self.workspace.as_ref().map(Workspace::path)
    }

    pub fn is_bare(&self) -> bool {
        self.workspace.is_none()
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    pub fn workspace(&self) -> anyhow::Result<&Workspace> {
        self.workspace
            .as_ref()
            .ok_or_else(|| RepositoryError::BareRepository.into())
    }

    pub fn index_path(&self) -> PathBuf {
        self.git_dir.join("index")
    }

    pub fn config_path(&self) -> PathBuf {
        self.git_dir.join("config")
    }

    /// Fresh copy of the index from disk.
    pub fn refresh_index(&self) -> anyhow::Result<Index> {
        Index::load(self.index_path())
    }

    pub fn config(&self) -> anyhow::Result<Config> {
        Config::load(self.config_path())
    }

    pub fn ignore_rules(&self) -> anyhow::Result<IgnoreRules> {
        match &self.workspace {
            Some(workspace) => IgnoreRules::load(workspace.path(), &self.git_dir),
            None => Ok(IgnoreRules::empty()),
        }
    }

    /// Resolve a revision expression (raw id, abbreviation, ref name, `@`,
    /// `^` and `~n` suffixes) to an object id.
    pub fn resolve(&self, revision: &str) -> anyhow::Result<ObjectId> {
        Revision::try_parse(revision)?.resolve(self)
    }

    pub fn head_oid(&self) -> anyhow::Result<Option<ObjectId>> {
        self.refs.read_head()
    }

    pub fn get_head_commit(&self) -> anyhow::Result<Commit> {
        let oid = self.refs.resolve("HEAD")?;
        self.database.load_commit(&oid)
    }

    pub fn get_master_commit(&self) -> anyhow::Result<Commit> {
        let oid = self.refs.resolve(DEFAULT_BRANCH)?;
        self.database.load_commit(&oid)
    }

    /// A new, independent history walk starting at `start`.
    pub fn walk(&self, start: ObjectId, options: WalkOptions) -> RevWalk {
        RevWalk::new(self.database.clone(), vec![start], options)
    }

    /// Author and committer for a new commit.
    ///
    /// `GIT_AUTHOR_*` / `GIT_COMMITTER_*` take precedence over `user.name`
    /// and `user.email`; the committer falls back to the author.
    pub fn identity(&self) -> anyhow::Result<(Author, Author)> {
        let author = match Author::from_env("GIT_AUTHOR") {
            Some(author) => author,
            None => {
                let config = self.config()?;
                Author::new(config.get_string("user.name")?, config.get_string("user.email")?)
            }
        };
        let committer = Author::from_env("GIT_COMMITTER").unwrap_or_else(|| author.clone());

        Ok((author, committer))
    }
}
