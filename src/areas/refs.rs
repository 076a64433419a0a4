//! References (branches, HEAD, remote-tracking refs)
//!
//! References are human-readable names pointing to commits:
//! - Direct: the file holds a 40-character object id
//! - Symbolic: the file holds `ref: <name>` (e.g. HEAD -> refs/heads/master)
//!
//! Every write goes through a `<ref>.lock` file that is renamed into place,
//! so readers see either the old or the new value.

use crate::artifacts::branch::branch_name::{BranchName, SymRefName};
use crate::artifacts::branch::REF_ALIASES;
use crate::artifacts::core::lockfile::LockFile;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::RepositoryError;
use anyhow::Context;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Regex pattern for parsing symbolic references
const SYMREF_REGEX: &str = r"^ref: (.+)$";

pub const HEAD_REF_NAME: &str = "HEAD";

/// Symbolic refs are followed at most this many times
pub const MAX_SYMREF_HOPS: usize = 5;

/// Directories searched, in order, when resolving a short ref name
const REF_SEARCH_PREFIXES: [&str; 5] = ["", "refs/", "refs/heads/", "refs/tags/", "refs/remotes/"];

/// `HEAD`, `ORIG_HEAD`, `FETCH_HEAD` and the like: upper case and `_` only.
fn is_root_ref_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|byte| byte.is_ascii_uppercase() || byte == b'_')
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymRefOrOid {
    SymRef { sym_ref_name: SymRefName },
    Oid(ObjectId),
}

impl SymRefOrOid {
    fn read_symref_or_oid(path: &Path) -> anyhow::Result<Option<SymRefOrOid>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(anyhow::Error::new(error)
                    .context(format!("failed to read ref file at {}", path.display())));
            }
        };
        let content = content.trim();

        if content.is_empty() {
            return Ok(None);
        }

        let symref_match = regex::Regex::new(SYMREF_REGEX)?.captures(content);
        if let Some(symref_match) = symref_match {
            Ok(Some(SymRefOrOid::SymRef {
                sym_ref_name: SymRefName::new(symref_match[1].to_string()),
            }))
        } else {
            Ok(Some(SymRefOrOid::Oid(ObjectId::try_parse(content)?)))
        }
    }
}

/// Where HEAD currently points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadState {
    /// On a branch that has at least one commit
    Attached(BranchName),
    /// HEAD holds a commit id directly
    Detached(ObjectId),
    /// On a branch that does not exist yet
    Unborn(BranchName),
}

#[derive(Debug, Clone)]
pub struct Refs {
    /// The git directory
    path: PathBuf,
}

impl Refs {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Refs { path: path.into() }
    }

    fn ref_path(&self, sym_ref_name: &SymRefName) -> PathBuf {
        self.path.join(sym_ref_name.as_ref_path())
    }

    /// Full name of the first existing ref matching `name` in the search
    /// order (`<root>`, `refs/`, `refs/heads/`, `refs/tags/`, `refs/remotes/`).
    ///
    /// Only `HEAD`-style names and full `refs/...` names are looked up
    /// directly under `<root>`, so files such as `config` or `index` never
    /// shadow a branch of the same name.
    pub fn find_ref(&self, name: &str) -> Option<SymRefName> {
        let name = *REF_ALIASES.get(name).unwrap_or(&name);
        let root_lookup = is_root_ref_name(name) || name.starts_with("refs/");

        REF_SEARCH_PREFIXES
            .iter()
            .filter(|prefix| !prefix.is_empty() || root_lookup)
            .map(|prefix| SymRefName::new(format!("{prefix}{name}")))
            .find(|candidate| self.ref_path(candidate).is_file())
    }

    /// Follow symbolic refs from `start`.
    ///
    /// Returns the last ref in the chain and the id it holds, `None` when
    /// that ref does not exist yet (an unborn branch).
    pub fn follow(&self, start: &SymRefName) -> anyhow::Result<(SymRefName, Option<ObjectId>)> {
        let mut current = start.clone();

        for _ in 0..=MAX_SYMREF_HOPS {
            match SymRefOrOid::read_symref_or_oid(&self.ref_path(&current))? {
                Some(SymRefOrOid::SymRef { sym_ref_name }) => current = sym_ref_name,
                Some(SymRefOrOid::Oid(oid)) => return Ok((current, Some(oid))),
                None => return Ok((current, None)),
            }
        }

        Err(RepositoryError::RefCycle(start.to_string()).into())
    }

    /// Resolve a ref name (not a raw object id) to the commit it points at.
    pub fn resolve(&self, name: &str) -> anyhow::Result<ObjectId> {
        let sym_ref_name = self
            .find_ref(name)
            .ok_or_else(|| RepositoryError::UnknownRef(name.to_string()))?;

        match self.follow(&sym_ref_name)? {
            (_, Some(oid)) => Ok(oid),
            (_, None) => Err(RepositoryError::UnknownRef(name.to_string()).into()),
        }
    }

    pub fn read_head(&self) -> anyhow::Result<Option<ObjectId>> {
        Ok(self.follow(&SymRefName::head())?.1)
    }

    pub fn head_state(&self) -> anyhow::Result<HeadState> {
        let head = SymRefName::head();
        let (last, oid) = self.follow(&head)?;

        if last == head {
            return match oid {
                Some(oid) => Ok(HeadState::Detached(oid)),
                None => Err(anyhow::anyhow!("HEAD is missing or empty")),
            };
        }

        let branch_name = last
            .branch_name()
            .with_context(|| format!("HEAD points outside refs/heads: {last}"))?;

        Ok(match oid {
            Some(_) => HeadState::Attached(branch_name),
            None => HeadState::Unborn(branch_name),
        })
    }

    /// Point `sym_ref_name` directly at `oid`.
    pub fn set_direct(&self, sym_ref_name: &SymRefName, oid: &ObjectId) -> anyhow::Result<()> {
        tracing::debug!(reference = %sym_ref_name, %oid, "updating ref");
        self.write_ref_file(sym_ref_name, &format!("{oid}\n"))
    }

    /// Make `sym_ref_name` a symbolic ref to `target`.
    pub fn set_symbolic(&self, sym_ref_name: &SymRefName, target: &SymRefName) -> anyhow::Result<()> {
        tracing::debug!(reference = %sym_ref_name, %target, "updating symbolic ref");
        self.write_ref_file(sym_ref_name, &format!("ref: {target}\n"))
    }

    /// Advance whatever HEAD resolves to: the current branch when attached,
    /// HEAD itself when detached.
    pub fn update_head(&self, oid: &ObjectId) -> anyhow::Result<()> {
        let (last, _) = self.follow(&SymRefName::head())?;
        self.set_direct(&last, oid)
    }

    fn write_ref_file(&self, sym_ref_name: &SymRefName, content: &str) -> anyhow::Result<()> {
        let mut lock = LockFile::acquire(self.ref_path(sym_ref_name))?;
        lock.write_all(content.as_bytes())
            .with_context(|| format!("failed to write ref {sym_ref_name}"))?;
        lock.commit()
    }

    pub fn branch_exists(&self, branch_name: &BranchName) -> bool {
        self.ref_path(&SymRefName::for_branch(branch_name)).is_file()
    }

    pub fn read_branch(&self, branch_name: &BranchName) -> anyhow::Result<Option<ObjectId>> {
        Ok(self.follow(&SymRefName::for_branch(branch_name))?.1)
    }

    pub fn create_branch(&self, name: &BranchName, source_oid: &ObjectId) -> anyhow::Result<()> {
        // an unborn default branch may be written over
        if self.branch_exists(name) && !name.is_default_branch() {
            anyhow::bail!("branch {} already exists", name);
        }

        self.set_direct(&SymRefName::for_branch(name), source_oid)
    }

    pub fn list_branches(&self) -> anyhow::Result<Vec<BranchName>> {
        Ok(self
            .list_refs("refs/heads")?
            .into_iter()
            .filter_map(|(sym_ref_name, _)| sym_ref_name.branch_name())
            .collect())
    }

    /// Every direct ref below `<root>/<prefix>`, resolved, sorted by name.
    pub fn list_refs(&self, prefix: &str) -> anyhow::Result<Vec<(SymRefName, ObjectId)>> {
        let base = self.path.join(prefix);
        if !base.is_dir() {
            return Ok(Vec::new());
        }

        let mut refs = Vec::new();
        for entry in WalkDir::new(&base).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() || entry.path().extension() == Some("lock".as_ref()) {
                continue;
            }

            let relative_path = entry
                .path()
                .strip_prefix(&self.path)
                .with_context(|| format!("ref outside git directory: {}", entry.path().display()))?;
            let sym_ref_name = SymRefName::new(relative_path.to_string_lossy().to_string());

            if let (_, Some(oid)) = self.follow(&sym_ref_name)? {
                refs.push((sym_ref_name, oid));
            }
        }

        Ok(refs)
    }

    pub fn head_path(&self) -> PathBuf {
        self.path.join(HEAD_REF_NAME)
    }
}
