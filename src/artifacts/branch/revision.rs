use crate::areas::repository::Repository;
use crate::artifacts::branch::{ANCESTOR_REGEX, PARENT_REGEX, RAW_OID_REGEX};
use crate::artifacts::objects::OBJECT_ID_LENGTH;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::RepositoryError;
use anyhow::Context;

/// A revision expression naming a commit.
///
/// Supported forms:
/// - Raw ids: 7-40 hex digits, full or abbreviated
/// - Ref names: `master`, `origin/master`, `refs/heads/topic`, `HEAD`, `@`
/// - Parent notation: `<revision>^`
/// - Ancestor notation: `<revision>~<n>`
///
/// A name that looks like a raw id is always treated as one, even when a
/// ref with the same name exists.
///
/// # Examples
///
/// ```ignore
/// let rev = Revision::try_parse("main~3")?;
/// let oid = rev.resolve(&repository)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revision {
    /// Raw or abbreviated object id
    Oid(String),
    /// Ref name, looked up through the refs search path
    Ref(String),
    /// The Nth first-parent ancestor of a revision (e.g. HEAD~3)
    Ancestor(Box<Revision>, usize),
    /// The first parent of a revision (e.g. HEAD^)
    Parent(Box<Revision>),
}

impl Revision {
    pub fn try_parse(revision: &str) -> anyhow::Result<Revision> {
        let parent_regex = regex::Regex::new(PARENT_REGEX)
            .with_context(|| format!("invalid parent regex: {PARENT_REGEX}"))?;
        let ancestor_regex = regex::Regex::new(ANCESTOR_REGEX)
            .with_context(|| format!("invalid ancestor regex: {ANCESTOR_REGEX}"))?;

        if let Some(caps) = parent_regex.captures(revision) {
            let base_revision = Self::try_parse(&caps[1])?;
            return Ok(Revision::Parent(Box::new(base_revision)));
        }

        if let Some(caps) = ancestor_regex.captures(revision) {
            let generations: usize = caps[2]
                .parse()
                .with_context(|| format!("failed to parse generations in revision: {revision}"))?;
            let base_revision = Self::try_parse(&caps[1])?;
            return Ok(Revision::Ancestor(Box::new(base_revision), generations));
        }

        if Self::looks_like_oid(revision)? {
            return Ok(Revision::Oid(revision.to_ascii_lowercase()));
        }

        if revision.is_empty() {
            return Err(RepositoryError::UnknownRef(revision.to_string()).into());
        }

        Ok(Revision::Ref(revision.to_string()))
    }

    pub fn looks_like_oid(revision: &str) -> anyhow::Result<bool> {
        Ok(regex::Regex::new(RAW_OID_REGEX)
            .with_context(|| format!("invalid object id regex: {RAW_OID_REGEX}"))?
            .is_match(revision))
    }

    pub fn resolve(&self, repository: &Repository) -> anyhow::Result<ObjectId> {
        match self {
            Revision::Oid(oid) => Self::resolve_oid(oid, repository),
            Revision::Ref(name) => repository.refs().resolve(name),
            Revision::Parent(base_revision) => {
                let oid = base_revision.resolve(repository)?;
                Self::resolve_commit_parent(&oid, self, repository)
            }
            Revision::Ancestor(base_revision, generations) => {
                let mut oid = base_revision.resolve(repository)?;
                for _ in 0..*generations {
                    oid = Self::resolve_commit_parent(&oid, self, repository)?;
                }

                Ok(oid)
            }
        }
    }

    fn resolve_commit_parent(
        oid: &ObjectId,
        revision: &Revision,
        repository: &Repository,
    ) -> anyhow::Result<ObjectId> {
        let commit = repository.database().load_commit(oid)?;

        commit
            .parent()
            .cloned()
            .ok_or_else(|| RepositoryError::UnknownRef(revision.to_string()).into())
    }

    /// Full ids must exist; abbreviations must match exactly one object.
    fn resolve_oid(oid_str: &str, repository: &Repository) -> anyhow::Result<ObjectId> {
        if oid_str.len() > OBJECT_ID_LENGTH {
            return Err(RepositoryError::InvalidObjectId(oid_str.to_string()).into());
        }

        if oid_str.len() == OBJECT_ID_LENGTH {
            let oid = ObjectId::try_parse(oid_str)?;
            if !repository.database().exists(&oid) {
                return Err(RepositoryError::ObjectNotFound(oid_str.to_string()).into());
            }
            return Ok(oid);
        }

        let mut matches = repository.database().find_by_prefix(oid_str)?;
        match matches.len() {
            0 => Err(RepositoryError::ObjectNotFound(oid_str.to_string()).into()),
            1 => Ok(matches.remove(0)),
            _ => Err(RepositoryError::AmbiguousObjectId(oid_str.to_string()).into()),
        }
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Revision::Oid(oid) => write!(f, "{oid}"),
            Revision::Ref(name) => write!(f, "{name}"),
            Revision::Parent(base) => write!(f, "{base}^"),
            Revision::Ancestor(base, generations) => write!(f, "{base}~{generations}"),
        }
    }
}
