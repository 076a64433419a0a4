//! Commit object
//!
//! Commits represent snapshots of the repository at specific points in time.
//! They contain:
//! - A tree object ID (directory snapshot)
//! - Parent commit ID(s) (for history)
//! - Author and committer information
//! - Commit message
//!
//! ## Format
//!
//! On disk:
//! ```text
//! commit <size>\0
//! tree <tree-sha>
//! parent <parent-sha>
//! author <name> <email> <timestamp> <timezone>
//! committer <name> <email> <timestamp> <timezone>
//!
//! <commit message>
//! ```
//!
//! The message is kept byte for byte (including its trailing newline) so
//! that a parsed commit hashes back to its id.

use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::{Context, anyhow};
use bytes::Bytes;
use std::io::BufRead;

/// Author or committer information
///
/// Contains name, email, and timestamp with timezone information.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Author {
    name: String,
    email: String,
    timestamp: chrono::DateTime<chrono::FixedOffset>,
}

impl Author {
    /// Create a new author with the current timestamp
    pub fn new(name: String, email: String) -> Self {
        Author {
            name,
            email,
            timestamp: chrono::Local::now().fixed_offset(),
        }
    }

    pub fn new_with_timestamp(
        name: String,
        email: String,
        timestamp: chrono::DateTime<chrono::FixedOffset>,
    ) -> Self {
        Author {
            name,
            email,
            timestamp,
        }
    }

    /// Read an identity from `<PREFIX>_NAME`, `<PREFIX>_EMAIL` and
    /// `<PREFIX>_DATE` (e.g. `GIT_AUTHOR`).
    ///
    /// Returns `None` when name or email is unset. An unparsable date falls
    /// back to the current time.
    pub fn from_env(prefix: &str) -> Option<Self> {
        let name = std::env::var(format!("{prefix}_NAME")).ok()?;
        let email = std::env::var(format!("{prefix}_EMAIL")).ok()?;
        let timestamp = std::env::var(format!("{prefix}_DATE"))
            .ok()
            .and_then(|date| parse_date(&date));

        Some(match timestamp {
            Some(timestamp) => Author::new_with_timestamp(name, email, timestamp),
            None => Author::new(name, email),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// "Name <email@example.com>"
    pub fn display_name(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }

    /// "Name <email> timestamp timezone", as stored in the commit header
    pub fn display(&self) -> String {
        format!(
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.timestamp.timestamp(),
            self.timestamp.format("%z")
        )
    }

    /// "Mon Jan 1 12:34:56 2024 +0000"
    pub fn readable_timestamp(&self) -> String {
        self.timestamp
            .format("%a %b %-d %H:%M:%S %Y %z")
            .to_string()
    }

    pub fn timestamp(&self) -> chrono::DateTime<chrono::FixedOffset> {
        self.timestamp
    }
}

/// Accepts RFC 2822, `YYYY-MM-DD HH:MM:SS +ZZZZ` and git's raw
/// `<unix seconds> +ZZZZ` form.
fn parse_date(date: &str) -> Option<chrono::DateTime<chrono::FixedOffset>> {
    chrono::DateTime::parse_from_rfc2822(date)
        .or_else(|_| chrono::DateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S %z"))
        .or_else(|_| chrono::DateTime::parse_from_str(date, "%s %z"))
        .ok()
}

impl TryFrom<&str> for Author {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        // Split from the right: the name itself may contain spaces
        let mut parts = value.rsplitn(3, ' ');
        let (Some(timezone), Some(timestamp), Some(name_email)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(anyhow!("Invalid author format"));
        };

        let timestamp = timestamp
            .parse::<i64>()
            .map_err(|_| anyhow!("Invalid timestamp"))?;

        let email_start = name_email
            .find('<')
            .ok_or_else(|| anyhow!("Invalid author format: missing '<'"))?;
        let email_end = name_email
            .rfind('>')
            .ok_or_else(|| anyhow!("Invalid author format: missing '>'"))?;
        if email_end < email_start {
            return Err(anyhow!("Invalid author format"));
        }

        let offset = parse_offset(timezone)?;
        let timestamp = chrono::DateTime::from_timestamp(timestamp, 0)
            .ok_or_else(|| anyhow!("Invalid timestamp"))?
            .with_timezone(&offset);

        Ok(Author {
            name: name_email[..email_start].trim().to_string(),
            email: name_email[email_start + 1..email_end].to_string(),
            timestamp,
        })
    }
}

fn parse_offset(timezone: &str) -> anyhow::Result<chrono::FixedOffset> {
    let invalid = || anyhow!("Invalid timezone {timezone}");

    let (sign, digits) = match timezone.split_at_checked(1) {
        Some(("+", digits)) => (1, digits),
        Some(("-", digits)) => (-1, digits),
        _ => return Err(invalid()),
    };
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;

    chrono::FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Commit {
    /// Empty for a root commit, several for a merge
    parents: Vec<ObjectId>,
    tree_oid: ObjectId,
    author: Author,
    committer: Author,
    message: String,
}

impl Commit {
    pub fn new(
        parents: Vec<ObjectId>,
        tree_oid: ObjectId,
        author: Author,
        committer: Author,
        message: String,
    ) -> Self {
        Commit {
            parents,
            tree_oid,
            author,
            committer,
            message,
        }
    }

    /// First line of the message
    pub fn short_message(&self) -> String {
        self.message.lines().next().unwrap_or("").to_string()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn tree_oid(&self) -> &ObjectId {
        &self.tree_oid
    }

    pub fn parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn committer(&self) -> &Author {
        &self.committer
    }

    /// Committer time, the key history ordering uses
    pub fn timestamp(&self) -> chrono::DateTime<chrono::FixedOffset> {
        self.committer.timestamp()
    }

    fn header_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("tree {}", self.tree_oid)];
        for parent in &self.parents {
            lines.push(format!("parent {parent}"));
        }
        lines.push(format!("author {}", self.author.display()));
        lines.push(format!("committer {}", self.committer.display()));
        lines
    }
}

impl Packable for Commit {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let content = format!("{}\n\n{}", self.header_lines().join("\n"), self.message);
        Ok(Bytes::from(content))
    }
}

impl Unpackable for Commit {
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self> {
        let mut content = String::new();
        let mut reader = reader;
        reader
            .read_to_string(&mut content)
            .context("Invalid commit object: not UTF-8")?;

        let (headers, message) = content
            .split_once("\n\n")
            .unwrap_or((content.as_str(), ""));

        let mut tree_oid = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;

        for line in headers.lines() {
            let (key, value) = line
                .split_once(' ')
                .with_context(|| format!("Invalid commit header line '{line}'"))?;

            match key {
                "tree" => tree_oid = Some(ObjectId::try_parse(value)?),
                "parent" => parents.push(ObjectId::try_parse(value)?),
                "author" => author = Some(Author::try_from(value)?),
                "committer" => committer = Some(Author::try_from(value)?),
                // gpgsig, encoding, mergetag and continuation lines are not interpreted
                _ => {}
            }
        }

        let tree_oid = tree_oid.context("Invalid commit object: missing tree line")?;
        let author = author.context("Invalid commit object: missing author line")?;
        let committer = committer.context("Invalid commit object: missing committer line")?;

        Ok(Self::new(
            parents,
            tree_oid,
            author,
            committer,
            message.to_string(),
        ))
    }
}

impl Object for Commit {
    fn object_type(&self) -> ObjectType {
        ObjectType::Commit
    }

    fn display(&self) -> String {
        format!("{}\n\n{}", self.header_lines().join("\n"), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    const RAW: &str = "tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
        parent 95d09f2b10159347eece71399a7e2e907ea3df4f\n\
        author Ada Lovelace <ada@example.com> 1700000000 +0100\n\
        committer Grace Hopper <grace@example.com> 1700000500 -0230\n\
        \n\
        Initial import\n\nWith a body.\n";

    #[test]
    fn parsed_commit_serializes_to_identical_bytes() {
        let commit = Commit::deserialize(Cursor::new(RAW)).unwrap();

        assert_eq!(commit.serialize().unwrap(), Bytes::from(RAW));
        assert_eq!(commit.message(), "Initial import\n\nWith a body.\n");
        assert_eq!(commit.short_message(), "Initial import");
        assert_eq!(commit.parents().len(), 1);
    }

    #[test]
    fn timestamp_comes_from_the_committer() {
        let commit = Commit::deserialize(Cursor::new(RAW)).unwrap();

        assert_eq!(commit.timestamp().timestamp(), 1700000500);
        assert_eq!(commit.author().timestamp().timestamp(), 1700000000);
        assert_eq!(commit.committer().display(), "Grace Hopper <grace@example.com> 1700000500 -0230");
    }

    #[test]
    fn author_names_may_contain_spaces() {
        let author = Author::try_from("Jean Luc Picard <jl@example.com> 0 +0000").unwrap();
        assert_eq!(author.name(), "Jean Luc Picard");
        assert_eq!(author.email(), "jl@example.com");
    }

    #[test]
    fn missing_tree_is_rejected() {
        let raw = "author A <a@b> 0 +0000\ncommitter A <a@b> 0 +0000\n\nmsg\n";
        assert!(Commit::deserialize(Cursor::new(raw)).is_err());
    }

    #[test]
    fn raw_git_dates_are_accepted() {
        let timestamp = parse_date("1700000000 +0200").unwrap();
        assert_eq!(timestamp.timestamp(), 1700000000);
        assert_eq!(timestamp.offset().local_minus_utc(), 7200);
    }
}
