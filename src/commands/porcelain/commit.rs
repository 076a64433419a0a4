use crate::areas::repository::Repository;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;

#[derive(Debug, Clone, Default)]
pub struct CommitOptions {
    /// Subject line
    pub message: String,
    /// Body, separated from the subject by a blank line
    pub description: Option<String>,
}

impl CommitOptions {
    fn full_message(&self) -> anyhow::Result<String> {
        let subject = self.message.trim();
        if subject.is_empty() {
            anyhow::bail!("Aborting commit due to empty commit message");
        }

        Ok(match self.description.as_deref().map(str::trim) {
            Some(body) if !body.is_empty() => format!("{subject}\n\n{body}\n"),
            _ => format!("{subject}\n"),
        })
    }
}

impl Repository {
    /// Record the index as a new commit on top of HEAD and advance HEAD
    /// (the current branch, or HEAD itself when detached).
    pub fn commit(&self, options: &CommitOptions) -> anyhow::Result<ObjectId> {
        let message = options.full_message()?;

        let index = self.refresh_index()?;
        let tree_oid = index.write_tree(self.database())?;
        let parents = self.head_oid()?.into_iter().collect::<Vec<_>>();
        let (author, committer) = self.identity()?;

        let commit = Commit::new(parents, tree_oid, author, committer, message);
        let commit_oid = self.database().store(&commit)?;
        self.refs().update_head(&commit_oid)?;

        tracing::debug!(commit = %commit_oid, "created commit");
        Ok(commit_oid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("subject", None, "subject\n")]
    #[case("  subject \n", Some("   "), "subject\n")]
    #[case("subject", Some("body line\n"), "subject\n\nbody line\n")]
    fn message_joins_subject_and_body(
        #[case] message: &str,
        #[case] description: Option<&str>,
        #[case] expected: &str,
    ) {
        let options = CommitOptions {
            message: message.to_string(),
            description: description.map(str::to_string),
        };
        assert_eq!(options.full_message().unwrap(), expected);
    }

    #[test]
    fn empty_subject_is_rejected() {
        let options = CommitOptions {
            message: " \n".to_string(),
            description: Some("body".to_string()),
        };
        assert!(options.full_message().is_err());
    }
}
