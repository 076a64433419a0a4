use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::{BranchName, SymRefName};
use crate::artifacts::branch::revision::Revision;
use crate::artifacts::checkout::CheckoutReport;
use crate::artifacts::checkout::migration::Migration;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::RepositoryError;

pub const DETACHMENT_NOTICE: &str = r#"
You are in 'detached HEAD' state. You can look around, make experimental
changes and commit them, and you can discard any commits you make in this
state without impacting any branches by performing another checkout.
"#;

impl Repository {
    /// Check out a branch when `refs/heads/<target>` exists, otherwise a
    /// raw (possibly abbreviated) commit id. Returns the ref HEAD now
    /// names: `refs/heads/<target>` or `HEAD`.
    pub async fn checkout(&self, target: &str) -> anyhow::Result<String> {
        if let Ok(branch_name) = BranchName::try_parse(target.to_string())
            && self.refs().branch_exists(&branch_name)
        {
            self.checkout_branch(&branch_name).await?;
            return Ok(SymRefName::for_branch(&branch_name).to_string());
        }

        if Revision::looks_like_oid(target)? {
            let oid = Revision::try_parse(target)?.resolve(self)?;
            self.checkout_detached(oid.as_ref()).await?;
            return Ok(SymRefName::head().to_string());
        }

        Err(RepositoryError::BranchNotFound(target.to_string()).into())
    }

    /// Materialize the branch's commit and attach HEAD to the branch.
    pub async fn checkout_branch(&self, branch_name: &BranchName) -> anyhow::Result<CheckoutReport> {
        let commit_oid = self
            .refs()
            .read_branch(branch_name)?
            .ok_or_else(|| RepositoryError::BranchNotFound(branch_name.to_string()))?;

        let report = self.materialize(&commit_oid).await?;
        self.refs()
            .set_symbolic(&SymRefName::head(), &SymRefName::for_branch(branch_name))?;

        tracing::debug!(branch = %branch_name, ?report, "checked out branch");
        Ok(report)
    }

    /// Materialize a commit given by its full id and point HEAD at it.
    pub async fn checkout_detached(&self, id: &str) -> anyhow::Result<CheckoutReport> {
        let commit_oid = ObjectId::try_parse(id)?;
        if !self.database().exists(&commit_oid) {
            return Err(RepositoryError::ObjectNotFound(id.to_string()).into());
        }

        let report = self.materialize(&commit_oid).await?;
        self.refs().set_direct(&SymRefName::head(), &commit_oid)?;

        tracing::debug!(commit = %commit_oid, ?report, "detached HEAD");
        Ok(report)
    }

    async fn materialize(&self, commit_oid: &ObjectId) -> anyhow::Result<CheckoutReport> {
        let commit = self.database().load_commit(commit_oid)?;
        let migration = Migration::plan(self, commit.tree_oid())?;
        if migration.is_noop() {
            tracing::trace!(commit = %commit_oid, "working tree already matches");
            return Ok(CheckoutReport::default());
        }

        migration.apply().await
    }
}
