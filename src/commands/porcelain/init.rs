use crate::areas::repository::{DEFAULT_BRANCH, GIT_DIR_NAME, Repository};
use crate::artifacts::branch::branch_name::{BranchName, SymRefName};
use anyhow::Context;
use std::fs;
use std::path::Path;

impl Repository {
    /// Create an empty repository in `path` (`path/.git`), or a bare one
    /// in `path` itself. Running it on an existing repository keeps its HEAD.
    pub fn init(path: impl AsRef<Path>, bare: bool) -> anyhow::Result<Self> {
        let path = path.as_ref();
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {}", path.display()))?;
        let path = path.canonicalize()?;

        let repository = match bare {
            true => Repository::at(path, None),
            false => Repository::at(path.join(GIT_DIR_NAME), Some(path)),
        };
        let git_dir = repository.git_dir();

        fs::create_dir_all(repository.database().objects_path())
            .context("Failed to create objects directory")?;
        fs::create_dir_all(git_dir.join("refs").join("heads"))
            .context("Failed to create refs/heads directory")?;
        fs::create_dir_all(git_dir.join("refs").join("tags"))
            .context("Failed to create refs/tags directory")?;

        if !repository.refs().head_path().exists() {
            let default_branch = BranchName::try_parse(DEFAULT_BRANCH.to_string())?;
            repository
                .refs()
                .set_symbolic(&SymRefName::head(), &SymRefName::for_branch(&default_branch))
                .context("Failed to create initial HEAD reference")?;
        }

        let mut config = repository.config()?;
        config.set_string("core.repositoryformatversion", "0")?;
        config.set_string("core.filemode", "true")?;
        config.set_string("core.bare", &bare.to_string())?;
        config.save()?;

        tracing::debug!(git_dir = %git_dir.display(), bare, "initialized repository");
        Ok(repository)
    }
}
