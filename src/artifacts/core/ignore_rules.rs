//! Ignore rules from the working tree's `.gitignore` and `<root>/info/exclude`

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct IgnoreRules {
    matcher: Gitignore,
}

impl IgnoreRules {
    pub fn load(work_dir: &Path, git_dir: &Path) -> anyhow::Result<Self> {
        let mut builder = GitignoreBuilder::new(work_dir);

        for source in [git_dir.join("info").join("exclude"), work_dir.join(".gitignore")] {
            if source.is_file()
                && let Some(error) = builder.add(&source)
            {
                tracing::warn!(file = %source.display(), %error, "skipping invalid ignore pattern");
            }
        }

        Ok(IgnoreRules {
            matcher: builder.build()?,
        })
    }

    pub fn empty() -> Self {
        IgnoreRules {
            matcher: Gitignore::empty(),
        }
    }

    /// `path` is relative to the working tree root. A path inside an ignored
    /// directory is ignored too.
    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        if path.as_os_str().is_empty() {
            return false;
        }

        self.matcher
            .matched_path_or_any_parents(path, is_dir)
            .is_ignore()
    }
}
