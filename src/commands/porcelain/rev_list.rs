use crate::areas::repository::Repository;
use crate::artifacts::log::rev_list::{WalkOptions, WalkOrder};

#[derive(Debug, Clone, Copy, Default)]
pub struct RevListOptions {
    pub max_count: Option<usize>,
    pub order: WalkOrder,
}

impl Repository {
    /// Ids of the commits reachable from `commit_ref`, newest first.
    pub fn rev_list(&self, commit_ref: &str, options: RevListOptions) -> anyhow::Result<Vec<String>> {
        let start = self.resolve(commit_ref)?;
        // the start must be a commit
        self.database().load_commit(&start)?;

        let walk_options = WalkOptions {
            order: options.order,
            max_count: options.max_count,
        };

        self.walk(start, walk_options)
            .map(|oid| oid.map(|oid| oid.to_string()))
            .collect()
    }
}
