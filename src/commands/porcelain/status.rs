use crate::areas::repository::Repository;
use crate::artifacts::status::status_info::{Status, StatusReport};

impl Repository {
    /// Compare HEAD, the index and the working tree.
    ///
    /// Stat data of files that were touched but not changed is refreshed in
    /// the index when the index lock can be taken.
    pub fn status(&self) -> anyhow::Result<StatusReport> {
        let mut index = self.refresh_index()?;
        let report = Status::new(self).collect(&mut index)?;

        if index.is_changed()
            && let Err(error) = index.write()
        {
            tracing::warn!(%error, "could not refresh index stat data");
        }

        Ok(report)
    }
}
