use crate::areas::repository::Repository;
use crate::artifacts::objects::object_id::ObjectId;

impl Repository {
    /// Store the trees described by the index and return the root id.
    pub fn write_tree(&self) -> anyhow::Result<ObjectId> {
        self.refresh_index()?.write_tree(self.database())
    }
}
