use crate::areas::repository::Repository;
use crate::artifacts::objects::object::ObjectBox;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatFileMode {
    /// `-t`: the object's kind
    Type,
    /// `-s`: payload size in bytes
    Size,
    /// `-p`: content, with trees listed one entry per line
    #[default]
    Pretty,
}

impl Repository {
    pub fn cat_file(&self, revision: &str, mode: CatFileMode) -> anyhow::Result<Vec<u8>> {
        let oid = self.resolve(revision)?;

        match mode {
            CatFileMode::Type => {
                let (object_type, _) = self.database().load(&oid)?;
                Ok(format!("{object_type}\n").into_bytes())
            }
            CatFileMode::Size => {
                let (_, payload) = self.database().load(&oid)?;
                Ok(format!("{}\n", payload.len()).into_bytes())
            }
            CatFileMode::Pretty => Ok(match self.database().parse_object(&oid)? {
                // blobs are raw bytes, not necessarily text
                ObjectBox::Blob(blob) => blob.into_content().to_vec(),
                ObjectBox::Tree(tree) => {
                    let mut listing = ObjectBox::Tree(tree).display();
                    if !listing.is_empty() {
                        listing.push('\n');
                    }
                    listing.into_bytes()
                }
                commit => commit.display().into_bytes(),
            }),
        }
    }
}
