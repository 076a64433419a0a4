use crate::areas::repository::Repository;
use crate::artifacts::log::rev_list::WalkOptions;
use crate::artifacts::objects::object_id::ObjectId;
use colored::Colorize;

pub const DEFAULT_LOG_LIMIT: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub id: ObjectId,
    /// "Name <email>"
    pub author: String,
    pub date: String,
    pub message: String,
}

impl LogEntry {
    /// Medium format: id, author, date and the indented message.
    pub fn render(&self) -> String {
        let mut rendered = format!(
            "{} {}\nAuthor: {}\nDate:   {}\n\n",
            "commit".yellow(),
            self.id.as_ref().yellow(),
            self.author,
            self.date
        );
        for line in self.message.lines() {
            rendered.push_str(&format!("    {line}\n"));
        }

        rendered
    }
}

impl Repository {
    /// The most recent `limit` commits reachable from HEAD, children first.
    /// An unborn branch has no history.
    pub fn log(&self, limit: usize) -> anyhow::Result<Vec<LogEntry>> {
        let Some(head_oid) = self.head_oid()? else {
            return Ok(Vec::new());
        };

        let options = WalkOptions {
            max_count: Some(limit),
            ..Default::default()
        };

        self.walk(head_oid, options)
            .map(|oid| {
                let oid = oid?;
                let commit = self.database().load_commit(&oid)?;

                Ok(LogEntry {
                    author: commit.author().display_name(),
                    date: commit.author().readable_timestamp(),
                    message: commit.message().to_string(),
                    id: oid,
                })
            })
            .collect()
    }
}
