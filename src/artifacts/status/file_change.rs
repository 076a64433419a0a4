use bitflags::bitflags;
use colored::{ColoredString, Colorize};

bitflags! {
    /// Every difference found for one path. A path can collect several
    /// (deleted from the working tree and staged, say); the report files it
    /// under the strongest one, see [`StatusFlags::category`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StatusFlags: u8 {
        const NEW = 0b000001;
        const MODIFIED = 0b000010;
        const DELETED = 0b000100;
        const TYPECHANGE = 0b001000;
        const RENAMED = 0b010000;
        const IGNORED = 0b100000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatusCategory {
    New,
    Modified,
    Typechange,
    Renamed,
    Deleted,
    Ignored,
}

impl StatusFlags {
    pub fn category(&self) -> Option<StatusCategory> {
        if self.contains(StatusFlags::IGNORED) {
            Some(StatusCategory::Ignored)
        } else if self.contains(StatusFlags::RENAMED) {
            Some(StatusCategory::Renamed)
        } else if self.contains(StatusFlags::TYPECHANGE) {
            Some(StatusCategory::Typechange)
        } else if self.contains(StatusFlags::DELETED) {
            Some(StatusCategory::Deleted)
        } else if self.contains(StatusFlags::MODIFIED) {
            Some(StatusCategory::Modified)
        } else if self.contains(StatusFlags::NEW) {
            Some(StatusCategory::New)
        } else {
            None
        }
    }
}

impl StatusCategory {
    pub const ALL: [StatusCategory; 6] = [
        StatusCategory::New,
        StatusCategory::Modified,
        StatusCategory::Typechange,
        StatusCategory::Renamed,
        StatusCategory::Deleted,
        StatusCategory::Ignored,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StatusCategory::New => "NEW",
            StatusCategory::Modified => "MODIFIED",
            StatusCategory::Typechange => "TYPECHANGE",
            StatusCategory::Renamed => "RENAMED",
            StatusCategory::Deleted => "DELETED",
            StatusCategory::Ignored => "IGNORED",
        }
    }

    pub fn colored_label(&self) -> ColoredString {
        let label = self.label();
        match self {
            StatusCategory::New => label.green().bold(),
            StatusCategory::Modified | StatusCategory::Typechange => label.yellow().bold(),
            StatusCategory::Renamed | StatusCategory::Deleted => label.red().bold(),
            StatusCategory::Ignored => label.bright_black().bold(),
        }
    }
}

impl std::fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
