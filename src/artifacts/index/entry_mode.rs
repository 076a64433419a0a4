//! File modes shared by tree entries and index entries

use anyhow::anyhow;

#[derive(Debug, Clone, Copy, Eq, Ord, Default, PartialEq, PartialOrd, Hash)]
pub enum FileMode {
    #[default]
    Regular,
    Executable,
}

#[derive(Debug, Clone, Copy, Eq, Ord, Default, PartialEq, PartialOrd, Hash)]
pub enum EntryMode {
    File(FileMode),
    Symlink,
    #[default]
    Directory,
}

/// Coarse kind of a path, used to detect type changes.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum EntryKind {
    File,
    Symlink,
    Directory,
}

impl EntryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryMode::File(FileMode::Regular) => "100644",
            EntryMode::File(FileMode::Executable) => "100755",
            EntryMode::Symlink => "120000",
            EntryMode::Directory => "40000",
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            EntryMode::File(FileMode::Regular) => 0o100644,
            EntryMode::File(FileMode::Executable) => 0o100755,
            EntryMode::Symlink => 0o120000,
            EntryMode::Directory => 0o40000,
        }
    }

    pub fn from_octal_str(mode: &str) -> anyhow::Result<Self> {
        let mode = u32::from_str_radix(mode, 8).map_err(|_| anyhow!("Invalid entry mode {mode}"))?;
        Self::try_from(mode)
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            EntryMode::File(_) => EntryKind::File,
            EntryMode::Symlink => EntryKind::Symlink,
            EntryMode::Directory => EntryKind::Directory,
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, EntryMode::Directory)
    }

    pub fn is_executable(&self) -> bool {
        matches!(self, EntryMode::File(FileMode::Executable))
    }
}

impl TryFrom<u32> for EntryMode {
    type Error = anyhow::Error;

    fn try_from(mode: u32) -> anyhow::Result<Self> {
        match mode {
            0o100644 => Ok(EntryMode::File(FileMode::Regular)),
            0o100755 => Ok(EntryMode::File(FileMode::Executable)),
            // legacy group-writable mode written by very old git versions
            0o100664 => Ok(EntryMode::File(FileMode::Regular)),
            0o120000 => Ok(EntryMode::Symlink),
            0o40000 => Ok(EntryMode::Directory),
            _ => Err(anyhow!("Invalid entry mode {mode:o}")),
        }
    }
}

impl From<FileMode> for EntryMode {
    fn from(mode: FileMode) -> Self {
        EntryMode::File(mode)
    }
}

impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:0>6}", self.as_str())
    }
}
