use std::time::SystemTime;

/// Permission and type bits reported for directories (read-only).
pub const DIR_MODE: u32 = 0o040_555;

/// Permission and type bits reported for regular files (read-only).
pub const FILE_MODE: u32 = 0o100_444;

/// Metadata returned by `stat` and `readdir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Base name of the entry; empty for the root.
    pub name: String,
    /// Size in bytes; always 0 for directories.
    pub size: u64,
    pub is_dir: bool,
    pub mode: u32,
    /// Modification times are not tracked; always the Unix epoch.
    pub mod_time: SystemTime,
}

impl FileInfo {
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: 0,
            is_dir: true,
            mode: DIR_MODE,
            mod_time: SystemTime::UNIX_EPOCH,
        }
    }

    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            is_dir: false,
            mode: FILE_MODE,
            mod_time: SystemTime::UNIX_EPOCH,
        }
    }
}
