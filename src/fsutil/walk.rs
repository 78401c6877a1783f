use crate::tree::{FileInfo, PathTree, Result};

/// A path reached by [`walk`], with the metadata its parent listed for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: String,
    pub info: FileInfo,
}

impl WalkEntry {
    pub fn is_dir(&self) -> bool {
        self.info.is_dir
    }
}

/// Every path in `tree` below the root, found by opening directories and
/// listing them. Entries are sorted by path.
pub fn walk(tree: &PathTree) -> Result<Vec<WalkEntry>> {
    let mut entries = Vec::new();
    let mut pending = vec![String::new()];
    while let Some(dir) = pending.pop() {
        for info in tree.open(&dir)?.readdir(-1) {
            let path = if dir.is_empty() {
                info.name.clone()
            } else {
                format!("{}/{}", dir, info.name)
            };
            if info.is_dir {
                pending.push(path.clone());
            }
            entries.push(WalkEntry { path, info });
        }
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}
