use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use super::error::{BinfsError, Result};
use super::decode;
use crate::tree::PathTree;

/// Packed trees by project name.
///
/// Lookups hand out clones of the stored tree; clones share file content,
/// so every lookup of a project serves the same bytes.
#[derive(Debug, Default)]
pub struct Registry {
    trees: RwLock<HashMap<String, PathTree>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `data` and store it under `project`.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRegistered` if `project` was registered before, and
    /// the `decode` errors for bad data. A failed registration stores nothing.
    pub fn register(&self, project: &str, version: u32, data: &[u8]) -> Result<()> {
        if self.contains(project) {
            return Err(BinfsError::AlreadyRegistered(project.to_string()));
        }
        let tree = decode(data, version)?;

        let mut trees = self.trees.write().unwrap_or_else(PoisonError::into_inner);
        if trees.contains_key(project) {
            return Err(BinfsError::AlreadyRegistered(project.to_string()));
        }
        debug!(project, files = tree.file_count(), "registered packed tree");
        trees.insert(project.to_string(), tree);
        Ok(())
    }

    pub fn lookup(&self, project: &str) -> Option<PathTree> {
        self.trees
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(project)
            .cloned()
    }

    pub fn contains(&self, project: &str) -> bool {
        self.trees
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(project)
    }

    /// Registered project names, sorted.
    pub fn projects(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .trees
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}
