use std::fmt;
use std::time::Duration;

use similar::{ChangeTag, TextDiff};

use super::walk::walk;
use crate::tree::{PathTree, RequestContext, Result};

/// After this long the line diff stops looking for common lines and reports
/// the rest of both files as removed and added.
const LINE_DIFF_TIMEOUT: Duration = Duration::from_secs(2);

/// How a single path differs between tree `a` and tree `b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffKind {
    OnlyInA,
    OnlyInB,
    AFileBDir,
    ADirBFile,
    /// Both are files with different content; holds a line diff.
    Content(String),
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffKind::OnlyInA => write!(f, "only in a"),
            DiffKind::OnlyInB => write!(f, "only in b"),
            DiffKind::AFileBDir => write!(f, "on a is file, on b directory"),
            DiffKind::ADirBFile => write!(f, "on a is directory, on b file"),
            DiffKind::Content(lines) => write!(f, "content diff (-a, +b):\n{}", lines),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathDiff {
    pub path: String,
    pub kind: DiffKind,
}

/// All differences between two trees, ordered by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FsDiff {
    pub diffs: Vec<PathDiff>,
}

impl FsDiff {
    pub fn is_empty(&self) -> bool {
        self.diffs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diffs.len()
    }

    fn push(&mut self, path: &str, kind: DiffKind) {
        self.diffs.push(PathDiff {
            path: path.to_string(),
            kind,
        });
    }
}

impl fmt::Display for FsDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.diffs.is_empty() {
            return Ok(());
        }
        writeln!(f, "Diff between a and b:")?;
        for diff in &self.diffs {
            writeln!(f, "[{}]: {}", diff.path, diff.kind)?;
        }
        Ok(())
    }
}

/// Compare structure and file content of two trees. File content is read
/// under `ctx`, which loads any lazy file that was not read yet.
pub async fn diff(ctx: &RequestContext, a: &PathTree, b: &PathTree) -> Result<FsDiff> {
    let a_entries = walk(a)?;
    let b_entries = walk(b)?;
    let (mut i, mut j) = (0, 0);
    let mut out = FsDiff::default();

    while i < a_entries.len() || j < b_entries.len() {
        if j == b_entries.len() || (i < a_entries.len() && a_entries[i].path < b_entries[j].path) {
            out.push(&a_entries[i].path, DiffKind::OnlyInA);
            i += 1;
            continue;
        }
        if i == a_entries.len() || b_entries[j].path < a_entries[i].path {
            out.push(&b_entries[j].path, DiffKind::OnlyInB);
            j += 1;
            continue;
        }

        let (a_entry, b_entry) = (&a_entries[i], &b_entries[j]);
        let kind = match (a_entry.is_dir(), b_entry.is_dir()) {
            (true, true) => None,
            (false, true) => Some(DiffKind::AFileBDir),
            (true, false) => Some(DiffKind::ADirBFile),
            (false, false) => content_diff(ctx, a, b, &a_entry.path).await?,
        };
        if let Some(kind) = kind {
            out.push(&a_entry.path, kind);
        }
        i += 1;
        j += 1;
    }
    Ok(out)
}

async fn content_diff(
    ctx: &RequestContext,
    a: &PathTree,
    b: &PathTree,
    path: &str,
) -> Result<Option<DiffKind>> {
    let a_data = a.open_with_context(path, ctx)?.read_to_end().await?;
    let b_data = b.open_with_context(path, ctx)?.read_to_end().await?;
    if a_data == b_data {
        return Ok(None);
    }
    let a_text = String::from_utf8_lossy(&a_data);
    let b_text = String::from_utf8_lossy(&b_data);
    Ok(Some(DiffKind::Content(line_diff(&a_text, &b_text))))
}

/// Removed and added lines between `a` and `b`, common lines left out.
fn line_diff(a: &str, b: &str) -> String {
    let a: Vec<&str> = a.lines().collect();
    let b: Vec<&str> = b.lines().collect();

    let mut out = Vec::new();
    let diff = TextDiff::configure()
        .timeout(LINE_DIFF_TIMEOUT)
        .diff_slices(&a, &b);
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Equal => {}
            ChangeTag::Delete => out.push(format!("-{}", change.value())),
            ChangeTag::Insert => out.push(format!("+{}", change.value())),
        }
    }
    if out.is_empty() {
        // Same lines, so the difference is in line endings.
        out.push("(line endings differ)".to_string());
    }
    out.join("\n")
}
