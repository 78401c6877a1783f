//! Glob include-filter for tree population.
//!
//! Patterns are matched one path component at a time, and `*` never crosses
//! a separator (`**` is the same as `*`). Files must match every component
//! of a pattern. Directories only need to match a leading run of components,
//! so that directories which may still contain matching files are kept.

use ::glob::{MatchOptions, Pattern};
use thiserror::Error;

/// A pattern that failed to parse.
#[derive(Debug, Error)]
#[error("bad glob pattern {pattern:?}: {message}")]
pub struct PatternError {
    pub pattern: String,
    pub message: String,
}

const OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Clone)]
struct CompiledPattern {
    components: Vec<Pattern>,
}

/// A set of include patterns. An empty set matches everything.
#[derive(Clone, Default)]
pub struct Patterns {
    sources: Vec<String>,
    compiled: Vec<CompiledPattern>,
}

impl Patterns {
    pub fn new<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sources = Vec::new();
        let mut compiled = Vec::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let components = pattern
                .split('/')
                .map(|part| compile(pattern, &collapse_stars(part)))
                .collect::<Result<Vec<_>, _>>()?;
            sources.push(pattern.to_string());
            compiled.push(CompiledPattern { components });
        }
        Ok(Self { sources, compiled })
    }

    /// A filter that accepts every path.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Test `path` against the patterns: a full match for files, a
    /// component-wise prefix match for directories.
    pub fn matches(&self, path: &str, is_dir: bool) -> bool {
        if self.compiled.is_empty() {
            return true;
        }
        let path = clean_path(path);
        if is_dir {
            self.matches_prefix(&path)
        } else {
            self.matches_full(&path)
        }
    }

    fn matches_full(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.split('/').collect();
        self.compiled
            .iter()
            .any(|p| p.components.len() == parts.len() && p.matches_leading(&parts))
    }

    fn matches_prefix(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.split('/').collect();
        self.compiled
            .iter()
            .any(|p| p.components.len() >= parts.len() && p.matches_leading(&parts))
    }
}

impl CompiledPattern {
    fn matches_leading(&self, parts: &[&str]) -> bool {
        parts
            .iter()
            .zip(&self.components)
            .all(|(part, pattern)| pattern.matches_with(part, OPTIONS))
    }
}

impl std::fmt::Debug for Patterns {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Patterns").field(&self.sources).finish()
    }
}

/// Squash runs of `*` so that `**` cannot match across directories.
fn collapse_stars(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for c in part.chars() {
        if !(c == '*' && out.ends_with('*')) {
            out.push(c);
        }
    }
    out
}

fn compile(source: &str, pattern: &str) -> Result<Pattern, PatternError> {
    Pattern::new(pattern).map_err(|e| PatternError {
        pattern: source.to_string(),
        message: e.to_string(),
    })
}

/// Lexically clean a slash-separated path: drop empty and `.` components,
/// resolve `..`, and remove any trailing separator. An empty result is `.`.
pub fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{}", joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(list: &[&str]) -> Patterns {
        Patterns::new(list.iter().copied()).unwrap()
    }

    #[test]
    fn matches() {
        let cases: Vec<(Vec<&str>, &str, bool)> = vec![
            (vec![], "foo", false),
            (vec!["foo"], "foo", false),
            (vec!["*"], "foo", false),
            (vec!["foo"], "./foo", false),
            (vec!["foo"], "foo/", false),
            (vec!["foo"], "./foo/", false),
            (vec!["foo", "bar"], "foo", false),
            (vec!["bar", "foo"], "foo", false),
            (vec!["*/*"], "foo/bar", false),
            (vec!["*/*"], "./foo/bar", false),
            (vec!["*/*"], "foo/bar/", false),
            (vec!["*/*"], "./foo/bar/", false),
            (vec!["*/*"], "foo", true),
            (vec!["*"], "foo", true),
            (vec!["foo"], "foo", true),
        ];
        for (list, name, is_dir) in &cases {
            assert!(
                patterns(list).matches(name, *is_dir),
                "{:?} should match {:?} (dir: {})",
                list,
                name,
                is_dir
            );
        }
    }

    #[test]
    fn no_match() {
        let cases: Vec<(Vec<&str>, &str, bool)> = vec![
            (vec!["f"], "foo", false),
            (vec!["f", "bar"], "foo", false),
            (vec!["bar", "f"], "foo", false),
            (vec!["*/*"], "foo", false),
            (vec!["*/*"], "./foo", false),
            (vec!["*/*"], "foo/", false),
            (vec!["*/*"], "./foo/", false),
            (vec!["*"], "foo/bar", false),
            (vec!["*"], "./foo/bar", false),
            (vec!["*"], "foo/bar/", false),
            (vec!["*"], "./foo/bar/", false),
            (vec!["*"], "foo/bar", true),
            (vec!["*"], "./foo/bar", true),
            (vec!["*"], "foo/bar/", true),
            (vec!["*"], "./foo/bar/", true),
        ];
        for (list, name, is_dir) in &cases {
            assert!(
                !patterns(list).matches(name, *is_dir),
                "{:?} should not match {:?} (dir: {})",
                list,
                name,
                is_dir
            );
        }
    }

    #[test]
    fn depth_scoped_pattern() {
        let p = patterns(&["*/*.txt"]);
        assert!(p.matches("dir/file.txt", false));
        assert!(!p.matches("file.txt", false));
        assert!(!p.matches("dir/sub/file.txt", false));
        assert!(!p.matches("dir/file.md", false));
        assert!(p.matches("dir", true));
        assert!(!p.matches("dir/sub", true));
    }

    #[test]
    fn double_star_stays_in_one_component() {
        let p = patterns(&["**/f111"]);
        assert!(!p.matches("d1/d11/f111", false));
        assert!(!p.matches("d1/d11", true));
        assert!(p.matches("d1/f111", false));
        assert!(p.matches("d1", true));

        let p = patterns(&["d1/**"]);
        assert!(p.matches("d1/f", false));
        assert!(!p.matches("d1/d11/f", false));
        assert!(p.matches("d1/d11", true));
        assert!(!p.matches("d1/d11/d111", true));
    }

    #[test]
    fn file_match_implies_parent_dirs_match() {
        let p = patterns(&["*/*1/f*", "**/x?z", "[a-c]*/**"]);
        for path in ["d1/d11/f111", "a/xyz", "b0/q", "c/w/f1"] {
            if !p.matches(path, false) {
                continue;
            }
            let parts: Vec<&str> = path.split('/').collect();
            for n in 1..parts.len() {
                let dir = parts[..n].join("/");
                assert!(p.matches(&dir, true), "{} matches but {} does not", path, dir);
            }
        }
    }

    #[test]
    fn bad_pattern() {
        assert!(Patterns::new(["["]).is_err());
        assert!(Patterns::new(["ok", "a/[b"]).is_err());
    }

    #[test]
    fn clean() {
        assert_eq!(clean_path("./foo/"), "foo");
        assert_eq!(clean_path("a//b/./c/.."), "a/b");
        assert_eq!(clean_path(""), ".");
        assert_eq!(clean_path("../x"), "../x");
        assert_eq!(clean_path("/../x"), "/x");
    }
}
