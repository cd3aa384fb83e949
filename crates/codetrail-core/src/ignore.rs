//! Layered, negation-aware `.gitignore`-style path matching, built on the
//! `ignore` crate's own gitignore matcher for pattern semantics.
//!
//! Patterns are evaluated in a single ordered list: global patterns first,
//! then each ancestor directory's own `.gitignore` layer root-to-leaf, and
//! the last layer to reach a verdict on a path decides whether it is
//! ignored ("last match wins", the same semantics git itself uses). On top
//! of that, two rules apply unconditionally and cannot be negated: any path
//! component starting with `.` is ignored, and non-directory files whose
//! extension is outside the supported set are ignored.

use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::Match;

use crate::error::{CoreError, Result};
use crate::language::Language;

fn build(lines: &[&str], base_dir: &str, source_file: &str) -> Result<Gitignore> {
    let mut builder = GitignoreBuilder::new(base_dir);
    for line in lines {
        builder.add_line(None, line).map_err(|e| CoreError::InvalidPattern {
            pattern: (*line).to_string(),
            source_file: source_file.to_string(),
            message: e.to_string(),
        })?;
    }
    builder.build().map_err(|e| CoreError::InvalidPattern {
        pattern: String::new(),
        source_file: source_file.to_string(),
        message: e.to_string(),
    })
}

/// A parsed `.gitignore` file, ready to be appended to an [`IgnoreEvaluator`].
pub struct GitignoreLayer {
    matcher: Gitignore,
}

impl GitignoreLayer {
    /// Parse a `.gitignore` file's text content. `base_dir` is the
    /// root-relative, forward-slash directory the file lives in ("" at the
    /// codebase root).
    pub fn parse(content: &str, base_dir: &str) -> Result<Self> {
        let lines: Vec<&str> = content.lines().collect();
        let matcher = build(&lines, base_dir, &format!("{base_dir}/.gitignore"))?;
        Ok(GitignoreLayer { matcher })
    }
}

/// Evaluates ignore status for paths under a single codebase root.
///
/// Construct once with the global pattern list, then push a
/// [`GitignoreLayer`] per ancestor directory as the file lister descends
/// (root-to-leaf order matters: push in the order directories are entered),
/// and pop it once that directory's subtree has been fully visited.
pub struct IgnoreEvaluator {
    layers: Vec<Gitignore>,
}

impl IgnoreEvaluator {
    /// Build an evaluator from the global pattern list (raw gitignore-style
    /// lines, evaluated as a layer rooted at the codebase root).
    pub fn new(global_patterns: &[String]) -> Result<Self> {
        let lines: Vec<&str> = global_patterns.iter().map(String::as_str).collect();
        let global = build(&lines, "", "<global>")?;
        Ok(IgnoreEvaluator { layers: vec![global] })
    }

    /// Append a parsed ancestor `.gitignore`'s layer. Call in root-to-leaf
    /// order while descending the tree.
    pub fn push_layer(&mut self, layer: GitignoreLayer) {
        self.layers.push(layer.matcher);
    }

    /// Pop the most recently pushed layer. Call once a directory's subtree
    /// has been fully visited, and only if a layer was pushed for it.
    pub fn pop_layer(&mut self) {
        self.layers.pop();
    }

    /// Resolve whether `rel_path` (forward-slash, relative to the codebase
    /// root, no leading slash) is ignored.
    pub fn is_ignored(&self, rel_path: &str, is_dir: bool) -> bool {
        if rel_path
            .split('/')
            .any(|component| component.starts_with('.') && component != "." && !component.is_empty())
        {
            return true;
        }
        if !is_dir && Language::from_path(Path::new(rel_path)).is_none() {
            return true;
        }

        let mut ignored = false;
        for layer in &self.layers {
            match layer.matched(rel_path, is_dir) {
                Match::None => {}
                Match::Ignore(_) => ignored = true,
                Match::Whitelist(_) => ignored = false,
            }
        }
        ignored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(global: &[&str]) -> IgnoreEvaluator {
        IgnoreEvaluator::new(&global.iter().map(|s| s.to_string()).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn dotfiles_always_ignored() {
        let e = eval(&[]);
        assert!(e.is_ignored(".git", true));
        assert!(e.is_ignored("src/.hidden/x.py", false));
    }

    #[test]
    fn unsupported_extension_ignored() {
        let e = eval(&[]);
        assert!(e.is_ignored("README.md", false));
        assert!(!e.is_ignored("README.md", true));
    }

    #[test]
    fn basename_pattern_matches_any_depth() {
        let e = eval(&["*.pyc"]);
        assert!(e.is_ignored("a.pyc", false));
    }

    #[test]
    fn negation_overrides_earlier_match_last_wins() {
        let e = eval(&["build/*", "!build/keep.py"]);
        assert!(e.is_ignored("build/drop.py", false));
        assert!(!e.is_ignored("build/keep.py", false));
    }

    #[test]
    fn anchored_pattern_matches_only_at_root() {
        let e = eval(&["/only_root.py"]);
        assert!(e.is_ignored("only_root.py", false));
    }

    #[test]
    fn nested_gitignore_layers_root_to_leaf() {
        let mut e = eval(&["*.log"]);
        let layer = GitignoreLayer::parse("!keep.log\n", "sub").unwrap();
        e.push_layer(layer);
        assert!(!e.is_ignored("sub/keep.log", false));
        assert!(e.is_ignored("sub/other.log", false));
        e.pop_layer();
        assert!(e.is_ignored("sub/keep.log", false));
    }

    #[test]
    fn dir_only_pattern_does_not_match_files() {
        let e = eval(&["vendor/"]);
        assert!(e.is_ignored("vendor", true));
        assert!(!e.is_ignored("vendor", false));
    }
}
