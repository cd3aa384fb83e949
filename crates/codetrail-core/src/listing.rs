//! Depth-first file lister: walks a codebase root applying layered ignore
//! rules and records cheap per-file metadata for the change detector.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::ignore::{GitignoreLayer, IgnoreEvaluator};

/// Cheap, pre-hash metadata about one file, as seen by the lister.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileMeta {
    pub size: u64,
    pub mtime: f64,
    pub inode: Option<u64>,
}

/// Walks `root`, skipping ignored entries, and returns a map of
/// root-relative forward-slash paths to their metadata. Symlinks are never
/// followed. Per-entry IO errors are swallowed: the entry is skipped and
/// the walk continues.
pub fn list_files(root: &Path, global_ignore_patterns: &[String]) -> crate::error::Result<BTreeMap<String, FileMeta>> {
    let mut evaluator = IgnoreEvaluator::new(global_ignore_patterns)?;
    let mut out = BTreeMap::new();
    walk_dir(root, root, "", &mut evaluator, &mut out);
    Ok(out)
}

fn walk_dir(
    root: &Path,
    dir: &Path,
    rel_dir: &str,
    evaluator: &mut IgnoreEvaluator,
    out: &mut BTreeMap<String, FileMeta>,
) {
    let gitignore_path = dir.join(".gitignore");
    let mut pushed = false;
    if let Ok(content) = fs::read_to_string(&gitignore_path) {
        match GitignoreLayer::parse(&content, rel_dir) {
            Ok(layer) => {
                pushed = true;
                evaluator.push_layer(layer);
            }
            Err(e) => debug!("skipping malformed .gitignore at {:?}: {e}", gitignore_path),
        }
    }

    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            debug!("skipping unreadable directory {:?}: {e}", dir);
            if pushed {
                evaluator.pop_layer();
            }
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!("skipping unreadable entry in {:?}: {e}", dir);
                continue;
            }
        };

        let file_type = match entry.file_type() {
            Ok(t) => t,
            Err(e) => {
                debug!("skipping entry with unreadable file type {:?}: {e}", entry.path());
                continue;
            }
        };

        if file_type.is_symlink() {
            continue;
        }

        let name = entry.file_name();
        let name = match name.to_str() {
            Some(n) => n.to_string(),
            None => continue,
        };

        let rel_path = if rel_dir.is_empty() {
            name.clone()
        } else {
            format!("{rel_dir}/{name}")
        };

        if evaluator.is_ignored(&rel_path, file_type.is_dir()) {
            continue;
        }

        if file_type.is_dir() {
            walk_dir(root, &dir.join(&name), &rel_path, evaluator, out);
        } else if file_type.is_file() {
            match entry.metadata() {
                Ok(meta) => {
                    out.insert(rel_path, to_file_meta(&meta));
                }
                Err(e) => {
                    debug!("skipping unreadable metadata for {:?}: {e}", entry.path());
                }
            }
        }
    }

    if pushed {
        evaluator.pop_layer();
    }
}

#[cfg(unix)]
fn to_file_meta(meta: &fs::Metadata) -> FileMeta {
    use std::os::unix::fs::MetadataExt;
    FileMeta {
        size: meta.len(),
        mtime: meta.mtime() as f64 + meta.mtime_nsec() as f64 / 1_000_000_000.0,
        inode: Some(meta.ino()),
    }
}

#[cfg(not(unix))]
fn to_file_meta(meta: &fs::Metadata) -> FileMeta {
    let mtime = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    FileMeta {
        size: meta.len(),
        mtime,
        inode: None,
    }
}
