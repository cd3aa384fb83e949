//! Change detector: diffs an old snapshot against a fresh file listing,
//! with inode- and content-hash-based rename detection.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use crate::error::Result;
use crate::hash::hash_file_contents;
use crate::listing::FileMeta;
use crate::snapshot::{FileRecord, Snapshot};

/// The three disjoint path sets produced by one detection pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectedChanges {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub removed: Vec<String>,
}

impl DetectedChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    /// `added ∪ modified`, the set of paths to (re)split and (re)embed.
    pub fn to_add(&self) -> Vec<String> {
        let mut v: Vec<String> = self.added.iter().chain(self.modified.iter()).cloned().collect();
        v.sort();
        v.dedup();
        v
    }

    /// `modified ∪ removed`, the set of paths to delete from the vector store.
    pub fn to_remove(&self) -> Vec<String> {
        let mut v: Vec<String> = self.modified.iter().chain(self.removed.iter()).cloned().collect();
        v.sort();
        v.dedup();
        v
    }
}

/// Diff `snapshot` against `current`, resolving renames by inode then by
/// content hash. `root` is the codebase root, used to re-hash files whose
/// metadata changed or whose identity needs confirming.
///
/// The returned snapshot's `FileRecord`s reuse the old record wherever
/// `(size,mtime,inode)` still matched, to avoid re-hashing unchanged files.
pub fn detect_changes(
    root: &Path,
    snapshot: &Snapshot,
    current: &BTreeMap<String, FileMeta>,
) -> Result<(DetectedChanges, Snapshot)> {
    let old_keys: BTreeSet<&String> = snapshot.files.keys().collect();
    let new_keys: BTreeSet<&String> = current.keys().collect();

    let mut added: Vec<String> = new_keys.difference(&old_keys).map(|s| s.to_string()).collect();
    let mut removed: Vec<String> = old_keys.difference(&new_keys).map(|s| s.to_string()).collect();
    let common: Vec<String> = new_keys.intersection(&old_keys).map(|s| s.to_string()).collect();
    added.sort();
    removed.sort();

    let mut modified: Vec<String> = Vec::new();
    let mut new_files: BTreeMap<String, FileRecord> = BTreeMap::new();

    for path in &common {
        let old_record = &snapshot.files[path];
        let meta = &current[path];
        if old_record.metadata_matches(meta) {
            new_files.insert(path.clone(), old_record.clone());
            continue;
        }

        let hash = hash_file_contents(&root.join(path))?;
        if hash != old_record.hash {
            modified.push(path.clone());
        }
        new_files.insert(
            path.clone(),
            FileRecord {
                size: meta.size,
                mtime: meta.mtime,
                inode: meta.inode,
                hash,
            },
        );
    }

    let old_by_inode: HashMap<u64, &String> = snapshot
        .files
        .iter()
        .filter_map(|(path, record)| record.inode.map(|ino| (ino, path)))
        .collect();
    let old_by_hash: HashMap<&str, &String> = snapshot
        .files
        .iter()
        .map(|(path, record)| (record.hash.as_str(), path))
        .collect();

    let mut still_added = Vec::new();
    let mut consumed_removed: BTreeSet<String> = BTreeSet::new();

    for new_path in added {
        let meta = &current[&new_path];
        let matched_old = meta.inode.and_then(|ino| old_by_inode.get(&ino)).copied();

        if let Some(old_path) = matched_old {
            if consumed_removed.contains(old_path) || !removed.contains(old_path) {
                still_added.push(new_path);
                continue;
            }
            let hash = hash_file_contents(&root.join(&new_path))?;
            let old_record = &snapshot.files[old_path];
            if hash == old_record.hash {
                // Pure rename: content unchanged. Neither side recorded as a change.
                consumed_removed.insert(old_path.clone());
                new_files.insert(
                    new_path.clone(),
                    FileRecord {
                        size: meta.size,
                        mtime: meta.mtime,
                        inode: meta.inode,
                        hash,
                    },
                );
            } else {
                // Same inode, different content: the new path is a modification;
                // the old path is left in `removed` (delete-then-insert).
                modified.push(new_path.clone());
                new_files.insert(
                    new_path.clone(),
                    FileRecord {
                        size: meta.size,
                        mtime: meta.mtime,
                        inode: meta.inode,
                        hash,
                    },
                );
            }
            continue;
        }

        still_added.push(new_path);
    }

    let mut final_added = Vec::new();
    for new_path in still_added {
        let meta = &current[&new_path];
        let hash = hash_file_contents(&root.join(&new_path))?;
        let content_match = old_by_hash
            .get(hash.as_str())
            .filter(|old_path| !consumed_removed.contains(old_path.as_str()) && removed.contains(old_path));

        if let Some(old_path) = content_match {
            consumed_removed.insert((*old_path).clone());
        } else {
            final_added.push(new_path.clone());
        }
        new_files.insert(
            new_path,
            FileRecord {
                size: meta.size,
                mtime: meta.mtime,
                inode: meta.inode,
                hash,
            },
        );
    }

    removed.retain(|p| !consumed_removed.contains(p));
    modified.sort();
    modified.dedup();
    final_added.sort();

    Ok((
        DetectedChanges {
            added: final_added,
            modified,
            removed,
        },
        Snapshot {
            version: snapshot.version.max(crate::snapshot::SNAPSHOT_SCHEMA_VERSION),
            files: new_files,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_bytes;
    use tempfile::TempDir;

    fn meta(size: u64, mtime: f64, inode: Option<u64>) -> FileMeta {
        FileMeta { size, mtime, inode }
    }

    fn record(size: u64, mtime: f64, inode: Option<u64>, hash: &str) -> FileRecord {
        FileRecord {
            size,
            mtime,
            inode,
            hash: hash.to_string(),
        }
    }

    #[test]
    fn unchanged_file_produces_no_changes() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.py"), b"x").unwrap();
        let mut snap = Snapshot::empty();
        snap.files.insert(
            "a.py".to_string(),
            record(1, 1.0, Some(1), &hash_bytes(b"x")),
        );
        let mut current = BTreeMap::new();
        current.insert("a.py".to_string(), meta(1, 1.0, Some(1)));

        let (changes, _) = detect_changes(tmp.path(), &snap, &current).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn metadata_changed_but_content_same_is_unchanged() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.py"), b"x").unwrap();
        let mut snap = Snapshot::empty();
        snap.files.insert(
            "a.py".to_string(),
            record(1, 1.0, Some(1), &hash_bytes(b"x")),
        );
        let mut current = BTreeMap::new();
        current.insert("a.py".to_string(), meta(1, 2.0, Some(1)));

        let (changes, new_snap) = detect_changes(tmp.path(), &snap, &current).unwrap();
        assert!(changes.is_empty());
        assert_eq!(new_snap.files["a.py"].mtime, 2.0);
    }

    #[test]
    fn modified_content_detected() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.py"), b"y").unwrap();
        let mut snap = Snapshot::empty();
        snap.files.insert(
            "a.py".to_string(),
            record(1, 1.0, Some(1), &hash_bytes(b"x")),
        );
        let mut current = BTreeMap::new();
        current.insert("a.py".to_string(), meta(1, 2.0, Some(1)));

        let (changes, _) = detect_changes(tmp.path(), &snap, &current).unwrap();
        assert_eq!(changes.modified, vec!["a.py".to_string()]);
    }

    #[test]
    fn pure_rename_by_inode_is_invisible() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("b.py"), b"content").unwrap();
        let mut snap = Snapshot::empty();
        snap.files.insert(
            "a.py".to_string(),
            record(7, 1.0, Some(42), &hash_bytes(b"content")),
        );
        let mut current = BTreeMap::new();
        current.insert("b.py".to_string(), meta(7, 1.0, Some(42)));

        let (changes, new_snap) = detect_changes(tmp.path(), &snap, &current).unwrap();
        assert!(changes.is_empty());
        assert!(new_snap.files.contains_key("b.py"));
        assert!(!new_snap.files.contains_key("a.py"));
    }

    #[test]
    fn rename_by_content_hash_when_inode_unavailable() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("b.py"), b"content").unwrap();
        let mut snap = Snapshot::empty();
        snap.files.insert(
            "a.py".to_string(),
            record(7, 1.0, None, &hash_bytes(b"content")),
        );
        let mut current = BTreeMap::new();
        current.insert("b.py".to_string(), meta(7, 2.0, None));

        let (changes, _) = detect_changes(tmp.path(), &snap, &current).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn reused_inode_different_content_is_modify_plus_remove() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("b.py"), b"new-content").unwrap();
        let mut snap = Snapshot::empty();
        snap.files.insert(
            "a.py".to_string(),
            record(3, 1.0, Some(9), &hash_bytes(b"old")),
        );
        let mut current = BTreeMap::new();
        current.insert("b.py".to_string(), meta(11, 2.0, Some(9)));

        let (changes, _) = detect_changes(tmp.path(), &snap, &current).unwrap();
        assert_eq!(changes.modified, vec!["b.py".to_string()]);
        assert_eq!(changes.removed, vec!["a.py".to_string()]);
        assert!(changes.added.is_empty());
    }

    #[test]
    fn added_and_removed_detected() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("new.py"), b"z").unwrap();
        let mut snap = Snapshot::empty();
        snap.files.insert(
            "gone.py".to_string(),
            record(1, 1.0, Some(1), &hash_bytes(b"gone")),
        );
        let mut current = BTreeMap::new();
        current.insert("new.py".to_string(), meta(1, 1.0, Some(2)));

        let (changes, _) = detect_changes(tmp.path(), &snap, &current).unwrap();
        assert_eq!(changes.added, vec!["new.py".to_string()]);
        assert_eq!(changes.removed, vec!["gone.py".to_string()]);
    }

    #[test]
    fn to_add_and_to_remove_are_unions() {
        let changes = DetectedChanges {
            added: vec!["a".into()],
            modified: vec!["b".into()],
            removed: vec!["c".into()],
        };
        assert_eq!(changes.to_add(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(changes.to_remove(), vec!["b".to_string(), "c".to_string()]);
    }
}
