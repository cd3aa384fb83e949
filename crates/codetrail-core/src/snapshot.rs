//! Per-codebase file-state snapshots: the commit fence for incremental
//! indexing. One JSON file per codebase, named by a hash of its absolute
//! path, replaced atomically on save.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CoreError, Result};
use crate::hash::hash_path_64;
use crate::listing::FileMeta;

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// One tracked file's last-known state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub size: u64,
    pub mtime: f64,
    pub inode: Option<u64>,
    pub hash: String,
}

impl FileRecord {
    /// Whether `meta` is still consistent with this record's cheap proxy
    /// fields, without touching file content.
    pub fn metadata_matches(&self, meta: &FileMeta) -> bool {
        self.size == meta.size && self.mtime == meta.mtime && self.inode == meta.inode
    }
}

/// The persisted file-state map for one codebase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub files: BTreeMap<String, FileRecord>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Snapshot {
            version: SNAPSHOT_SCHEMA_VERSION,
            files: BTreeMap::new(),
        }
    }
}

/// Resolves the on-disk path for a codebase's snapshot and loads/saves it.
pub struct SnapshotStore {
    snapshots_dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(snapshots_dir: impl Into<PathBuf>) -> Self {
        SnapshotStore {
            snapshots_dir: snapshots_dir.into(),
        }
    }

    /// `<snapshots_dir>/<first_16_hex(xxh3_64(absolute_codebase_path))>.json`
    pub fn path_for(&self, absolute_codebase_path: &str) -> PathBuf {
        let digest = hash_path_64(absolute_codebase_path);
        self.snapshots_dir.join(format!("{digest}.json"))
    }

    /// Load the snapshot for a codebase. A missing file, a decode failure,
    /// or a schema-version mismatch all yield an empty snapshot: per the
    /// wire contract, only an exact `version == 1` is honored.
    pub fn load(&self, absolute_codebase_path: &str) -> Snapshot {
        let path = self.path_for(absolute_codebase_path);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return Snapshot::empty(),
        };
        match serde_json::from_str::<Snapshot>(&content) {
            Ok(snap) if snap.version == SNAPSHOT_SCHEMA_VERSION => snap,
            Ok(_) => {
                warn!("snapshot at {:?} has unsupported version, treating as empty", path);
                Snapshot::empty()
            }
            Err(e) => {
                warn!("snapshot at {:?} failed to decode ({e}), treating as empty", path);
                Snapshot::empty()
            }
        }
    }

    /// Atomically replace the snapshot file: write to a sibling temp file
    /// then rename over the target.
    pub fn save(&self, absolute_codebase_path: &str, snapshot: &Snapshot) -> Result<()> {
        fs::create_dir_all(&self.snapshots_dir).map_err(|source| CoreError::SnapshotIo {
            path: self.snapshots_dir.clone(),
            source,
        })?;

        let path = self.path_for(absolute_codebase_path);
        let tmp_path = path.with_extension("json.tmp");

        let json = serde_json::to_vec_pretty(snapshot).map_err(|source| CoreError::SnapshotDecode {
            path: path.clone(),
            source,
        })?;

        let mut tmp = fs::File::create(&tmp_path).map_err(|source| CoreError::SnapshotIo {
            path: tmp_path.clone(),
            source,
        })?;
        tmp.write_all(&json).map_err(|source| CoreError::SnapshotIo {
            path: tmp_path.clone(),
            source,
        })?;
        tmp.sync_all().map_err(|source| CoreError::SnapshotIo {
            path: tmp_path.clone(),
            source,
        })?;
        drop(tmp);

        fs::rename(&tmp_path, &path).map_err(|source| CoreError::SnapshotIo { path, source })?;
        Ok(())
    }

    /// Delete a codebase's snapshot file, if present.
    pub fn delete(&self, absolute_codebase_path: &str) -> Result<()> {
        let path = self.path_for(absolute_codebase_path);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CoreError::SnapshotIo { path, source }),
        }
    }
}
