//! codetrail-core: syntax-aware chunking, change detection, and reference
//! graph construction for incremental code indexing.
//!
//! - Tree-sitter driven splitting into semantically meaningful chunks
//! - Content-addressed, deterministic chunk ids
//! - Merkle-style file snapshots for incremental re-indexing
//! - Layered `.gitignore`-style ignore evaluation
//! - Reference/call graph construction over emitted chunks

pub mod changes;
pub mod chunk;
pub mod error;
pub mod graphbuild;
pub mod hash;
pub mod ignore;
pub mod language;
pub mod listing;
pub mod snapshot;
pub mod splitter;

pub use changes::{detect_changes, DetectedChanges};
pub use chunk::{chunk_id, normalize_path, CodeChunk};
pub use error::{CoreError, Result};
pub use graphbuild::{build_edges, Edge, EdgeType};
pub use hash::{hash_bytes, hash_file_contents, hash_path_64};
pub use ignore::{GitignoreLayer, IgnoreEvaluator};
pub use language::Language;
pub use listing::{list_files, FileMeta};
pub use snapshot::{FileRecord, Snapshot, SnapshotStore, SNAPSHOT_SCHEMA_VERSION};
pub use splitter::{split_file, SplitOutcome, SplitterConfig};
