//! Indexing orchestrator: brings a codebase's vector collection and graph
//! in sync with its current file contents, incrementally where possible.

use std::path::Path;
use std::sync::Arc;

use qdrant_client::qdrant::Distance;
use tracing::{info, warn};

use codetrail_core::{
    build_edges, detect_changes, list_files, split_file, Edge, Language, SnapshotStore,
    SplitterConfig,
};

use crate::client::QdrantStore;
use crate::embeddings::EmbeddingProvider;
use crate::error::{Result, SearchError};
use crate::explainer::Explainer;
use crate::graphdb::GraphDb;
use crate::schema::{self, ChunkPayload, CodePoint, CollectionConfig};

/// Points are streamed to the vector store in batches of this size during
/// a single `index` call.
const UPSERT_BATCH_SIZE: usize = 128;

#[derive(Debug, Clone, Default)]
pub struct IndexStats {
    pub files_added: usize,
    pub files_removed: usize,
    pub chunks_indexed: usize,
    pub chunks_removed: usize,
}

pub struct IndexerConfig {
    pub splitter: SplitterConfig,
    pub ignore_patterns: Vec<String>,
    pub explainer_enabled: bool,
    pub explainer_parallelism: usize,
    pub embedding_batch_size: usize,
    pub doc_embedding_enabled: bool,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            splitter: SplitterConfig::default(),
            ignore_patterns: Vec::new(),
            explainer_enabled: false,
            explainer_parallelism: 1,
            embedding_batch_size: 32,
            doc_embedding_enabled: false,
        }
    }
}

pub struct Indexer {
    store: QdrantStore,
    embeddings: Arc<dyn EmbeddingProvider>,
    explainer: Option<Arc<dyn Explainer>>,
    graph: Arc<dyn GraphDb>,
    snapshots: SnapshotStore,
    config: IndexerConfig,
}

impl Indexer {
    pub fn new(
        store: QdrantStore,
        embeddings: Arc<dyn EmbeddingProvider>,
        explainer: Option<Arc<dyn Explainer>>,
        graph: Arc<dyn GraphDb>,
        snapshots: SnapshotStore,
        config: IndexerConfig,
    ) -> Self {
        Self { store, embeddings, explainer, graph, snapshots, config }
    }

    /// Brings `codebase_path`'s collection in sync with its current files.
    /// With `force_reindex`, the collection and graph are dropped and the
    /// snapshot discarded first, so every file is treated as added.
    pub async fn index(&self, codebase_path: &str, force_reindex: bool) -> Result<IndexStats> {
        let root = Path::new(codebase_path);
        if !root.exists() {
            return Err(SearchError::PathNotFound(codebase_path.to_string()));
        }
        let collection = schema::collection_name(codebase_path);

        if force_reindex {
            info!(collection, "force reindex: dropping collection, graph, snapshot");
            self.store.drop_collection(&collection).await?;
            if let Err(e) = self.graph.delete_graph(&collection).await {
                warn!(collection, error = %e, "failed to drop graph during force reindex");
            }
            self.snapshots.delete(codebase_path)?;
        }

        let collection_config = CollectionConfig {
            code_dim: self.embeddings.embedding_dim() as u64,
            doc_dim: self.config.doc_embedding_enabled.then(|| self.embeddings.embedding_dim() as u64),
            distance: Distance::Cosine,
        };
        self.store.create_collection(&collection, &collection_config, force_reindex).await?;

        let snapshot = self.snapshots.load(codebase_path);
        let current_files = list_files(root, &self.config.ignore_patterns)?;
        let (changes, new_snapshot) = detect_changes(root, &snapshot, &current_files)?;

        if changes.is_empty() {
            info!(collection, "no changes detected, index already current");
            return Ok(IndexStats::default());
        }

        let mut stats = IndexStats::default();

        let to_remove = changes.to_remove();
        for path in &to_remove {
            self.store.delete_by_filter(&collection, schema::fields::RELATIVE_PATH, path).await?;
        }
        stats.files_removed = to_remove.len();
        stats.chunks_removed = to_remove.len();

        let to_add = changes.to_add();
        stats.files_added = to_add.len();

        let mut all_chunks = Vec::new();
        let mut continuation_groups = Vec::new();
        let mut source_files: Vec<(String, Language, String)> = Vec::new();

        for path in &to_add {
            let absolute = root.join(path);
            let source = match std::fs::read_to_string(&absolute) {
                Ok(s) => s,
                Err(e) => {
                    warn!(path, error = %e, "skipping unreadable file");
                    continue;
                }
            };
            let outcome = split_file(path, &source, &self.config.splitter);
            if let Some(language) = Language::from_path(Path::new(path)) {
                source_files.push((codetrail_core::normalize_path(path), language, source));
            }
            continuation_groups.extend(outcome.continuation_groups);
            all_chunks.extend(outcome.chunks);
        }

        let edge_inputs: Vec<codetrail_core::graphbuild::SourceFile> = source_files
            .iter()
            .map(|(path, language, source)| codetrail_core::graphbuild::SourceFile { normalized_path: path.clone(), language: *language, source: source.as_str() })
            .collect();
        let edges = build_edges(&all_chunks, &continuation_groups, &edge_inputs, true);

        for chunk_batch in all_chunks.chunks(UPSERT_BATCH_SIZE) {
            self.index_chunk_batch(&collection, chunk_batch).await?;
            stats.chunks_indexed += chunk_batch.len();
        }

        if let Err(e) = self.upsert_graph(&collection, &all_chunks, &edges).await {
            warn!(collection, error = %e, "graph enrichment failed, continuing without it");
        }

        self.snapshots.save(codebase_path, &new_snapshot)?;
        info!(collection, files_added = stats.files_added, chunks_indexed = stats.chunks_indexed, "index committed");
        Ok(stats)
    }

    async fn upsert_graph(&self, collection: &str, chunks: &[codetrail_core::CodeChunk], edges: &[Edge]) -> Result<()> {
        let node_ids: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();
        self.graph.upsert_edges(collection, &node_ids, edges).await
    }

    async fn index_chunk_batch(&self, collection: &str, chunks: &[codetrail_core::CodeChunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let contents: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let code_vectors = self.embeddings.embed_batch(&contents, self.config.embedding_batch_size).await?;

        let docs: Vec<Option<String>> = if self.config.explainer_enabled {
            if let Some(explainer) = &self.explainer {
                let explanations = explainer.explain_batch(&contents, self.config.explainer_parallelism).await?;
                explanations.into_iter().map(Some).collect()
            } else {
                chunks.iter().map(|c| c.doc.clone()).collect()
            }
        } else {
            chunks.iter().map(|c| c.doc.clone()).collect()
        };

        let doc_vectors: Vec<Option<Vec<f32>>> = if self.config.doc_embedding_enabled {
            let doc_texts: Vec<String> = docs.iter().map(|d| d.clone().unwrap_or_default()).collect();
            let embedded = self.embeddings.embed_batch(&doc_texts, self.config.embedding_batch_size).await?;
            embedded.into_iter().map(Some).collect()
        } else {
            vec![None; chunks.len()]
        };

        let indexed_at = indexed_at_timestamp();
        let points: Vec<CodePoint> = chunks
            .iter()
            .zip(code_vectors)
            .zip(docs)
            .zip(doc_vectors)
            .map(|(((chunk, code_dense), doc), doc_dense)| CodePoint {
                id: chunk.id.clone(),
                code_dense,
                doc_dense,
                payload: ChunkPayload {
                    content: chunk.content.clone(),
                    doc,
                    relative_path: chunk.file_path.clone(),
                    start_line: chunk.start_line,
                    end_line: chunk.end_line,
                    language: chunk.language.clone(),
                    indexed_at: indexed_at.clone(),
                },
            })
            .collect();

        self.store.upsert(collection, points).await
    }

    /// Drops a codebase's collection, graph, and snapshot. Idempotent.
    pub async fn delete(&self, codebase_path: &str) -> Result<()> {
        let collection = schema::collection_name(codebase_path);
        self.store.drop_collection(&collection).await?;
        if let Err(e) = self.graph.delete_graph(&collection).await {
            warn!(collection, error = %e, "failed to drop graph during delete");
        }
        self.snapshots.delete(codebase_path)?;
        Ok(())
    }
}

fn indexed_at_timestamp() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::QdrantConfig;
    use crate::embeddings::{create_provider, EmbeddingConfig};
    use crate::explainer::FakeExplainer;
    use crate::graphdb::InMemoryGraphDb;

    fn fake_indexer_config() -> IndexerConfig {
        IndexerConfig { explainer_enabled: true, doc_embedding_enabled: false, ..IndexerConfig::default() }
    }

    #[test]
    fn default_config_disables_explainer_and_doc_embedding() {
        let config = IndexerConfig::default();
        assert!(!config.explainer_enabled);
        assert!(!config.doc_embedding_enabled);
        assert_eq!(config.embedding_batch_size, 32);
    }

    #[tokio::test]
    async fn unreadable_path_returns_path_not_found() {
        let Ok(connect) = QdrantStore::connect(QdrantConfig { url: "http://127.0.0.1:1".into(), api_key: None }).await else {
            return; // no local Qdrant reachable in this environment
        };
        let embeddings = create_provider(&EmbeddingConfig::local()).unwrap();
        let graph: Arc<dyn GraphDb> = Arc::new(InMemoryGraphDb::new());
        let explainer: Arc<dyn Explainer> = Arc::new(FakeExplainer);
        let snapshots = SnapshotStore::new(std::env::temp_dir().join("codetrail-test-snapshots"));

        let indexer = Indexer::new(connect, embeddings, Some(explainer), graph, snapshots, fake_indexer_config());
        let result = indexer.index("/path/does/not/exist", false).await;
        assert!(matches!(result, Err(SearchError::PathNotFound(_))));
    }
}
