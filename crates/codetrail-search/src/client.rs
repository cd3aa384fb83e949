//! Qdrant-backed vector-DB adapter: collection lifecycle, point upsert and
//! delete, and the per-vector-name queries the hybrid searcher fuses.

use std::collections::HashMap;

use qdrant_client::qdrant::{
    vectors_config::Config as VectorsConfigVariant, Condition, CreateCollectionBuilder,
    DeletePointsBuilder, Filter, NamedVectors, PointId, PointStruct, QueryPointsBuilder,
    SparseIndexConfig, SparseVectorConfig, SparseVectorParams, Value, VectorParams,
    VectorParamsMap, Vector, Vectors, VectorsConfig,
};
use qdrant_client::{Payload, Qdrant};
use tracing::{debug, info};

use crate::error::{Result, SearchError};
use crate::schema::{fields, vectors as vname, CodePoint, CollectionConfig};

#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            api_key: None,
        }
    }
}

/// One named vector's raw match list, as returned by a single-vector query.
/// Fused by [`crate::hybrid`] into the final ranked result.
#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
}

pub struct QdrantStore {
    client: Qdrant,
}

impl QdrantStore {
    pub async fn connect(config: QdrantConfig) -> Result<Self> {
        info!(url = %config.url, "connecting to vector database");
        let mut builder = Qdrant::from_url(&config.url);
        if let Some(key) = config.api_key {
            builder = builder.api_key(key);
        }
        let client = builder.build().map_err(|e| SearchError::VectorDb(e.to_string()))?;
        client.list_collections().await.map_err(|e| SearchError::VectorDb(e.to_string()))?;
        Ok(Self { client })
    }

    pub async fn has_collection(&self, name: &str) -> Result<bool> {
        Ok(self.client.collection_exists(name).await.map_err(|e| SearchError::VectorDb(e.to_string()))?)
    }

    /// Creates `name` with `code_dense`/`code_sparse`, plus `doc_dense`/`doc_sparse`
    /// when `config.doc_dim` is set. If the collection already exists, its
    /// recorded `code_dense` size is checked against `config.code_dim`; a
    /// mismatch is a [`SearchError::DimensionMismatch`], not a silent recreate,
    /// unless `force` is set (the caller is expected to have already dropped it).
    pub async fn create_collection(&self, name: &str, config: &CollectionConfig, force: bool) -> Result<()> {
        if self.has_collection(name).await? {
            if force {
                return Ok(());
            }
            let info = self.client.collection_info(name).await.map_err(|e| SearchError::VectorDb(e.to_string()))?;
            if let Some(existing_dim) = existing_code_dim(&info) {
                if existing_dim != config.code_dim {
                    return Err(SearchError::DimensionMismatch {
                        collection: name.to_string(),
                        existing: existing_dim,
                        expected: config.code_dim,
                    });
                }
            }
            return Ok(());
        }

        let mut dense_map = HashMap::new();
        dense_map.insert(
            vname::CODE_DENSE.to_string(),
            VectorParams {
                size: config.code_dim,
                distance: config.distance.into(),
                ..Default::default()
            },
        );
        if let Some(doc_dim) = config.doc_dim {
            dense_map.insert(
                vname::DOC_DENSE.to_string(),
                VectorParams {
                    size: doc_dim,
                    distance: config.distance.into(),
                    ..Default::default()
                },
            );
        }
        let vectors_config = VectorsConfig {
            config: Some(VectorsConfigVariant::ParamsMap(VectorParamsMap { map: dense_map })),
        };

        let mut sparse_map = HashMap::new();
        sparse_map.insert(
            vname::CODE_SPARSE.to_string(),
            SparseVectorParams {
                index: Some(SparseIndexConfig::default()),
                modifier: Some(qdrant_client::qdrant::Modifier::Idf.into()),
                ..Default::default()
            },
        );
        if config.doc_dim.is_some() {
            sparse_map.insert(
                vname::DOC_SPARSE.to_string(),
                SparseVectorParams {
                    index: Some(SparseIndexConfig::default()),
                    modifier: Some(qdrant_client::qdrant::Modifier::Idf.into()),
                    ..Default::default()
                },
            );
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(vectors_config)
                    .sparse_vectors_config(SparseVectorConfig { map: sparse_map }),
            )
            .await
            .map_err(|e| SearchError::VectorDb(e.to_string()))?;

        info!(collection = name, "collection created");
        Ok(())
    }

    pub async fn drop_collection(&self, name: &str) -> Result<()> {
        if !self.has_collection(name).await? {
            return Ok(());
        }
        self.client.delete_collection(name).await.map_err(|e| SearchError::VectorDb(e.to_string()))?;
        Ok(())
    }

    pub async fn upsert(&self, collection: &str, points: Vec<CodePoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        debug!(collection, count = points.len(), "upserting points");

        let structs: Vec<PointStruct> = points
            .into_iter()
            .map(|p| {
                let mut named = NamedVectors::default();
                named = named.add_vector(vname::CODE_DENSE, p.code_dense);
                named = named.add_vector(vname::CODE_SPARSE, sparse_vector_from_text(&p.payload.content));
                if let Some(doc_dense) = p.doc_dense {
                    named = named.add_vector(vname::DOC_DENSE, doc_dense);
                    if let Some(doc) = &p.payload.doc {
                        named = named.add_vector(vname::DOC_SPARSE, sparse_vector_from_text(doc));
                    }
                }

                let payload = Payload::try_from(serde_json::json!({
                    fields::CONTENT: p.payload.content,
                    fields::DOC: p.payload.doc,
                    fields::RELATIVE_PATH: p.payload.relative_path,
                    fields::START_LINE: p.payload.start_line,
                    fields::END_LINE: p.payload.end_line,
                    fields::LANGUAGE: p.payload.language,
                    fields::INDEXED_AT: p.payload.indexed_at,
                }))
                .unwrap_or_default();

                PointStruct::new(PointId::from(p.id), Vectors::from(named), payload)
            })
            .collect();

        self.client
            .upsert_points(qdrant_client::qdrant::UpsertPointsBuilder::new(collection, structs).wait(true))
            .await
            .map_err(|e| SearchError::VectorDb(e.to_string()))?;
        Ok(())
    }

    /// Deletes every point whose payload field `key` equals `value`. Used to
    /// remove all points for a path that disappeared from the codebase.
    pub async fn delete_by_filter(&self, collection: &str, key: &str, value: &str) -> Result<()> {
        let filter = Filter::must([Condition::matches(key, value.to_string())]);
        self.client
            .delete_points(DeletePointsBuilder::new(collection).points(filter).wait(true))
            .await
            .map_err(|e| SearchError::VectorDb(e.to_string()))?;
        Ok(())
    }

    /// Runs one named-vector query and returns its ranked matches, for the
    /// hybrid searcher to fuse across `code_dense`/`code_sparse`/`doc_dense`/`doc_sparse`.
    pub async fn query_vector(&self, collection: &str, vector_name: &str, query: Vec<f32>, limit: u64) -> Result<Vec<VectorMatch>> {
        let response = self
            .client
            .query(
                QueryPointsBuilder::new(collection)
                    .query(query)
                    .using(vector_name)
                    .limit(limit)
                    .with_payload(false),
            )
            .await
            .map_err(|e| SearchError::VectorDb(e.to_string()))?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|p| Some(VectorMatch { id: point_id_to_string(p.id?), score: p.score }))
            .collect())
    }

    pub async fn query_sparse(&self, collection: &str, vector_name: &str, text: &str, limit: u64) -> Result<Vec<VectorMatch>> {
        let sparse = sparse_vector_from_text(text);
        let (indices, values) = sparse
            .try_into_sparse()
            .map_err(|e| SearchError::VectorDb(format!("invalid sparse vector: {e}")))?;
        let sparse_pairs: Vec<(u32, f32)> = indices.into_iter().zip(values).collect();
        let response = self
            .client
            .query(
                QueryPointsBuilder::new(collection)
                    .query(sparse_pairs)
                    .using(vector_name)
                    .limit(limit)
                    .with_payload(false),
            )
            .await
            .map_err(|e| SearchError::VectorDb(e.to_string()))?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|p| Some(VectorMatch { id: point_id_to_string(p.id?), score: p.score }))
            .collect())
    }

    /// Fetches payloads for a set of point ids, for the search orchestrator
    /// to attach to fused results (including graph neighbors never scored
    /// by the retriever).
    pub async fn fetch_payloads(&self, collection: &str, ids: &[String]) -> Result<HashMap<String, crate::schema::ChunkPayload>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let point_ids: Vec<PointId> = ids.iter().cloned().map(PointId::from).collect();
        let response = self
            .client
            .get_points(qdrant_client::qdrant::GetPointsBuilder::new(collection, point_ids).with_payload(true))
            .await
            .map_err(|e| SearchError::VectorDb(e.to_string()))?;

        let mut out = HashMap::new();
        for point in response.result {
            let Some(id) = point.id else { continue };
            let id = point_id_to_string(id);
            let get_string = |key: &str| -> Option<String> { point.payload.get(key).and_then(value_as_str).map(|s| s.to_string()) };
            let get_u32 = |key: &str| -> u32 { point.payload.get(key).and_then(value_as_int).map(|i| i as u32).unwrap_or(0) };
            out.insert(
                id,
                crate::schema::ChunkPayload {
                    content: get_string(fields::CONTENT).unwrap_or_default(),
                    doc: get_string(fields::DOC),
                    relative_path: get_string(fields::RELATIVE_PATH).unwrap_or_default(),
                    start_line: get_u32(fields::START_LINE),
                    end_line: get_u32(fields::END_LINE),
                    language: get_string(fields::LANGUAGE).unwrap_or_default(),
                    indexed_at: get_string(fields::INDEXED_AT).unwrap_or_default(),
                },
            );
        }
        Ok(out)
    }
}

fn value_as_str(v: &Value) -> Option<&str> {
    v.as_str().map(|s| s.as_str())
}

fn value_as_int(v: &Value) -> Option<i64> {
    v.as_integer()
}

fn point_id_to_string(id: PointId) -> String {
    match id.point_id_options {
        Some(qdrant_client::qdrant::point_id::PointIdOptions::Uuid(u)) => u,
        Some(qdrant_client::qdrant::point_id::PointIdOptions::Num(n)) => n.to_string(),
        None => String::new(),
    }
}

fn existing_code_dim(info: &qdrant_client::qdrant::GetCollectionInfoResponse) -> Option<u64> {
    let config = info.result.as_ref()?.config.as_ref()?;
    let params = config.params.as_ref()?;
    let vectors = params.vectors_config.as_ref()?.config.as_ref()?;
    match vectors {
        VectorsConfigVariant::Params(p) => Some(p.size),
        VectorsConfigVariant::ParamsMap(m) => m.map.get(vname::CODE_DENSE).map(|p| p.size),
    }
}

/// Maps a normalized term to a stable sparse-dimension index via its
/// 32-bit hash, so the same word always lands on the same dimension
/// without maintaining a growing vocabulary table.
fn term_index(term: &str) -> u32 {
    (xxhash_rust::xxh3::xxh3_64(term.as_bytes()) & 0xFFFF_FFFF) as u32
}

/// Deterministic bag-of-words sparse encoding of `text`, with per-document
/// term frequency only. Corpus-wide IDF weighting is applied by the
/// collection's sparse-vector `Modifier::Idf`, not computed here.
pub fn sparse_vector_from_text(text: &str) -> qdrant_client::qdrant::Vector {
    let mut term_counts: HashMap<u32, f32> = HashMap::new();
    for word in text.split_whitespace() {
        let normalized: String = word.chars().filter(|c| c.is_alphanumeric()).flat_map(|c| c.to_lowercase()).collect();
        if normalized.is_empty() {
            continue;
        }
        let index = term_index(&normalized);
        *term_counts.entry(index).or_insert(0.0) += 1.0;
    }
    let mut indices: Vec<u32> = term_counts.keys().copied().collect();
    indices.sort_unstable();
    let values: Vec<f32> = indices.iter().map(|i| term_counts[i]).collect();
    Vector::new_sparse(indices, values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_encoding_counts_repeated_terms() {
        let v = sparse_vector_from_text("foo foo bar");
        let sparse = v.as_sparse().expect("sparse vector");
        assert_eq!(sparse.indices.len(), 2);
        assert!(sparse.values.contains(&2.0));
        assert!(sparse.values.contains(&1.0));
    }

    #[test]
    fn config_default_points_at_local_server() {
        assert_eq!(QdrantConfig::default().url, "http://localhost:6334");
    }
}
