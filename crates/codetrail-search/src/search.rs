//! Search orchestrator: validates a query, runs the hybrid retrieval, and
//! optionally expands the result set with graph neighbors of the seeds.

use tracing::warn;

use crate::client::QdrantStore;
use crate::embeddings::EmbeddingProvider;
use crate::error::{Result, SearchError};
use crate::hybrid::HybridSearcher;
use crate::schema::{self, SearchHit};
use crate::graphdb::GraphDb;

const DEFAULT_GRAPH_LIMIT: usize = 30;

pub struct SearchRequest<'a> {
    pub codebase_path: &'a str,
    pub query: &'a str,
    pub top_k: usize,
    pub threshold: f32,
    pub max_graph_hops: Option<u32>,
    pub graph_limit: Option<usize>,
}

pub struct Searcher {
    store: QdrantStore,
    embeddings: std::sync::Arc<dyn EmbeddingProvider>,
    graph: std::sync::Arc<dyn GraphDb>,
    doc_embedding_enabled: bool,
}

impl Searcher {
    pub fn new(
        store: QdrantStore,
        embeddings: std::sync::Arc<dyn EmbeddingProvider>,
        graph: std::sync::Arc<dyn GraphDb>,
        doc_embedding_enabled: bool,
    ) -> Self {
        Self { store, embeddings, graph, doc_embedding_enabled }
    }

    pub async fn search(&self, request: SearchRequest<'_>) -> Result<Vec<SearchHit>> {
        validate(&request)?;

        let collection = schema::collection_name(request.codebase_path);
        if !self.store.has_collection(&collection).await? {
            return Err(SearchError::NotIndexed(request.codebase_path.to_string()));
        }

        let code_query = self.embeddings.embed(request.query).await?;
        let doc_query = if self.doc_embedding_enabled { Some(self.embeddings.embed(request.query).await?) } else { None };

        let searcher = HybridSearcher::new(&self.store);
        let seeds = searcher
            .hybrid_query(&collection, request.query, code_query, doc_query, request.top_k, request.threshold)
            .await?;

        let Some(hops) = request.max_graph_hops else {
            return Ok(seeds);
        };

        let seed_ids: Vec<String> = seeds.iter().map(|h| h.id.clone()).collect();
        let limit = request.graph_limit.unwrap_or(DEFAULT_GRAPH_LIMIT);

        let neighbor_ids = match self.graph.neighbors(&collection, &seed_ids, hops, limit).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(collection, error = %e, "graph expansion failed, returning seed results only");
                return Ok(seeds);
            }
        };

        if neighbor_ids.is_empty() {
            return Ok(seeds);
        }

        let new_ids: Vec<String> = neighbor_ids.into_iter().map(|n| n.0).filter(|id| !seed_ids.contains(id)).collect();
        let payloads = self.store.fetch_payloads(&collection, &new_ids).await?;

        let mut results = seeds;
        for id in new_ids {
            let Some(payload) = payloads.get(&id) else { continue };
            results.push(SearchHit { id, score: 0.0, payload: payload.clone() });
        }
        Ok(results)
    }
}

fn validate(request: &SearchRequest) -> Result<()> {
    if request.query.trim().is_empty() {
        return Err(SearchError::Validation("query must not be empty".into()));
    }
    if !(1..=50).contains(&request.top_k) {
        return Err(SearchError::Validation(format!("top_k must be in 1..=50, got {}", request.top_k)));
    }
    if !(0.0..=1.0).contains(&request.threshold) {
        return Err(SearchError::Validation(format!("threshold must be in 0.0..=1.0, got {}", request.threshold)));
    }
    if let Some(hops) = request.max_graph_hops {
        if hops < 1 {
            return Err(SearchError::Validation("max_graph_hops must be >= 1".into()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> SearchRequest<'static> {
        SearchRequest { codebase_path: "/repo", query: "parse config", top_k: 10, threshold: 0.0, max_graph_hops: None, graph_limit: None }
    }

    #[test]
    fn empty_query_is_rejected() {
        let mut request = base_request();
        request.query = "   ";
        assert!(matches!(validate(&request), Err(SearchError::Validation(_))));
    }

    #[test]
    fn top_k_out_of_range_is_rejected() {
        let mut request = base_request();
        request.top_k = 0;
        assert!(matches!(validate(&request), Err(SearchError::Validation(_))));

        request.top_k = 51;
        assert!(matches!(validate(&request), Err(SearchError::Validation(_))));
    }

    #[test]
    fn threshold_out_of_range_is_rejected() {
        let mut request = base_request();
        request.threshold = 1.5;
        assert!(matches!(validate(&request), Err(SearchError::Validation(_))));
    }

    #[test]
    fn zero_hops_is_rejected() {
        let mut request = base_request();
        request.max_graph_hops = Some(0);
        assert!(matches!(validate(&request), Err(SearchError::Validation(_))));
    }

    #[test]
    fn valid_request_passes() {
        assert!(validate(&base_request()).is_ok());
    }
}
