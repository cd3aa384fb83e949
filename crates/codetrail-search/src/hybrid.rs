//! Reciprocal-rank fusion over the up-to-four named-vector queries a hybrid
//! search issues: `code_dense`, `code_sparse`, and, when documentation
//! embedding is enabled, `doc_dense`, `doc_sparse`.

use std::collections::HashMap;

use crate::client::{QdrantStore, VectorMatch};
use crate::error::Result;
use crate::schema::{vectors as vname, SearchHit};

/// RRF's smoothing constant. Conventional value; larger `k` flattens the
/// influence of rank differences near the top of each retriever's list.
pub const RRF_K: f64 = 60.0;

/// Runs one query per active named vector, each capped at `limit`, and
/// fuses them via reciprocal-rank fusion. Ties are broken deterministically
/// by point id so fusion is reproducible across runs.
pub struct HybridSearcher<'a> {
    store: &'a QdrantStore,
}

impl<'a> HybridSearcher<'a> {
    pub fn new(store: &'a QdrantStore) -> Self {
        Self { store }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn hybrid_query(
        &self,
        collection: &str,
        query_text: &str,
        code_dense_query: Vec<f32>,
        doc_dense_query: Option<Vec<f32>>,
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<SearchHit>> {
        let mut retrievers: Vec<Vec<VectorMatch>> = Vec::new();

        retrievers.push(self.store.query_vector(collection, vname::CODE_DENSE, code_dense_query, limit as u64).await?);
        retrievers.push(self.store.query_sparse(collection, vname::CODE_SPARSE, query_text, limit as u64).await?);
        if let Some(doc_query) = doc_dense_query {
            retrievers.push(self.store.query_vector(collection, vname::DOC_DENSE, doc_query, limit as u64).await?);
            retrievers.push(self.store.query_sparse(collection, vname::DOC_SPARSE, query_text, limit as u64).await?);
        }

        let fused = reciprocal_rank_fusion(&retrievers, limit, threshold);
        let ids: Vec<String> = fused.iter().map(|(id, _)| id.clone()).collect();
        let payloads = self.store.fetch_payloads(collection, &ids).await?;

        Ok(fused
            .into_iter()
            .filter_map(|(id, score)| {
                let payload = payloads.get(&id)?.clone();
                Some(SearchHit { id, score, payload })
            })
            .collect())
    }
}

/// Fuses ranked match lists from independent retrievers: `fused(d) = Σ
/// 1/(k + rank_i(d))` over retrievers where `d` appears, ranks 1-indexed.
/// Returns at most `limit` results whose fused score is `>= threshold`,
/// ordered by descending score then ascending id for a stable tie-break.
pub fn reciprocal_rank_fusion(retrievers: &[Vec<VectorMatch>], limit: usize, threshold: f32) -> Vec<(String, f32)> {
    let mut scores: HashMap<String, f64> = HashMap::new();
    for matches in retrievers {
        for (rank, m) in matches.iter().enumerate() {
            *scores.entry(m.id.clone()).or_insert(0.0) += 1.0 / (RRF_K + (rank + 1) as f64);
        }
    }

    let mut ranked: Vec<(String, f32)> = scores.into_iter().map(|(id, score)| (id, score as f32)).collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(&b.0)));
    ranked.retain(|(_, score)| *score >= threshold);
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(ids: &[&str]) -> Vec<VectorMatch> {
        ids.iter().map(|id| VectorMatch { id: id.to_string(), score: 1.0 }).collect()
    }

    #[test]
    fn document_ranked_higher_by_both_retrievers_wins() {
        let dense = matches(&["a", "b"]);
        let sparse = matches(&["b", "a"]);
        let fused = reciprocal_rank_fusion(&[dense, sparse], 10, 0.0);
        assert_eq!(fused[0].0, "a");
        assert_eq!(fused[1].0, "b");
        assert!((fused[0].1 - fused[1].1).abs() < 1e-6);
    }

    #[test]
    fn equal_scores_break_ties_by_id() {
        let one = matches(&["z"]);
        let two = matches(&["y"]);
        let fused = reciprocal_rank_fusion(&[one, two], 10, 0.0);
        assert_eq!(fused[0].0, "y");
        assert_eq!(fused[1].0, "z");
    }

    #[test]
    fn threshold_filters_low_scoring_documents() {
        let one = matches(&["a"]);
        let fused = reciprocal_rank_fusion(&[one], 10, 0.9);
        assert!(fused.is_empty());
    }

    #[test]
    fn limit_caps_result_count() {
        let one = matches(&["a", "b", "c"]);
        let fused = reciprocal_rank_fusion(&[one], 2, 0.0);
        assert_eq!(fused.len(), 2);
    }
}
