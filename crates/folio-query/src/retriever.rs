//! Retrieval contract: embed the query, search the store, then normalize
//! the hits into a deduplicated, floor-filtered, deterministically ordered
//! evidence list.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use folio_llm::LlmProvider;
use folio_store::{VectorFilter, VectorStore};

use crate::error::QueryError;
use crate::evidence::Evidence;
use crate::retry::{RetryPolicy, with_retry};

pub const MAX_TOP_K: usize = 100;

#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Hits scoring below this are dropped before ranking.
    pub min_score: f32,
    /// Adjacent chunks of the same document within this score distance are
    /// treated as near-duplicates.
    pub near_duplicate_epsilon: f32,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            min_score: 0.25,
            near_duplicate_epsilon: 0.01,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

pub struct Retriever<P> {
    provider: P,
    store: Arc<dyn VectorStore>,
    collection: String,
    config: RetrieverConfig,
}

impl<P: LlmProvider> Retriever<P> {
    pub fn new(provider: P, store: Arc<dyn VectorStore>, collection: impl Into<String>) -> Self {
        Self {
            provider,
            store,
            collection: collection.into(),
            config: RetrieverConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: RetrieverConfig) -> Self {
        self.config = config;
        self
    }

    pub(crate) fn provider(&self) -> &P {
        &self.provider
    }

    pub(crate) fn retry_policy(&self) -> &RetryPolicy {
        &self.config.retry
    }

    /// Retrieve up to `top_k` evidence chunks for a query.
    ///
    /// Results are sorted by score descending, ties broken by chunk index
    /// then document id. Exact (document, chunk) duplicates are collapsed;
    /// adjacent same-document chunks within the near-duplicate epsilon keep
    /// only the higher-scoring one. An empty result is not an error.
    ///
    /// # Errors
    ///
    /// `Config` for `top_k` outside 1..=100; `Llm`, `Retrieval`, or
    /// `Timeout` when the embed or search call fails after retries.
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<VectorFilter>,
    ) -> Result<Vec<Evidence>, QueryError> {
        if !(1..=MAX_TOP_K).contains(&top_k) {
            return Err(QueryError::Config(format!(
                "top_k must be in 1..={MAX_TOP_K}, got {top_k}"
            )));
        }

        let vector = with_retry(&self.config.retry, "embed query", || {
            let timeout = self.config.timeout;
            async move {
                tokio::time::timeout(timeout, self.provider.embed(query))
                    .await
                    .map_err(|_| QueryError::Timeout)?
                    .map_err(QueryError::from)
            }
        })
        .await?;

        // Fetch headroom so the floor, dedup, and near-duplicate passes do
        // not starve the final top_k.
        let fetch_limit = (top_k * 2) as u64;
        let points = with_retry(&self.config.retry, "vector search", || {
            let vector = vector.clone();
            let filter = filter.clone();
            async move {
                tokio::time::timeout(
                    self.config.timeout,
                    self.store
                        .search(&self.collection, vector, fetch_limit, filter),
                )
                .await
                .map_err(|_| QueryError::Timeout)?
                .map_err(QueryError::from)
            }
        })
        .await?;

        let mut evidence: Vec<Evidence> = points
            .iter()
            .filter_map(|p| {
                let parsed = Evidence::from_point(p);
                if parsed.is_none() {
                    tracing::warn!(id = %p.id, "skipping point with unparseable payload");
                }
                parsed
            })
            .filter(|e| e.score >= self.config.min_score)
            .collect();

        evidence.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.chunk_index.cmp(&b.chunk_index))
                .then_with(|| a.document_id.cmp(&b.document_id))
        });

        let mut seen: HashSet<(String, usize)> = HashSet::new();
        let mut kept: Vec<Evidence> = Vec::with_capacity(evidence.len());
        for candidate in evidence {
            if !seen.insert((candidate.document_id.clone(), candidate.chunk_index)) {
                continue;
            }
            // Sorted by score desc, so any qualifying neighbor already kept
            // is the higher-scoring side of the pair. The epsilon bound is
            // inclusive, with rounding slack so a gap of exactly epsilon
            // still counts.
            let near_duplicate = kept.iter().any(|k| {
                k.document_id == candidate.document_id
                    && k.chunk_index.abs_diff(candidate.chunk_index) == 1
                    && (k.score - candidate.score).abs()
                        <= self.config.near_duplicate_epsilon + f32::EPSILON
            });
            if near_duplicate {
                continue;
            }
            kept.push(candidate);
        }

        kept.truncate(top_k);
        tracing::debug!(query, results = kept.len(), "retrieval complete");
        Ok(kept)
    }
}
