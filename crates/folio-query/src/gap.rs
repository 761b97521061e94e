//! Gap analysis: fan a topic out into angled sub-queries, group the merged
//! evidence by document, and synthesize structured findings.

use std::collections::{HashMap, HashSet};

use folio_llm::LlmProvider;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::QueryError;
use crate::evidence::Evidence;
use crate::parse::{self, GapFinding};
use crate::prompt;
use crate::retriever::Retriever;
use crate::retry::{RetryPolicy, with_retry};

#[derive(Debug, Clone)]
pub struct GapAnalysisConfig {
    pub top_k_per_query: usize,
    /// Cap on chunks from a single document in the synthesis context, so
    /// one paper cannot crowd out the rest.
    pub max_chunks_per_document: usize,
    /// Concurrency ceiling for the sub-query fan-out.
    pub concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for GapAnalysisConfig {
    fn default() -> Self {
        Self {
            top_k_per_query: 10,
            max_chunks_per_document: 3,
            concurrency: 4,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GapReport {
    pub topic: String,
    pub findings: Vec<GapFinding>,
    /// Verbatim synthesis response the findings were parsed from.
    pub raw_analysis: String,
    /// Labeled sources in the order they were presented to the model.
    pub sources: Vec<Evidence>,
    pub documents_consulted: usize,
}

pub struct GapAnalysis<P> {
    retriever: Retriever<P>,
    config: GapAnalysisConfig,
}

impl<P: LlmProvider> GapAnalysis<P> {
    pub fn new(retriever: Retriever<P>) -> Self {
        Self {
            retriever,
            config: GapAnalysisConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: GapAnalysisConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the full analysis for a topic.
    ///
    /// # Errors
    ///
    /// `NoEvidence` when retrieval comes back empty (generation is never
    /// invoked in that case), `SynthesisParse` when the response contains
    /// no findings, `Cancelled` when the token fires between phases, and
    /// retrieval/LLM errors after local retries.
    pub async fn run(
        &self,
        topic: &str,
        cancel: &CancellationToken,
    ) -> Result<GapReport, QueryError> {
        if cancel.is_cancelled() {
            return Err(QueryError::Cancelled);
        }
        tracing::debug!(topic, phase = "retrieving", "gap analysis started");

        let sub_queries = vec![
            topic.to_owned(),
            format!("methodological limitations of {topic}"),
            format!("unexplored areas in {topic}"),
            format!("conflicting findings on {topic}"),
        ];
        let per_query: Vec<Vec<Evidence>> = stream::iter(sub_queries)
            .map(|query| {
                let retriever = &self.retriever;
                let top_k = self.config.top_k_per_query;
                async move { retriever.search(&query, top_k, None).await }
            })
            .buffered(self.config.concurrency.max(1))
            .try_collect()
            .await?;

        // Merge in sub-query submission order; each sub-query's list is
        // already score-ordered. First occurrence of a chunk wins.
        let mut seen: HashSet<(String, usize)> = HashSet::new();
        let mut merged: Vec<Evidence> = Vec::new();
        for list in per_query {
            for ev in list {
                if seen.insert((ev.document_id.clone(), ev.chunk_index)) {
                    merged.push(ev);
                }
            }
        }
        if merged.is_empty() {
            return Err(QueryError::NoEvidence {
                query: topic.to_owned(),
            });
        }

        if cancel.is_cancelled() {
            return Err(QueryError::Cancelled);
        }
        tracing::debug!(topic, phase = "grouping", chunks = merged.len(), "evidence merged");

        let mut groups: HashMap<String, Vec<Evidence>> = HashMap::new();
        for ev in merged {
            groups.entry(ev.document_id.clone()).or_default().push(ev);
        }
        let mut ordered: Vec<(String, Vec<Evidence>)> = groups.into_iter().collect();
        ordered.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(&b.0)));

        let documents_consulted = ordered.len();
        let mut sources = Vec::new();
        for (_, mut group) in ordered {
            group.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            group.truncate(self.config.max_chunks_per_document);
            sources.extend(group);
        }

        if cancel.is_cancelled() {
            return Err(QueryError::Cancelled);
        }
        tracing::debug!(topic, phase = "synthesizing", sources = sources.len());

        let context = prompt::build_context(&sources);
        let messages = prompt::gap_messages(topic, &context);
        let messages_ref = &messages;
        let raw = with_retry(&self.config.retry, "gap synthesis", || async move {
            self.retriever
                .provider()
                .chat(messages_ref)
                .await
                .map_err(QueryError::from)
        })
        .await?;

        let findings = parse::parse_findings(&raw, &sources);
        if findings.is_empty() {
            return Err(QueryError::SynthesisParse { raw });
        }

        tracing::info!(
            topic,
            findings = findings.len(),
            documents_consulted,
            "gap analysis complete"
        );
        Ok(GapReport {
            topic: topic.to_owned(),
            findings,
            raw_analysis: raw,
            sources,
            documents_consulted,
        })
    }
}
