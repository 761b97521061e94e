//! Clean -> extract -> chunk -> embed -> upsert, with per-record and
//! per-file failure isolation.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use folio_llm::LlmProvider;
use folio_store::{VectorPoint, VectorStore};

use crate::chunker::{self, ChunkerConfig};
use crate::error::IngestError;
use crate::loader::DocumentLoader;
use crate::metadata;
use crate::retry::{RetryPolicy, external_call};
use crate::types::{ChunkRecord, ChunkSpan, DocumentId, PaperMetadata};

const DEFAULT_BATCH_SIZE: usize = 32;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One record that failed to embed or store, with enough context to retry.
#[derive(Debug)]
pub struct FailedRecord {
    pub chunk_index: usize,
    pub reason: String,
}

/// Outcome of ingesting a single document. Partial failure never discards
/// the records that made it.
#[derive(Debug)]
pub struct IngestReport {
    pub document_id: DocumentId,
    pub succeeded: usize,
    pub failed: Vec<FailedRecord>,
}

#[derive(Debug)]
pub struct FailedFile {
    pub filename: String,
    pub reason: String,
}

/// Outcome of ingesting a directory: one report per document that got as
/// far as submission, plus the files that did not.
#[derive(Debug)]
pub struct BatchReport {
    pub reports: Vec<IngestReport>,
    pub failed_files: Vec<FailedFile>,
}

/// Order chunk spans into records carrying the parent document's metadata.
#[must_use]
pub fn assemble(
    metadata: &PaperMetadata,
    spans: impl IntoIterator<Item = ChunkSpan>,
) -> Vec<ChunkRecord> {
    let document_id = metadata.document_id();
    spans
        .into_iter()
        .map(|span| ChunkRecord {
            document_id,
            chunk_index: span.index,
            text: span.text,
            word_count: span.word_count,
            title: metadata.title.clone(),
            authors: metadata.authors.clone(),
            year: metadata.year,
            source: metadata.source.clone(),
        })
        .collect()
}

pub struct IngestionPipeline<P> {
    provider: P,
    store: Arc<dyn VectorStore>,
    collection: String,
    chunker: ChunkerConfig,
    batch_size: usize,
    timeout: Duration,
    retry: RetryPolicy,
}

impl<P: LlmProvider> IngestionPipeline<P> {
    pub fn new(provider: P, store: Arc<dyn VectorStore>, collection: impl Into<String>) -> Self {
        Self {
            provider,
            store,
            collection: collection.into(),
            chunker: ChunkerConfig::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_chunker(mut self, config: ChunkerConfig) -> Self {
        self.chunker = config;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Per-call timeout for embed and store operations.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Embed and upsert assembled records. Records that fail to embed are
    /// reported and skipped; upserts go out in batches, a failed batch
    /// marking only its own records as failed. Every embed and store call
    /// runs under the pipeline timeout with bounded retries; a chunk whose
    /// embed times out after retries is reported, not hung on.
    ///
    /// # Errors
    ///
    /// Returns an error only when the collection itself cannot be ensured;
    /// per-record failures land in the report instead.
    pub async fn submit(
        &self,
        document_id: DocumentId,
        records: Vec<ChunkRecord>,
    ) -> Result<IngestReport, IngestError> {
        let mut failed = Vec::new();
        let mut embedded: Vec<(usize, VectorPoint)> = Vec::with_capacity(records.len());
        let mut ensured = false;

        for record in records {
            if record.text.trim().is_empty() {
                failed.push(FailedRecord {
                    chunk_index: record.chunk_index,
                    reason: "empty chunk text".into(),
                });
                continue;
            }
            let outcome = external_call(&self.retry, self.timeout, "embed chunk", || {
                self.provider.embed(&record.text)
            })
            .await;
            match outcome {
                Ok(vector) => {
                    if !ensured {
                        let vector_size = vector.len() as u64;
                        external_call(&self.retry, self.timeout, "ensure collection", || {
                            self.store.ensure_collection(&self.collection, vector_size)
                        })
                        .await?;
                        ensured = true;
                    }
                    embedded.push((
                        record.chunk_index,
                        VectorPoint {
                            id: record.point_id(),
                            vector,
                            payload: record.payload(),
                        },
                    ));
                }
                Err(e) => {
                    tracing::warn!(
                        %document_id,
                        chunk_index = record.chunk_index,
                        error = %e,
                        "embedding failed, skipping record"
                    );
                    failed.push(FailedRecord {
                        chunk_index: record.chunk_index,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let mut succeeded = 0;
        for batch in embedded.chunks(self.batch_size) {
            let outcome = external_call(&self.retry, self.timeout, "upsert batch", || {
                let points: Vec<VectorPoint> = batch.iter().map(|(_, p)| p.clone()).collect();
                self.store.upsert(&self.collection, points)
            })
            .await;
            match outcome {
                Ok(()) => succeeded += batch.len(),
                Err(e) => {
                    tracing::warn!(%document_id, error = %e, "batch upsert failed");
                    for (chunk_index, _) in batch {
                        failed.push(FailedRecord {
                            chunk_index: *chunk_index,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        failed.sort_by_key(|f| f.chunk_index);
        tracing::info!(%document_id, succeeded, failed = failed.len(), "document submitted");
        Ok(IngestReport {
            document_id,
            succeeded,
            failed,
        })
    }

    /// Full single-document path: clean, extract metadata, chunk, assemble,
    /// replace any previous chunks for the same source, submit.
    ///
    /// # Errors
    ///
    /// Returns `Config` for an invalid chunker config, `Extraction` for
    /// unreadable text, or `Storage`/`Timeout` when the store stays
    /// unreachable after retries.
    pub async fn ingest_text(
        &self,
        raw_text: &str,
        filename: &str,
    ) -> Result<IngestReport, IngestError> {
        let cleaned = chunker::clean_text(raw_text);
        let metadata = metadata::extract(&cleaned, filename)?;
        let spans = chunker::chunk(&cleaned, &self.chunker)?;
        let records = assemble(&metadata, spans);
        let document_id = metadata.document_id();

        // Re-ingesting a source is replacement, not accumulation.
        let exists = external_call(&self.retry, self.timeout, "collection exists", || {
            self.store.collection_exists(&self.collection)
        })
        .await?;
        if exists {
            let doc = document_id.to_string();
            external_call(&self.retry, self.timeout, "delete previous chunks", || {
                self.store.delete_by_document(&self.collection, &doc)
            })
            .await?;
        }

        self.submit(document_id, records).await
    }

    /// # Errors
    ///
    /// Returns an error if the store is unreachable.
    pub async fn remove_document(&self, document_id: DocumentId) -> Result<(), IngestError> {
        let doc = document_id.to_string();
        external_call(&self.retry, self.timeout, "delete document", || {
            self.store.delete_by_document(&self.collection, &doc)
        })
        .await
    }

    /// Ingest every supported file in a directory. A file that fails to
    /// load or extract is reported and the rest of the batch continues.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    pub async fn ingest_dir(&self, dir: &Path) -> Result<BatchReport, IngestError> {
        let mut loaders: Vec<Box<dyn DocumentLoader>> =
            vec![Box::new(crate::loader::TextLoader::default())];
        #[cfg(feature = "pdf")]
        loaders.push(Box::new(crate::loader::PdfLoader::default()));

        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                paths.push(entry.path());
            }
        }
        paths.sort();

        let mut reports = Vec::new();
        let mut failed_files = Vec::new();
        for path in paths {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            let Some(loader) = loaders
                .iter()
                .find(|l| l.supported_extensions().contains(&ext))
            else {
                tracing::debug!(path = %path.display(), "skipping unsupported file");
                continue;
            };
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_owned();

            let outcome = match loader.load(&path).await {
                Ok(raw) => self.ingest_text(&raw.text, &raw.filename).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(report) => reports.push(report),
                Err(e) => {
                    tracing::warn!(filename, error = %e, "skipping file");
                    failed_files.push(FailedFile {
                        filename,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(BatchReport {
            reports,
            failed_files,
        })
    }
}
