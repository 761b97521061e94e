use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for an ingested paper, derived deterministically from
/// its source identifier so re-ingesting the same file replaces its chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    #[must_use]
    pub fn from_source(source: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, source.as_bytes()))
    }

    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Bibliographic fields recovered from a paper's text. Every field except
/// `source` is best-effort; absence is normal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperMetadata {
    pub title: String,
    pub authors: Vec<String>,
    pub abstract_text: Option<String>,
    pub year: Option<u16>,
    pub source: String,
}

impl PaperMetadata {
    #[must_use]
    pub fn document_id(&self) -> DocumentId {
        DocumentId::from_source(&self.source)
    }
}

/// One chunk of document text produced by the chunker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpan {
    /// 0-based position within the document.
    pub index: usize,
    pub text: String,
    pub word_count: usize,
    /// Words shared with the previous chunk; 0 for the first chunk.
    pub overlap_start: usize,
}

/// A chunk ready for embedding and upsert, with the parent document's
/// metadata denormalized onto it so retrieval never needs a second lookup.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub document_id: DocumentId,
    pub chunk_index: usize,
    pub text: String,
    pub word_count: usize,
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<u16>,
    pub source: String,
}

impl ChunkRecord {
    /// Deterministic point id: the same document chunk always maps to the
    /// same point, making re-ingestion a replacement upsert.
    #[must_use]
    pub fn point_id(&self) -> String {
        let name = format!("{}:{}", self.document_id, self.chunk_index);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }

    #[must_use]
    pub fn payload(&self) -> HashMap<String, serde_json::Value> {
        let mut payload = HashMap::from([
            (
                "document_id".to_owned(),
                serde_json::json!(self.document_id.to_string()),
            ),
            ("chunk_index".to_owned(), serde_json::json!(self.chunk_index)),
            ("text".to_owned(), serde_json::json!(self.text)),
            ("title".to_owned(), serde_json::json!(self.title)),
            ("authors".to_owned(), serde_json::json!(self.authors)),
            ("source".to_owned(), serde_json::json!(self.source)),
        ]);
        if let Some(year) = self.year {
            payload.insert("year".to_owned(), serde_json::json!(year));
        }
        payload
    }
}
