use folio_store::ScoredVectorPoint;
use serde::Serialize;

/// Pointer from an answer or finding back to the chunk that supports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitationRef {
    pub document_id: String,
    pub chunk_index: usize,
}

/// Retrieval-time view of a stored chunk: text plus the citation fields of
/// its parent document. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Evidence {
    pub document_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<u16>,
    pub chunk_index: usize,
    pub text: String,
    pub score: f32,
}

impl Evidence {
    /// Rebuild evidence from a stored point's payload. `None` when the
    /// payload is missing a required field; callers log and skip.
    #[must_use]
    pub fn from_point(point: &ScoredVectorPoint) -> Option<Self> {
        let document_id = point.payload.get("document_id")?.as_str()?.to_owned();
        let chunk_index = usize::try_from(point.payload.get("chunk_index")?.as_u64()?).ok()?;
        let text = point.payload.get("text")?.as_str()?.to_owned();

        let title = point
            .payload
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_owned();
        let authors = point
            .payload
            .get("authors")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(ToOwned::to_owned))
                    .collect()
            })
            .unwrap_or_default();
        let year = point
            .payload
            .get("year")
            .and_then(serde_json::Value::as_u64)
            .and_then(|y| u16::try_from(y).ok());

        Some(Self {
            document_id,
            title,
            authors,
            year,
            chunk_index,
            text,
            score: point.score,
        })
    }

    #[must_use]
    pub fn citation(&self) -> CitationRef {
        CitationRef {
            document_id: self.document_id.clone(),
            chunk_index: self.chunk_index,
        }
    }
}
