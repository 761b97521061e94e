#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("extraction failed for {filename}: {reason}")]
    Extraction { filename: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file too large: {0} bytes")]
    FileTooLarge(u64),

    #[cfg(feature = "pdf")]
    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("embedding failed: {0}")]
    Embedding(#[from] folio_llm::LlmError),

    #[error("external call timed out")]
    Timeout,

    #[error("storage error: {0}")]
    Storage(#[from] folio_store::VectorStoreError),
}
