#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("retrieval failed: {0}")]
    Retrieval(#[from] folio_store::VectorStoreError),

    #[error("LLM error: {0}")]
    Llm(#[from] folio_llm::LlmError),

    #[error("no evidence found for query: {query}")]
    NoEvidence { query: String },

    #[error("synthesis response had no parseable findings")]
    SynthesisParse { raw: String },

    #[error("external call timed out")]
    Timeout,

    #[error("operation cancelled")]
    Cancelled,
}
