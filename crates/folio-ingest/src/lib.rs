//! Document ingestion for folio: chunking, metadata extraction, loaders,
//! and the embed-and-store pipeline.

pub mod chunker;
pub mod error;
pub mod loader;
pub mod metadata;
pub mod pipeline;
mod retry;
pub mod types;

pub use chunker::{ChunkerConfig, Chunks, chunk, clean_text};
pub use error::IngestError;
pub use loader::{DEFAULT_MAX_FILE_SIZE, DocumentLoader, RawDocument, TextLoader};
pub use pipeline::{
    BatchReport, FailedFile, FailedRecord, IngestReport, IngestionPipeline, assemble,
};
pub use retry::RetryPolicy;
pub use types::{ChunkRecord, ChunkSpan, DocumentId, PaperMetadata};

#[cfg(feature = "pdf")]
pub use loader::PdfLoader;
