pub mod text;

#[cfg(feature = "pdf")]
pub mod pdf;

pub use text::TextLoader;

#[cfg(feature = "pdf")]
pub use pdf::PdfLoader;

use crate::error::IngestError;

/// Default maximum file size: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Raw document text plus the filename it came from, before any cleaning
/// or extraction.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub text: String,
    pub filename: String,
}

pub trait DocumentLoader: Send + Sync {
    fn load(
        &self,
        path: &std::path::Path,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<RawDocument, IngestError>> + Send + '_>,
    >;

    fn supported_extensions(&self) -> &[&str];
}
