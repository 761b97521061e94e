use std::path::Path;
use std::pin::Pin;

use super::{DEFAULT_MAX_FILE_SIZE, DocumentLoader, RawDocument};
use crate::error::IngestError;

pub struct PdfLoader {
    pub max_file_size: u64,
}

impl Default for PdfLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl DocumentLoader for PdfLoader {
    fn load(
        &self,
        path: &Path,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<RawDocument, IngestError>> + Send + '_>>
    {
        let path = path.to_path_buf();
        let max_size = self.max_file_size;
        Box::pin(async move {
            let meta = tokio::fs::metadata(&path).await?;
            if meta.len() > max_size {
                return Err(IngestError::FileTooLarge(meta.len()));
            }

            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_owned();

            let path_buf = path.clone();
            let text = tokio::task::spawn_blocking(move || {
                pdf_extract::extract_text(&path_buf).map_err(|e| IngestError::Pdf(e.to_string()))
            })
            .await
            .map_err(|e| IngestError::Io(std::io::Error::other(e)))??;

            Ok(RawDocument { text, filename })
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }
}
