use std::path::Path;
use std::pin::Pin;

use super::{DEFAULT_MAX_FILE_SIZE, DocumentLoader, RawDocument};
use crate::error::IngestError;

pub struct TextLoader {
    pub max_file_size: u64,
}

impl Default for TextLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl DocumentLoader for TextLoader {
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

            let text = tokio::fs::read_to_string(&path).await?;
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_owned();

            Ok(RawDocument { text, filename })
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        &["txt", "md", "markdown"]
    }
}
