use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;

use crate::document::{pdf, DeleteResponse, FileList, HealthStatus, UploadResponse};

pub mod http;

pub use http::ApiClient;

/// A file picked for upload, described the way a browser would before reading it.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub name: String,
    pub mime: String,
    pub size: u64,
    pub path: PathBuf,
}

impl UploadFile {
    pub async fn from_path(path: &Path) -> anyhow::Result<Self> {
        let metadata = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Cannot read {}", path.display()))?;
        if !metadata.is_file() {
            anyhow::bail!("{} is not a file", path.display());
        }
        let name = path.file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self {
            name,
            mime: pdf::mime_of(path),
            size: metadata.len(),
            path: path.to_path_buf(),
        })
    }
}

/// Calls the client makes against the document server.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    async fn health(&self) -> anyhow::Result<HealthStatus>;

    async fn list_files(&self) -> anyhow::Result<FileList>;

    /// Uploads a single file as one `POST /upload` request.
    async fn upload(&self, file: &UploadFile) -> anyhow::Result<UploadResponse>;

    async fn delete(&self, filename: &str) -> anyhow::Result<DeleteResponse>;

    async fn download(&self, filename: &str) -> anyhow::Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_upload_file_from_path() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("slides.pdf");
        std::fs::write(&path, b"%PDF-1.4")?;

        let file = UploadFile::from_path(&path).await?;
        assert_eq!(file.name, "slides.pdf");
        assert_eq!(file.mime, "application/pdf");
        assert_eq!(file.size, 8);

        assert!(UploadFile::from_path(&dir.path().join("missing.pdf")).await.is_err());
        assert!(UploadFile::from_path(dir.path()).await.is_err());
        Ok(())
    }
}
