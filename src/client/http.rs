use anyhow::Context;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;

use super::{DocumentApi, UploadFile};
use crate::document::{DeleteResponse, ErrorDetail, FileList, HealthStatus, UploadResponse, UPLOAD_FIELD};
use crate::Config;

pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid server url: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Invalid server url: {}", base_url);
        }
        Ok(Self { client: Client::new(), base_url })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(&config.server_url)
    }

    /// Joins path segments onto the base url, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn check(response: Response, action: &str) -> anyhow::Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorDetail>(&body)
            .map(|e| e.detail)
            .unwrap_or_else(|_| status.to_string());
        Err(anyhow::anyhow!("{} failed: {}", action, detail))
    }

    async fn parse<T: DeserializeOwned>(response: Response, action: &str) -> anyhow::Result<T> {
        Self::check(response, action)
            .await?
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse {} response", action))
    }
}

#[async_trait]
impl DocumentApi for ApiClient {
    async fn health(&self) -> anyhow::Result<HealthStatus> {
        let response = self.client
            .get(self.endpoint(&["health"]))
            .send()
            .await
            .with_context(|| format!("Cannot reach server at {}", self.base_url))?;
        Self::parse(response, "Health check").await
    }

    async fn list_files(&self) -> anyhow::Result<FileList> {
        let response = self.client
            .get(self.endpoint(&["files"]))
            .send()
            .await
            .with_context(|| "Failed to request document list")?;
        Self::parse(response, "Listing documents").await
    }

    async fn upload(&self, file: &UploadFile) -> anyhow::Result<UploadResponse> {
        let content = tokio::fs::read(&file.path)
            .await
            .with_context(|| format!("Cannot read {}", file.path.display()))?;
        let part = Part::bytes(content)
            .file_name(file.name.clone())
            .mime_str(&file.mime)?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self.client
            .post(self.endpoint(&["upload"]))
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("Failed to send {}", file.name))?;
        Self::parse(response, "Upload").await
    }

    async fn delete(&self, filename: &str) -> anyhow::Result<DeleteResponse> {
        let response = self.client
            .delete(self.endpoint(&["delete", filename]))
            .send()
            .await
            .with_context(|| format!("Failed to request deletion of {}", filename))?;
        Self::parse(response, "Delete").await
    }

    async fn download(&self, filename: &str) -> anyhow::Result<Vec<u8>> {
        let response = self.client
            .get(self.endpoint(&["download", filename]))
            .send()
            .await
            .with_context(|| format!("Failed to request {}", filename))?;
        let bytes = Self::check(response, "Download").await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use crate::server::{router, AppState};
    use crate::storage::UploadStore;

    const PDF: &[u8] = b"%PDF-1.5\n%%EOF";

    /// Starts a real server on an ephemeral port.
    async fn spawn_server(dir: &TempDir) -> anyhow::Result<ApiClient> {
        let store = UploadStore::from_config(&crate::test_config(dir.path()));
        store.prepare().await?;
        let app = router(AppState::new(store, crate::document::MAX_FILE_SIZE_MB));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        ApiClient::new(&format!("http://{}", addr))
    }

    async fn pick(dir: &TempDir, name: &str, content: &[u8]) -> anyhow::Result<UploadFile> {
        let path = dir.path().join(name);
        std::fs::write(&path, content)?;
        UploadFile::from_path(&path).await
    }

    #[test]
    fn test_endpoint_encoding() -> anyhow::Result<()> {
        let client = ApiClient::new("http://localhost:8000/")?;
        assert_eq!(client.endpoint(&["files"]).as_str(), "http://localhost:8000/files");
        assert_eq!(
            client.endpoint(&["delete", "my notes#1.pdf"]).as_str(),
            "http://localhost:8000/delete/my%20notes%231.pdf"
        );
        let prefixed = ApiClient::new("http://host/api")?;
        assert_eq!(prefixed.endpoint(&["health"]).as_str(), "http://host/api/health");
        assert!(ApiClient::new("not a url").is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_round_trip_against_server() -> anyhow::Result<()> {
        let server_dir = TempDir::new()?;
        let local_dir = TempDir::new()?;
        let client = spawn_server(&server_dir).await?;

        assert!(client.health().await?.is_healthy());

        let file = pick(&local_dir, "chapter 1.pdf", PDF).await?;
        let uploaded = client.upload(&file).await?;
        assert_eq!(uploaded.files.len(), 1);
        assert_eq!(uploaded.files[0].filename, "chapter 1.pdf");

        let list = client.list_files().await?;
        assert_eq!(list.total_files, 1);
        assert_eq!(list.files[0].filename, "chapter 1.pdf");

        assert_eq!(client.download("chapter 1.pdf").await?, PDF);

        client.delete("chapter 1.pdf").await?;
        assert_eq!(client.list_files().await?.total_files, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_server_detail_is_surfaced() -> anyhow::Result<()> {
        let server_dir = TempDir::new()?;
        let local_dir = TempDir::new()?;
        let client = spawn_server(&server_dir).await?;

        let file = pick(&local_dir, "fake.pdf", b"plain text").await?;
        let err = client.upload(&file).await.unwrap_err();
        assert_eq!(err.to_string(), "Upload failed: Not a valid PDF file: fake.pdf");

        let err = client.delete("missing.pdf").await.unwrap_err();
        assert_eq!(err.to_string(), "Delete failed: File not found: missing.pdf");
        Ok(())
    }
}
