use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use walkdir::DirEntry;

use crate::document::{self, pdf, ProcessingStatus, Rejection, StoredFile, UploadedFile};
use crate::Config;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    InvalidName(#[from] Rejection),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An upload part being streamed to a hidden `.part` file inside the upload folder.
/// Dropping it without [`UploadStore::commit`] removes the file.
pub struct StagedUpload {
    temp: NamedTempFile,
    writer: tokio::fs::File,
    size: u64,
    head: Vec<u8>,
}

impl StagedUpload {
    pub async fn write(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        let missing = pdf::MAGIC.len().saturating_sub(self.head.len());
        self.head.extend_from_slice(&chunk[..missing.min(chunk.len())]);
        self.writer.write_all(chunk).await?;
        self.size += chunk.len() as u64;
        Ok(())
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// The first bytes written, enough to check the PDF magic.
    pub fn head(&self) -> &[u8] {
        &self.head
    }
}

/// Uploaded PDFs on disk plus the data folders the processing pipeline works in.
pub struct UploadStore {
    upload_dir: PathBuf,
    data_dir: PathBuf,
    static_dir: PathBuf,
}

impl UploadStore {
    pub fn new(upload_dir: impl Into<PathBuf>, data_dir: impl Into<PathBuf>, static_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            data_dir: data_dir.into(),
            static_dir: static_dir.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.upload_folder, &config.data_folder, &config.static_folder)
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn static_dir(&self) -> &Path {
        &self.static_dir
    }

    pub fn extracted_dir(&self) -> PathBuf {
        self.data_dir.join("extracted")
    }

    pub fn summaries_dir(&self) -> PathBuf {
        self.data_dir.join("summaries")
    }

    pub fn vector_db_dir(&self) -> PathBuf {
        self.data_dir.join("vector_db")
    }

    fn folders(&self) -> Vec<PathBuf> {
        vec![
            self.upload_dir.clone(),
            self.data_dir.clone(),
            self.extracted_dir(),
            self.summaries_dir(),
            self.vector_db_dir(),
            self.static_dir.clone(),
        ]
    }

    /// Creates every folder the server expects. Safe to call repeatedly.
    pub async fn prepare(&self) -> anyhow::Result<()> {
        for folder in self.folders() {
            tokio::fs::create_dir_all(&folder)
                .await
                .with_context(|| format!("Cannot create folder {}", folder.display()))?;
        }
        log::info!("Required folders ready under {} and {}", self.upload_dir.display(), self.data_dir.display());
        Ok(())
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, StoreError> {
        let name = document::check_stored_name(name)?;
        Ok(self.upload_dir.join(name))
    }

    fn curriculum_path(&self, name: &str) -> PathBuf {
        self.summaries_dir().join(pdf::curriculum_name(name))
    }

    fn status_of(&self, name: &str) -> ProcessingStatus {
        if self.curriculum_path(name).exists() {
            ProcessingStatus::Completed
        } else {
            ProcessingStatus::Uploaded
        }
    }

    /// Opens a temporary file for one incoming part. Nothing is visible in `list` until it is committed.
    pub fn stage(&self) -> Result<StagedUpload, StoreError> {
        let temp = tempfile::Builder::new()
            .prefix(".upload-")
            .suffix(".part")
            .tempfile_in(&self.upload_dir)?;
        let writer = tokio::fs::File::from_std(temp.reopen()?);
        Ok(StagedUpload { temp, writer, size: 0, head: Vec::new() })
    }

    /// Moves a staged part to its final name, replacing any previous file of the same name.
    pub async fn commit(&self, name: &str, staged: StagedUpload) -> Result<UploadedFile, StoreError> {
        let path = self.resolve(name)?;
        let StagedUpload { temp, mut writer, size, .. } = staged;
        writer.flush().await?;
        drop(writer);
        temp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        log::info!("Saved {} ({} bytes)", path.display(), size);
        Ok(UploadedFile {
            filename: name.to_string(),
            size_mb: document::size_mb(size),
            path: path.display().to_string(),
            status: ProcessingStatus::UploadOnly,
            ai_processed: false,
        })
    }

    /// PDFs directly inside the upload folder, newest first.
    pub fn list(&self) -> anyhow::Result<Vec<StoredFile>> {
        if !self.upload_dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in get_entries(&self.upload_dir) {
            let Some(name) = entry.file_name().to_str() else { continue };
            if !entry.file_type().is_file() || !pdf::has_pdf_extension(name) {
                continue;
            }
            let metadata = entry.metadata()
                .with_context(|| format!("Cannot stat {}", entry.path().display()))?;
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            entries.push((modified, StoredFile {
                filename: name.to_string(),
                size_mb: document::size_mb(metadata.len()),
                path: entry.path().display().to_string(),
                upload_date: DateTime::<Utc>::from(modified),
                status: self.status_of(name),
            }));
        }

        entries.sort_by(|(a_time, a), (b_time, b)| {
            b_time.cmp(a_time).then_with(|| a.filename.cmp(&b.filename))
        });
        Ok(entries.into_iter().map(|(_, file)| file).collect())
    }

    pub async fn read(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.resolve(name)?;
        tokio::fs::read(&path).await.map_err(|e| not_found_or(e, name))
    }

    /// Removes the upload together with anything derived from it.
    pub async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let path = self.resolve(name)?;
        tokio::fs::remove_file(&path).await.map_err(|e| not_found_or(e, name))?;

        let curriculum = self.curriculum_path(name);
        match tokio::fs::remove_file(&curriculum).await {
            Ok(()) => log::info!("Removed {}", curriculum.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => log::warn!("Cannot remove {}: {}", curriculum.display(), e),
        }

        log::info!("Deleted {}", path.display());
        Ok(())
    }
}

fn not_found_or(err: std::io::Error, name: &str) -> StoreError {
    if err.kind() == ErrorKind::NotFound {
        StoreError::NotFound(name.to_string())
    } else {
        StoreError::Io(err)
    }
}

fn get_entries(path: &Path) -> impl Iterator<Item = DirEntry> {
    walkdir::WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PDF: &[u8] = b"%PDF-1.4\n%%EOF";

    fn store_in(dir: &TempDir) -> UploadStore {
        UploadStore::from_config(&crate::test_config(dir.path()))
    }

    async fn save(store: &UploadStore, name: &str, content: &[u8]) -> Result<UploadedFile, StoreError> {
        let mut staged = store.stage()?;
        staged.write(content).await?;
        store.commit(name, staged).await
    }

    fn touch(path: &Path, secs: u64) -> anyhow::Result<()> {
        let when = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(secs);
        std::fs::File::options().write(true).open(path)?.set_modified(when)?;
        Ok(())
    }

    #[tokio::test]
    async fn test_prepare_creates_folders() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let store = store_in(&dir);
        store.prepare().await?;
        store.prepare().await?;
        for folder in ["uploads", "data/extracted", "data/summaries", "data/vector_db", "static"] {
            assert!(dir.path().join(folder).is_dir(), "{} missing", folder);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_save_list_read() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let store = store_in(&dir);
        store.prepare().await?;

        let saved = save(&store, "lecture.pdf", PDF).await?;
        assert_eq!(saved.filename, "lecture.pdf");
        assert_eq!(saved.status, ProcessingStatus::UploadOnly);
        assert!(!saved.ai_processed);

        std::fs::write(store.upload_dir().join("notes.txt"), "ignored")?;
        std::fs::create_dir(store.upload_dir().join("nested.pdf"))?;

        let files = store.list()?;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "lecture.pdf");
        assert_eq!(store.read("lecture.pdf").await?, PDF);
        Ok(())
    }

    #[tokio::test]
    async fn test_status_completed_with_curriculum() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let store = store_in(&dir);
        store.prepare().await?;
        save(&store, "a.pdf", PDF).await?;
        save(&store, "b.pdf", PDF).await?;
        std::fs::write(store.summaries_dir().join("a_curriculum.json"), "{}")?;

        let files = store.list()?;
        let status = |name: &str| files.iter().find(|f| f.filename == name).map(|f| f.status);
        assert_eq!(status("a.pdf"), Some(ProcessingStatus::Completed));
        assert_eq!(status("b.pdf"), Some(ProcessingStatus::Uploaded));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_removes_derived_files() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let store = store_in(&dir);
        store.prepare().await?;
        save(&store, "a.pdf", PDF).await?;
        let curriculum = store.summaries_dir().join("a_curriculum.json");
        std::fs::write(&curriculum, "{}")?;

        store.delete("a.pdf").await?;
        assert!(store.list()?.is_empty());
        assert!(!curriculum.exists());

        assert!(matches!(store.delete("a.pdf").await, Err(StoreError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let store = store_in(&dir);
        store.prepare().await?;
        std::fs::write(dir.path().join("secret.pdf"), PDF)?;

        assert!(matches!(store.read("../secret.pdf").await, Err(StoreError::InvalidName(_))));
        assert!(matches!(store.delete("../secret.pdf").await, Err(StoreError::InvalidName(_))));
        assert!(matches!(save(&store, "..", PDF).await, Err(StoreError::InvalidName(_))));
        assert!(dir.path().join("secret.pdf").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_newest_first() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let store = store_in(&dir);
        store.prepare().await?;
        save(&store, "old.pdf", PDF).await?;
        save(&store, "new.pdf", PDF).await?;
        save(&store, "also-new.pdf", PDF).await?;
        touch(&store.upload_dir().join("old.pdf"), 1_700_000_000)?;
        touch(&store.upload_dir().join("new.pdf"), 1_800_000_000)?;
        touch(&store.upload_dir().join("also-new.pdf"), 1_800_000_000)?;

        let names = store.list()?.into_iter().map(|f| f.filename).collect::<Vec<_>>();
        assert_eq!(names, vec!["also-new.pdf", "new.pdf", "old.pdf"]);
        assert_eq!(store.list()?[2].upload_date.timestamp(), 1_700_000_000);
        Ok(())
    }

    #[tokio::test]
    async fn test_dropped_stage_leaves_nothing() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let store = store_in(&dir);
        store.prepare().await?;

        let mut staged = store.stage()?;
        staged.write(b"%PD").await?;
        staged.write(b"F-1.4 body").await?;
        assert_eq!(staged.size(), 13);
        assert_eq!(staged.head(), b"%PDF-");
        assert_eq!(std::fs::read_dir(store.upload_dir())?.count(), 1);
        assert!(store.list()?.is_empty());

        drop(staged);
        assert_eq!(std::fs::read_dir(store.upload_dir())?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_list_missing_folder() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        assert!(store_in(&dir).list()?.is_empty());
        Ok(())
    }
}
