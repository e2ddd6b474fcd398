//! Upload/list/delete controller driven by the command line.
//!
//! Validates picked files before anything goes over the wire, uploads them one
//! request at a time, and keeps the displayed document list in step with the
//! server after every change.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::client::{DocumentApi, UploadFile};
use crate::document::{self, FileList, ProcessingStatus, Rejection, StoredFile};

pub mod confirm;
pub mod screen;

pub use confirm::{AssumeYes, Confirm, StdinConfirm};
pub use screen::{ConsoleScreen, Notice, Screen};

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentCard {
    pub filename: String,
    pub size_mb: f64,
    pub upload_date: DateTime<Utc>,
    pub status: ProcessingStatus,
}

impl From<&StoredFile> for DocumentCard {
    fn from(file: &StoredFile) -> Self {
        Self {
            filename: file.filename.clone(),
            size_mb: file.size_mb,
            upload_date: file.upload_date,
            status: file.status,
        }
    }
}

impl Display for DocumentCard {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let status = match self.status {
            ProcessingStatus::Uploaded => "uploaded",
            ProcessingStatus::UploadOnly => "upload only",
            ProcessingStatus::Completed => "completed",
        };
        write!(
            f,
            "{}  {:.2} MB  {}  [{}]",
            self.filename,
            self.size_mb,
            self.upload_date.format("%Y-%m-%d %H:%M"),
            status,
        )
    }
}

/// What the user currently sees: the cards and the file count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListView {
    pub cards: Vec<DocumentCard>,
    pub total_files: usize,
}

impl From<FileList> for ListView {
    fn from(list: FileList) -> Self {
        Self {
            cards: list.files.iter().map(DocumentCard::from).collect(),
            total_files: list.total_files,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerStatus {
    Healthy,
    Degraded(String),
    Unreachable(String),
}

impl Display for ServerStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ServerStatus::Healthy => write!(f, "healthy"),
            ServerStatus::Degraded(status) => write!(f, "degraded ({})", status),
            ServerStatus::Unreachable(reason) => write!(f, "unreachable ({})", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Uploaded { filename: String, size_mb: f64 },
    Failed { filename: String, error: String },
}

#[derive(Debug, Default)]
pub struct UploadReport {
    /// Set when the batch was refused because another one was running.
    pub busy: bool,
    pub excluded: Vec<Rejection>,
    pub outcomes: Vec<FileOutcome>,
}

impl UploadReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o, FileOutcome::Uploaded { .. })).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn is_clean(&self) -> bool {
        !self.busy && self.excluded.is_empty() && self.failed() == 0 && self.succeeded() > 0
    }
}

/// Holds the upload-in-progress flag; clears it when dropped.
struct UploadGuard<'a>(&'a AtomicBool);

impl<'a> UploadGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| UploadGuard(flag))
    }
}

impl Drop for UploadGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct DocumentController<'a> {
    api: &'a dyn DocumentApi,
    screen: &'a dyn Screen,
    max_file_size_mb: u64,
    uploading: AtomicBool,
}

impl<'a> DocumentController<'a> {
    pub fn new(api: &'a dyn DocumentApi, screen: &'a dyn Screen, max_file_size_mb: u64) -> Self {
        Self {
            api,
            screen,
            max_file_size_mb,
            uploading: AtomicBool::new(false),
        }
    }

    pub async fn check_health(&self) -> ServerStatus {
        let status = match self.api.health().await {
            Ok(health) if health.is_healthy() => ServerStatus::Healthy,
            Ok(health) => ServerStatus::Degraded(health.status),
            Err(e) => ServerStatus::Unreachable(format!("{:#}", e)),
        };
        self.screen.show_status(&status);
        status
    }

    /// Fetches `/files` and redraws the list from it.
    pub async fn refresh(&self) -> anyhow::Result<ListView> {
        match self.api.list_files().await {
            Ok(list) => {
                let view = ListView::from(list);
                self.screen.show_documents(&view);
                Ok(view)
            }
            Err(e) => {
                self.screen.notify(Notice::error(format!("Failed to load documents: {:#}", e)));
                Err(e)
            }
        }
    }

    async fn select(&self, paths: &[PathBuf]) -> (Vec<UploadFile>, Vec<Rejection>) {
        let mut selected = Vec::new();
        let mut excluded = Vec::new();

        for path in paths {
            let file = match UploadFile::from_path(path).await {
                Ok(file) => file,
                Err(e) => {
                    excluded.push(Rejection::Unreadable {
                        name: path.display().to_string(),
                        reason: format!("{:#}", e),
                    });
                    continue;
                }
            };
            match document::validate_selection(&file.name, &file.mime, file.size, self.max_file_size_mb) {
                Ok(()) => selected.push(file),
                Err(rejection) => excluded.push(rejection),
            }
        }
        (selected, excluded)
    }

    /// Uploads the valid subset of `paths`, one file per request, in order.
    /// A failed file does not stop the ones after it.
    pub async fn upload(&self, paths: &[PathBuf]) -> UploadReport {
        let Some(_guard) = UploadGuard::acquire(&self.uploading) else {
            self.screen.notify(Notice::warning("An upload is already in progress"));
            return UploadReport { busy: true, ..Default::default() };
        };

        let (selected, excluded) = self.select(paths).await;
        let mut report = UploadReport { excluded, ..Default::default() };

        if selected.is_empty() {
            let message = match report.excluded.as_slice() {
                [] => "No files selected".to_string(),
                [only] => only.to_string(),
                all => format!(
                    "None of the {} selected files can be uploaded: only PDF files up to {}MB are accepted",
                    all.len(),
                    self.max_file_size_mb,
                ),
            };
            self.screen.notify(Notice::error(message));
            return report;
        }

        if !report.excluded.is_empty() {
            for rejection in &report.excluded {
                log::warn!("Excluded from upload: {}", rejection);
            }
            self.screen.notify(Notice::warning(format!(
                "{} file(s) excluded: only PDF files up to {}MB are accepted",
                report.excluded.len(),
                self.max_file_size_mb,
            )));
        }

        let total = selected.len();
        for (i, file) in selected.iter().enumerate() {
            log::info!("Uploading {}/{}: {}", i + 1, total, file.name);
            let outcome = match self.api.upload(file).await {
                Ok(response) => FileOutcome::Uploaded {
                    filename: file.name.clone(),
                    size_mb: response.files.first()
                        .map(|f| f.size_mb)
                        .unwrap_or_else(|| document::size_mb(file.size)),
                },
                Err(e) => {
                    let error = format!("{:#}", e);
                    self.screen.notify(Notice::error(format!("{}: {}", file.name, error)));
                    FileOutcome::Failed { filename: file.name.clone(), error }
                }
            };
            report.outcomes.push(outcome);
        }

        let (succeeded, failed) = (report.succeeded(), report.failed());
        let summary = match (succeeded, failed) {
            (_, 0) => Notice::success(format!("{} file(s) uploaded", succeeded)),
            (0, _) => Notice::error(format!("All {} upload(s) failed", failed)),
            _ => Notice::warning(format!("{} file(s) uploaded, {} failed", succeeded, failed)),
        };
        self.screen.notify(summary);

        if succeeded > 0 {
            if let Err(e) = self.refresh().await {
                log::warn!("Document list not refreshed after upload: {:#}", e);
            }
        }
        report
    }

    /// Returns `Ok(false)` when the user declines; nothing is sent in that case.
    pub async fn delete(&self, filename: &str, confirm: &dyn Confirm) -> anyhow::Result<bool> {
        if !confirm.confirm(&format!("Delete {}?", filename))? {
            self.screen.notify(Notice::info("Deletion cancelled"));
            return Ok(false);
        }

        if let Err(e) = self.api.delete(filename).await {
            self.screen.notify(Notice::error(format!("Failed to delete {}: {:#}", filename, e)));
            return Err(e);
        }
        self.screen.notify(Notice::success(format!("{} deleted", filename)));

        if let Err(e) = self.refresh().await {
            log::warn!("Document list not refreshed after deleting {}: {:#}", filename, e);
        }
        Ok(true)
    }

    pub async fn download(&self, filename: &str, dest: &Path) -> anyhow::Result<()> {
        let content = match self.api.download(filename).await {
            Ok(content) => content,
            Err(e) => {
                self.screen.notify(Notice::error(format!("Failed to download {}: {:#}", filename, e)));
                return Err(e);
            }
        };
        tokio::fs::write(dest, &content)
            .await
            .with_context(|| format!("Cannot write {}", dest.display()))?;
        self.screen.notify(Notice::success(format!("Saved {} to {}", filename, dest.display())));
        Ok(())
    }
}
