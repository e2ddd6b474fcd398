pub mod pdf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_FILE_SIZE_MB: u64 = 50;
pub const UPLOAD_FIELD: &str = "files";

const BYTES_PER_MB: u64 = 1024 * 1024;
const MAX_FILENAME_LENGTH: usize = 255;
const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Uploaded,
    /// Reported by `POST /upload`: stored, and no processing was requested.
    UploadOnly,
    Completed,
}

/// One entry of `GET /files`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    pub filename: String,
    pub size_mb: f64,
    pub path: String,
    pub upload_date: DateTime<Utc>,
    pub status: ProcessingStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileList {
    pub total_files: usize,
    pub files: Vec<StoredFile>,
}

impl FileList {
    pub fn new(files: Vec<StoredFile>) -> Self {
        Self { total_files: files.len(), files }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub filename: String,
    pub size_mb: f64,
    pub path: String,
    pub status: ProcessingStatus,
    pub ai_processed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub message: String,
    pub upload_folder: String,
    pub data_folder: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("Only PDF files can be uploaded: {name}")]
    NotPdf { name: String },

    #[error("File is too large: {name} ({size_mb:.1}MB, limit {limit_mb}MB)")]
    TooLarge { name: String, size_mb: f64, limit_mb: u64 },

    #[error("Empty files cannot be uploaded: {name}")]
    Empty { name: String },

    #[error("Not a valid PDF file: {name}")]
    BadContent { name: String },

    #[error("File name is not allowed: {name:?}")]
    BadName { name: String },

    #[error("Cannot read {name}: {reason}")]
    Unreadable { name: String, reason: String },
}

pub fn mb_to_bytes(mb: u64) -> u64 {
    mb * BYTES_PER_MB
}

/// Size in megabytes rounded to two decimals.
pub fn size_mb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB as f64 * 100.0).round() / 100.0
}

/// Checks a picked file before anything is sent: the reported MIME type and the size.
pub fn validate_selection(name: &str, mime: &str, size: u64, limit_mb: u64) -> Result<(), Rejection> {
    if mime != pdf::MIME {
        return Err(Rejection::NotPdf { name: name.to_string() });
    }
    if size > mb_to_bytes(limit_mb) {
        return Err(Rejection::TooLarge {
            name: name.to_string(),
            size_mb: size_mb(size),
            limit_mb,
        });
    }
    Ok(())
}

/// Checks a received upload and returns the name it will be stored under.
/// `head` is the start of the content, at least as long as the PDF magic when the part is.
pub fn validate_upload(raw_name: &str, size: u64, head: &[u8], limit_mb: u64) -> Result<String, Rejection> {
    let name = sanitize_filename(raw_name)?;
    if !pdf::has_pdf_extension(&name) {
        return Err(Rejection::NotPdf { name });
    }
    if size == 0 {
        return Err(Rejection::Empty { name });
    }
    if size > mb_to_bytes(limit_mb) {
        return Err(Rejection::TooLarge { name, size_mb: size_mb(size), limit_mb });
    }
    if !pdf::looks_like_pdf(head) {
        return Err(Rejection::BadContent { name });
    }
    Ok(name)
}

/// Keeps only the last path component, swaps characters that are unsafe on common
/// filesystems for `_` and collapses whitespace.
pub fn sanitize_filename(raw: &str) -> Result<String, Rejection> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned = base
        .chars()
        .map(|c| if FORBIDDEN_CHARS.contains(&c) || c.is_control() { '_' } else { c })
        .collect::<String>();
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." || cleaned.len() > MAX_FILENAME_LENGTH {
        return Err(Rejection::BadName { name: raw.to_string() });
    }
    Ok(cleaned)
}

/// A name addressed by URL must already be in stored form.
pub fn check_stored_name(name: &str) -> Result<&str, Rejection> {
    match sanitize_filename(name) {
        Ok(clean) if clean == name => Ok(name),
        _ => Err(Rejection::BadName { name: name.to_string() }),
    }
}
