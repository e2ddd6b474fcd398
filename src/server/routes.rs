use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;

use super::error::ApiError;
use super::AppState;
use crate::document::{
    self, pdf, DeleteResponse, FileList, HealthStatus, Rejection, UploadResponse, UPLOAD_FIELD,
};
use crate::storage::StoreError;

pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        message: "PDF Learner server is running".to_string(),
        upload_folder: state.store.upload_dir().display().to_string(),
        data_folder: state.store.data_dir().display().to_string(),
    })
}

/// Serves `index.html` from the static folder, or a status page when there is none.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let page = state.store.static_dir().join("index.html");
    match tokio::fs::read_to_string(&page).await {
        Ok(html) => Html(html),
        Err(e) => {
            log::debug!("No landing page at {}: {}", page.display(), e);
            Html(format!(
                "<!DOCTYPE html>\n<html>\n<head><title>PDF Learner</title></head>\n<body>\n\
                 <h1>PDF Learner</h1>\n<p>{} was not found.</p>\n<p>Server is running normally.</p>\n\
                 <p>Upload folder: {}</p>\n<p>Data folder: {}</p>\n</body>\n</html>\n",
                page.display(),
                state.store.upload_dir().display(),
                state.store.data_dir().display(),
            ))
        }
    }
}

/// Every `files` part is streamed to a staging file and validated before any is committed,
/// so a rejected request leaves the upload folder untouched.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let limit_mb = state.max_file_size_mb;
    let limit = document::mb_to_bytes(limit_mb);
    let mut accepted = Vec::new();

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let raw_name = field.file_name().map(str::to_owned).unwrap_or_default();

        let mut staged = state.store.stage()?;
        while let Some(chunk) = field.chunk().await? {
            staged.write(&chunk).await.map_err(StoreError::from)?;
            if staged.size() > limit {
                return Err(Rejection::TooLarge {
                    name: raw_name,
                    size_mb: document::size_mb(staged.size()),
                    limit_mb,
                }
                .into());
            }
        }

        let name = document::validate_upload(&raw_name, staged.size(), staged.head(), limit_mb)?;
        accepted.push((name, staged));
    }

    if accepted.is_empty() {
        return Err(ApiError::BadRequest("No files were provided".to_string()));
    }

    let mut files = Vec::with_capacity(accepted.len());
    for (name, staged) in accepted {
        files.push(state.store.commit(&name, staged).await?);
    }

    Ok(Json(UploadResponse {
        message: format!("{} PDF file(s) uploaded successfully", files.len()),
        files,
    }))
}

pub async fn list_files(State(state): State<AppState>) -> Result<Json<FileList>, ApiError> {
    let files = state.store.list()?;
    Ok(Json(FileList::new(files)))
}

pub async fn delete_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state.store.delete(&filename).await?;
    Ok(Json(DeleteResponse {
        message: format!("{} deleted", filename),
        filename,
    }))
}

pub async fn download_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let content = state.store.read(&filename).await?;
    let headers = [
        (header::CONTENT_TYPE, pdf::MIME.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename*=UTF-8''{}", urlencoding::encode(&filename)),
        ),
    ];
    Ok((headers, content).into_response())
}
