//! Axum route handlers for `/api/v1/files`.

use axum::extract::{multipart::MultipartError, Multipart, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::extract::{ApiJson, ApiQuery};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::storage::{cleanup_temp, paths, promote, Folder, Promotion};

const MAX_FINALIZE_PATHS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Pdf,
    Png,
    Jpeg,
    Webp,
}

impl UploadKind {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "application/pdf" => Some(UploadKind::Pdf),
            "image/png" => Some(UploadKind::Png),
            "image/jpeg" | "image/jpg" => Some(UploadKind::Jpeg),
            "image/webp" => Some(UploadKind::Webp),
            _ => None,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            UploadKind::Pdf => "application/pdf",
            UploadKind::Png => "image/png",
            UploadKind::Jpeg => "image/jpeg",
            UploadKind::Webp => "image/webp",
        }
    }

    /// Checks the leading bytes against the declared type.
    pub fn matches_signature(&self, body: &[u8]) -> bool {
        match self {
            UploadKind::Pdf => body.starts_with(b"%PDF-"),
            UploadKind::Png => body.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]),
            UploadKind::Jpeg => body.starts_with(&[0xFF, 0xD8, 0xFF]),
            UploadKind::Webp => body.len() >= 12 && &body[..4] == b"RIFF" && &body[8..12] == b"WEBP",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub path: String,
    pub url: String,
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
}

#[derive(Debug, Deserialize)]
pub struct DeleteFileRequest {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteFileResponse {
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    pub paths: Vec<String>,
    pub folder: Folder,
}

#[derive(Debug, Serialize)]
pub struct FinalizeResponse {
    pub files: Vec<Promotion>,
}

#[derive(Debug, Deserialize)]
pub struct CleanupParams {
    pub older_than_secs: Option<u64>,
    /// Use the configured temp-file TTL as the age threshold.
    #[serde(default)]
    pub expired_only: bool,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub removed: usize,
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("Uploaded file exceeds the size limit".to_string())
    } else {
        AppError::Validation(format!("Malformed multipart body: {}", err.body_text()))
    }
}

/// POST /api/v1/files/upload
///
/// Stores a single `file` field under the caller's temp prefix.
pub async fn handle_upload(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<ApiResponse<UploadResponse>, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("file field must carry a file name".to_string()))?;
        let kind = field
            .content_type()
            .and_then(UploadKind::from_content_type)
            .ok_or_else(|| {
                AppError::Validation("Only PDF, PNG, JPEG and WebP files are accepted".to_string())
            })?;

        let body = field.bytes().await.map_err(multipart_error)?;
        if body.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }
        if body.len() > state.config.max_upload_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "Uploaded file exceeds the {} byte limit",
                state.config.max_upload_bytes
            )));
        }
        if !kind.matches_signature(&body) {
            return Err(AppError::Validation(format!(
                "File content does not match declared type {}",
                kind.content_type()
            )));
        }

        let key = paths::temp_key(user.id, &file_name);
        let size = body.len();
        state.storage.put(&key, body, kind.content_type()).await?;
        info!("User {} uploaded {key} ({size} bytes)", user.id);

        return Ok(ApiResponse::created(UploadResponse {
            url: state.storage.public_url(&key),
            path: key,
            file_name: paths::sanitize_file_name(&file_name),
            content_type: kind.content_type().to_string(),
            size,
        }));
    }

    Err(AppError::Validation("Multipart body has no 'file' field".to_string()))
}

/// DELETE /api/v1/files
pub async fn handle_delete(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<DeleteFileRequest>,
) -> Result<ApiResponse<DeleteFileResponse>, AppError> {
    if !paths::is_owned_by(&req.path, user.id) {
        return Err(AppError::Forbidden(
            "Files can only be deleted by their owner".to_string(),
        ));
    }

    state.storage.delete(&req.path).await?;
    info!("User {} deleted {}", user.id, req.path);

    Ok(ApiResponse::ok(DeleteFileResponse { path: req.path }))
}

/// POST /api/v1/files/finalize
///
/// Promotes temp uploads into a permanent folder.
pub async fn handle_finalize(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<FinalizeRequest>,
) -> Result<ApiResponse<FinalizeResponse>, AppError> {
    if req.paths.is_empty() {
        return Err(AppError::Validation("paths must not be empty".to_string()));
    }
    if req.paths.len() > MAX_FINALIZE_PATHS {
        return Err(AppError::Validation(format!(
            "At most {MAX_FINALIZE_PATHS} files can be finalized at once"
        )));
    }
    if let Some(foreign) = req.paths.iter().find(|p| !paths::is_owned_by(p, user.id)) {
        return Err(AppError::Forbidden(format!("Path {foreign} is not owned by the caller")));
    }

    let mut files = Vec::with_capacity(req.paths.len());
    for path in &req.paths {
        files.push(promote(state.storage.as_ref(), user.id, path, req.folder).await?);
    }

    Ok(ApiResponse::ok(FinalizeResponse { files }))
}

/// Instant before which a temp object counts as older than `secs`.
fn cutoff_for_age(secs: u64) -> Result<DateTime<Utc>, AppError> {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .and_then(|age| Utc::now().checked_sub_signed(age))
        .ok_or_else(|| AppError::Validation(format!("older_than_secs {secs} is out of range")))
}

/// POST /api/v1/files/cleanup
pub async fn handle_cleanup(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(params): ApiQuery<CleanupParams>,
) -> Result<ApiResponse<CleanupResponse>, AppError> {
    let age = match (params.older_than_secs, params.expired_only) {
        (Some(secs), _) => Some(secs),
        (None, true) => Some(state.config.temp_file_ttl_secs),
        (None, false) => None,
    };
    let cutoff = age.map(cutoff_for_age).transpose()?;

    let removed = cleanup_temp(state.storage.as_ref(), user.id, cutoff).await?;

    Ok(ApiResponse::ok(CleanupResponse { removed }))
}
