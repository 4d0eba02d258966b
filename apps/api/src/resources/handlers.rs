//! Axum route handlers for the candidate profile lists under `/api/v1`.
//!
//! One generic set serves every [`BatchResource`]; the router instantiates
//! them per resource, e.g. `get(handle_list::<SkillInput>)`.

use axum::extract::State;
use serde::Deserialize;
use tracing::info;

use super::certificates::finalize_batch_files;
use super::{
    apply_batch, list_active, plan_sync, validate_batch, BatchOutcome, BatchResource,
    CertificateInput,
};
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::extract::ApiJson;
use crate::pending::{BatchUpdate, SyncItem};
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SyncRequest<R> {
    pub items: Vec<SyncItem<R>>,
}

/// Checks a desired full list and turns it into the batch that reaches it.
async fn plan_from_request<R: BatchResource>(
    state: &AppState,
    user: &AuthUser,
    req: SyncRequest<R>,
) -> Result<BatchUpdate<R>, AppError> {
    let desired: Vec<R> = req.items.iter().map(|item| item.data.clone()).collect();
    let errors = R::check_collection("items", &desired);
    if !errors.is_empty() {
        return Err(AppError::InvalidFields(errors));
    }

    let batch = plan_sync::<R>(&state.db, user.id, req.items).await?;
    validate_batch(&batch, user.id)?;
    Ok(batch)
}

/// GET /api/v1/{resource}
pub async fn handle_list<R: BatchResource>(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<ApiResponse<Vec<R::Row>>, AppError> {
    user.require_candidate()?;
    let rows = list_active::<R>(&state.db, user.id).await?;
    Ok(ApiResponse::ok(rows))
}

/// POST /api/v1/{resource}/batch
pub async fn handle_batch<R: BatchResource>(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(batch): ApiJson<BatchUpdate<R>>,
) -> Result<ApiResponse<BatchOutcome>, AppError> {
    user.require_candidate()?;
    let outcome = apply_batch(&state.db, user.id, user.id, &batch).await?;
    Ok(ApiResponse::ok(outcome))
}

/// PUT /api/v1/{resource}
///
/// Replaces the caller's list with `items`. Items with an id keep their row.
pub async fn handle_sync<R: BatchResource>(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<SyncRequest<R>>,
) -> Result<ApiResponse<BatchOutcome>, AppError> {
    user.require_candidate()?;
    let batch = plan_from_request(&state, &user, req).await?;
    if batch.is_empty() {
        info!("{} sync for user {} had no changes", R::TABLE, user.id);
    }
    let outcome = apply_batch(&state.db, user.id, user.id, &batch).await?;
    Ok(ApiResponse::ok(outcome))
}

/// POST /api/v1/certificates/batch
///
/// Temp uploads are promoted before the rows are written.
pub async fn handle_certificate_batch(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(mut batch): ApiJson<BatchUpdate<CertificateInput>>,
) -> Result<ApiResponse<BatchOutcome>, AppError> {
    user.require_candidate()?;
    validate_batch(&batch, user.id)?;
    finalize_batch_files(&mut batch, state.storage.as_ref(), user.id).await?;
    let outcome = apply_batch(&state.db, user.id, user.id, &batch).await?;
    Ok(ApiResponse::ok(outcome))
}

/// PUT /api/v1/certificates
pub async fn handle_certificate_sync(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<SyncRequest<CertificateInput>>,
) -> Result<ApiResponse<BatchOutcome>, AppError> {
    user.require_candidate()?;
    let mut batch = plan_from_request(&state, &user, req).await?;
    finalize_batch_files(&mut batch, state.storage.as_ref(), user.id).await?;
    let outcome = apply_batch(&state.db, user.id, user.id, &batch).await?;
    Ok(ApiResponse::ok(outcome))
}
