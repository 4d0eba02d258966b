//! Axum route handlers for `/api/v1/onboarding`.

use axum::extract::State;
use serde::Serialize;
use sqlx::PgConnection;
use tracing::info;
use uuid::Uuid;

use super::{CandidateOnboarding, RecruiterOnboarding, Step};
use crate::auth::{AuthUser, Role};
use crate::errors::{conflict_on_unique, AppError};
use crate::extract::{ApiJson, ApiPath};
use crate::models::user::{CandidateProfileRow, RecruiterProfileRow, UserRow};
use crate::pending::BatchUpdate;
use crate::resources::{apply_batch_in, BatchResource};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::storage::{promote, Folder};
use crate::users::{claim_user, find_user, mark_onboarded, upsert_candidate_profile, username_taken};
use crate::validation::check;

const USERNAME_TAKEN: &str = "This username is already taken";

#[derive(Debug, Serialize)]
pub struct StepVerdict {
    pub valid: bool,
    pub next_step: Option<Step>,
}

#[derive(Debug, Default, Serialize)]
pub struct CreatedCounts {
    pub skills: usize,
    pub education: usize,
    pub experience: usize,
    pub projects: usize,
    pub certificates: usize,
    pub links: usize,
}

#[derive(Debug, Serialize)]
pub struct CandidateOnboarded {
    pub user: UserRow,
    pub profile: CandidateProfileRow,
    pub created: CreatedCounts,
}

#[derive(Debug, Serialize)]
pub struct RecruiterOnboarded {
    pub user: UserRow,
    pub profile: RecruiterProfileRow,
}

/// POST /api/v1/onboarding/candidate/steps/:step/validate
pub async fn handle_validate_step(
    user: AuthUser,
    ApiPath(step): ApiPath<Step>,
    ApiJson(payload): ApiJson<serde_json::Value>,
) -> Result<ApiResponse<StepVerdict>, AppError> {
    user.require_candidate()?;

    let errors = step.validate_payload(payload, user.id)?;
    if !errors.is_empty() {
        return Err(AppError::InvalidFields(errors));
    }

    Ok(ApiResponse::ok(StepVerdict {
        valid: true,
        next_step: step.next(),
    }))
}

/// Rejects callers who already finished onboarding and usernames held by someone else.
async fn ensure_can_onboard(
    state: &AppState,
    user: &AuthUser,
    username: &str,
) -> Result<(), AppError> {
    if let Some(existing) = find_user(&state.db, user.id).await? {
        if existing.onboarded_at.is_some() {
            return Err(AppError::Conflict("Onboarding is already complete".to_string()));
        }
    }
    if username_taken(&state.db, username, user.id).await? {
        return Err(AppError::Conflict(USERNAME_TAKEN.to_string()));
    }
    Ok(())
}

async fn insert_all<R: BatchResource>(
    conn: &mut PgConnection,
    owner: Uuid,
    items: &[R],
) -> Result<usize, AppError> {
    if items.is_empty() {
        return Ok(0);
    }
    let batch = BatchUpdate {
        new: items.to_vec(),
        ..BatchUpdate::default()
    };
    let outcome = apply_batch_in(conn, owner, owner, &batch).await?;
    Ok(outcome.created.len())
}

/// POST /api/v1/onboarding/candidate
///
/// Uploaded files are promoted first; the database writes share one transaction.
pub async fn handle_candidate_onboarding(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(mut payload): ApiJson<CandidateOnboarding>,
) -> Result<ApiResponse<CandidateOnboarded>, AppError> {
    user.require_candidate()?;

    let errors = payload.errors(user.id);
    if !errors.is_empty() {
        return Err(AppError::InvalidFields(errors));
    }
    let username = payload.personal.username.trim().to_string();
    ensure_can_onboard(&state, &user, &username).await?;

    let store = state.storage.as_ref();
    if let Some(path) = payload
        .personal
        .avatar_path
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
    {
        let promotion = promote(store, user.id, path, Folder::ProfileImages).await?;
        payload.personal.avatar_path = Some(promotion.to);
    }
    for certificate in payload.certificates.iter_mut() {
        certificate.finalize_file(store, user.id).await?;
    }

    let mut tx = state.db.begin().await?;
    let personal = &payload.personal;
    claim_user(
        &mut tx,
        user.id,
        Role::Candidate,
        &username,
        &personal.full_name,
        personal.email.as_deref(),
    )
    .await
    .map_err(|e| conflict_on_unique(e, USERNAME_TAKEN))?
    .ok_or_else(|| AppError::Conflict("Onboarding is already complete".to_string()))?;

    let profile = upsert_candidate_profile(&mut tx, user.id, personal).await?;
    let created = CreatedCounts {
        skills: insert_all(&mut tx, user.id, &payload.skills).await?,
        education: insert_all(&mut tx, user.id, &payload.education).await?,
        experience: insert_all(&mut tx, user.id, &payload.experience).await?,
        projects: insert_all(&mut tx, user.id, &payload.projects).await?,
        certificates: insert_all(&mut tx, user.id, &payload.certificates).await?,
        links: insert_all(&mut tx, user.id, &payload.links).await?,
    };
    let row = mark_onboarded(&mut tx, user.id).await?;
    tx.commit().await?;

    info!("Candidate {} onboarded as {username}", user.id);

    Ok(ApiResponse::created(CandidateOnboarded {
        user: row,
        profile,
        created,
    }))
}

/// POST /api/v1/onboarding/recruiter
pub async fn handle_recruiter_onboarding(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<RecruiterOnboarding>,
) -> Result<ApiResponse<RecruiterOnboarded>, AppError> {
    user.require_recruiter()?;

    let errors = check("", &payload);
    if !errors.is_empty() {
        return Err(AppError::InvalidFields(errors));
    }
    let username = payload.username.trim().to_string();
    ensure_can_onboard(&state, &user, &username).await?;

    let mut tx = state.db.begin().await?;
    claim_user(
        &mut tx,
        user.id,
        Role::Recruiter,
        &username,
        &payload.full_name,
        payload.email.as_deref(),
    )
    .await
    .map_err(|e| conflict_on_unique(e, USERNAME_TAKEN))?
    .ok_or_else(|| AppError::Conflict("Onboarding is already complete".to_string()))?;

    let profile = sqlx::query_as::<_, RecruiterProfileRow>(
        r#"
        INSERT INTO recruiter_profiles (user_id, company_name, company_website, designation)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id) DO UPDATE
            SET company_name = EXCLUDED.company_name,
                company_website = EXCLUDED.company_website,
                designation = EXCLUDED.designation,
                updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(user.id)
    .bind(payload.company_name.trim())
    .bind(
        payload
            .company_website
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty()),
    )
    .bind(payload.designation.trim())
    .fetch_one(&mut *tx)
    .await?;
    let row = mark_onboarded(&mut tx, user.id).await?;
    tx.commit().await?;

    info!("Recruiter {} onboarded as {username}", user.id);

    Ok(ApiResponse::created(RecruiterOnboarded { user: row, profile }))
}
