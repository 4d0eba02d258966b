//! Axum route handlers for applying to jobs and moving board cards.

use axum::extract::State;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{
    build_board, plan_move, ApplicationStatus, ApplyRequest, BoardCard, BoardColumn,
    move_status, CandidateApplicationRow, StatusMove, SubmittedApplication,
};
use crate::auth::AuthUser;
use crate::errors::{conflict_on_unique, AppError};
use crate::extract::{ApiJson, ApiPath};
use crate::jobs::{find_job, find_owned_job, JobStatus};
use crate::models::job::{ApplicationAnswerRow, ApplicationRow, JobQuestionRow};
use crate::resources::{list_active, JobQuestionInput};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::users::require_onboarded;

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub status: ApplicationStatus,
}

/// POST /api/v1/jobs/:id/apply
pub async fn handle_apply(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(job_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<ApplyRequest>,
) -> Result<ApiResponse<SubmittedApplication>, AppError> {
    user.require_candidate()?;
    require_onboarded(&state.db, &user).await?;

    let job = find_job(&state.db, job_id).await?;
    if job.status != JobStatus::Open.as_str() {
        return Err(AppError::Validation(
            "This job is no longer accepting applications".to_string(),
        ));
    }

    let questions: Vec<JobQuestionRow> = list_active::<JobQuestionInput>(&state.db, job_id).await?;
    let errors = req.errors(&questions);
    if !errors.is_empty() {
        return Err(AppError::InvalidFields(errors));
    }

    let mut tx = state.db.begin().await?;
    let application = sqlx::query_as::<_, ApplicationRow>(
        r#"
        INSERT INTO job_applications
            (id, job_id, candidate_id, status, cover_letter, created_by, updated_by)
        VALUES ($1, $2, $3, $4, $5, $3, $3)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(job_id)
    .bind(user.id)
    .bind(ApplicationStatus::Applied.as_str())
    .bind(req.cover_letter.as_deref().map(str::trim).filter(|s| !s.is_empty()))
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| conflict_on_unique(e, "You have already applied to this job"))?;

    let mut answers = Vec::new();
    for (question_id, answer) in req.answers_to_store() {
        let row = sqlx::query_as::<_, ApplicationAnswerRow>(
            r#"
            INSERT INTO application_answers (id, application_id, question_id, answer)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(application.id)
        .bind(question_id)
        .bind(answer)
        .fetch_one(&mut *tx)
        .await?;
        answers.push(row);
    }
    tx.commit().await?;

    info!("Candidate {} applied to job {job_id}", user.id);
    Ok(ApiResponse::created(SubmittedApplication {
        application,
        answers,
    }))
}

/// GET /api/v1/applications
pub async fn handle_my_applications(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<ApiResponse<Vec<CandidateApplicationRow>>, AppError> {
    user.require_candidate()?;
    let rows = sqlx::query_as::<_, CandidateApplicationRow>(
        r#"
        SELECT a.id, a.job_id, j.title AS job_title, j.status AS job_status,
               a.status, a.cover_letter, a.created_at, a.updated_at
        FROM job_applications a
        JOIN jobs j ON j.id = a.job_id
        WHERE a.candidate_id = $1 AND a.is_active
        ORDER BY a.created_at DESC, a.id
        "#,
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await?;
    Ok(ApiResponse::ok(rows))
}

/// GET /api/v1/jobs/:id/board
pub async fn handle_board(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(job_id): ApiPath<Uuid>,
) -> Result<ApiResponse<Vec<BoardColumn>>, AppError> {
    user.require_recruiter()?;
    find_owned_job(&state.db, job_id, user.id).await?;

    let cards = sqlx::query_as::<_, BoardCard>(
        r#"
        SELECT a.id, a.candidate_id, u.full_name AS candidate_name,
               u.username AS candidate_username, a.status,
               (SELECT COUNT(*) FROM application_answers aa WHERE aa.application_id = a.id)
                   AS answers_count,
               a.created_at, a.updated_at
        FROM job_applications a
        JOIN users u ON u.id = a.candidate_id
        WHERE a.job_id = $1 AND a.is_active
        "#,
    )
    .bind(job_id)
    .fetch_all(&state.db)
    .await?;

    Ok(ApiResponse::ok(build_board(cards)))
}

/// PATCH /api/v1/applications/:id/status
pub async fn handle_move_application(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<MoveRequest>,
) -> Result<ApiResponse<ApplicationRow>, AppError> {
    user.require_recruiter()?;

    let application = sqlx::query_as::<_, ApplicationRow>(
        "SELECT * FROM job_applications WHERE id = $1 AND is_active",
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))?;
    find_owned_job(&state.db, application.job_id, user.id).await?;

    let current = ApplicationStatus::parse(&application.status).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "application {id} has unknown status {}",
            application.status
        ))
    })?;

    let target = match plan_move(current, req.status)? {
        StatusMove::Unchanged => return Ok(ApiResponse::ok(application)),
        StatusMove::Move(target) => target,
    };

    let moved = move_status(&state.db, id, current, target, user.id)
        .await?
        .ok_or_else(|| {
            AppError::Conflict("Application was moved by someone else; reload the board".to_string())
        })?;

    info!("Application {id} moved from {} to {}", current.as_str(), target.as_str());
    Ok(ApiResponse::ok(moved))
}
