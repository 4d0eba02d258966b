//! Axum route handlers for `/api/v1/jobs` and the recruiter's job list.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{
    find_job, find_owned_job, list_open_jobs, CreateJobRequest, JobListParams, JobPage, JobStatus,
    RecruiterJobRow, MAX_QUESTIONS,
};
use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::job::{JobQuestionRow, JobRow};
use crate::pending::BatchUpdate;
use crate::resources::{apply_batch, apply_batch_in, list_active, BatchOutcome, JobQuestionInput};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::users::require_onboarded;

#[derive(Debug, Serialize)]
pub struct JobDetail {
    #[serde(flatten)]
    pub job: JobRow,
    pub questions: Vec<JobQuestionRow>,
}

#[derive(Debug, Deserialize)]
pub struct JobStatusRequest {
    pub status: JobStatus,
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateJobRequest>,
) -> Result<ApiResponse<JobDetail>, AppError> {
    user.require_recruiter()?;
    let errors = req.errors();
    if !errors.is_empty() {
        return Err(AppError::InvalidFields(errors));
    }
    require_onboarded(&state.db, &user).await?;

    let mut tx = state.db.begin().await?;
    let job = sqlx::query_as::<_, JobRow>(
        r#"
        INSERT INTO jobs
            (id, recruiter_id, title, description, location, job_type, work_mode,
             salary_min, salary_max, currency, skills, created_by, updated_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $2, $2)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.id)
    .bind(req.title.trim())
    .bind(req.description.trim())
    .bind(req.location.as_deref().map(str::trim).filter(|s| !s.is_empty()))
    .bind(req.job_type.as_str())
    .bind(req.work_mode.as_str())
    .bind(req.salary_min)
    .bind(req.salary_max)
    .bind(req.currency.as_deref())
    .bind(req.clean_skills())
    .fetch_one(&mut *tx)
    .await?;

    if !req.questions.is_empty() {
        let batch = BatchUpdate {
            new: req.questions.clone(),
            ..BatchUpdate::default()
        };
        apply_batch_in(&mut tx, job.id, user.id, &batch).await?;
    }
    tx.commit().await?;

    info!("Recruiter {} posted job {}", user.id, job.id);

    let questions = list_active::<JobQuestionInput>(&state.db, job.id).await?;
    Ok(ApiResponse::created(JobDetail { job, questions }))
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<JobListParams>,
) -> Result<ApiResponse<JobPage>, AppError> {
    let page = list_open_jobs(&state.db, &params).await?;
    Ok(ApiResponse::ok(page))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<JobDetail>, AppError> {
    let job = find_job(&state.db, id).await?;
    let questions = list_active::<JobQuestionInput>(&state.db, id).await?;
    Ok(ApiResponse::ok(JobDetail { job, questions }))
}

/// GET /api/v1/recruiter/jobs
pub async fn handle_recruiter_jobs(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<ApiResponse<Vec<RecruiterJobRow>>, AppError> {
    user.require_recruiter()?;
    let jobs = sqlx::query_as::<_, RecruiterJobRow>(
        r#"
        SELECT j.*, COUNT(a.id) AS applicant_count
        FROM jobs j
        LEFT JOIN job_applications a ON a.job_id = j.id AND a.is_active
        WHERE j.recruiter_id = $1 AND j.is_active
        GROUP BY j.id
        ORDER BY j.created_at DESC, j.id
        "#,
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await?;
    Ok(ApiResponse::ok(jobs))
}

/// PATCH /api/v1/jobs/:id/status
pub async fn handle_update_job_status(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<JobStatusRequest>,
) -> Result<ApiResponse<JobRow>, AppError> {
    user.require_recruiter()?;
    let job = find_owned_job(&state.db, id, user.id).await?;
    if job.status == req.status.as_str() {
        return Ok(ApiResponse::ok(job));
    }

    let job = sqlx::query_as::<_, JobRow>(
        r#"
        UPDATE jobs SET status = $1, updated_by = $2, updated_at = NOW()
        WHERE id = $3
        RETURNING *
        "#,
    )
    .bind(req.status.as_str())
    .bind(user.id)
    .bind(id)
    .fetch_one(&state.db)
    .await?;

    info!("Job {id} is now {}", job.status);
    Ok(ApiResponse::ok(job))
}

/// GET /api/v1/jobs/:id/questions
pub async fn handle_list_questions(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ApiResponse<Vec<JobQuestionRow>>, AppError> {
    find_job(&state.db, id).await?;
    let questions = list_active::<JobQuestionInput>(&state.db, id).await?;
    Ok(ApiResponse::ok(questions))
}

/// POST /api/v1/jobs/:id/questions/batch
pub async fn handle_question_batch(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(batch): ApiJson<BatchUpdate<JobQuestionInput>>,
) -> Result<ApiResponse<BatchOutcome>, AppError> {
    user.require_recruiter()?;
    find_owned_job(&state.db, id, user.id).await?;

    let active = list_active::<JobQuestionInput>(&state.db, id).await?.len();
    if (active + batch.new.len()).saturating_sub(batch.deleted.len()) > MAX_QUESTIONS {
        return Err(AppError::Validation(format!(
            "A job may have at most {MAX_QUESTIONS} questions"
        )));
    }

    let outcome = apply_batch(&state.db, id, user.id, &batch).await?;
    Ok(ApiResponse::ok(outcome))
}
