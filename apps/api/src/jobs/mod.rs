//! Job postings.

pub mod handlers;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::errors::AppError;
use crate::models::job::JobRow;
use crate::resources::JobQuestionInput;
use crate::validation::{check, check_each, rule, validate_not_blank, FieldError};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const MAX_QUESTIONS: usize = 20;
const MAX_SKILL_LEN: usize = 50;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Internship,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::FullTime => "full_time",
            JobType::PartTime => "part_time",
            JobType::Contract => "contract",
            JobType::Internship => "internship",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkMode {
    Onsite,
    Remote,
    Hybrid,
}

impl WorkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkMode::Onsite => "onsite",
            WorkMode::Remote => "remote",
            WorkMode::Hybrid => "hybrid",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    Closed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Open => "open",
            JobStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "check_job"))]
pub struct CreateJobRequest {
    #[validate(length(min = 3, max = 120), custom(function = "validate_not_blank"))]
    pub title: String,
    #[validate(length(min = 20, max = 10000))]
    pub description: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub location: Option<String>,
    pub job_type: JobType,
    pub work_mode: WorkMode,
    #[serde(default)]
    pub salary_min: Option<i64>,
    #[serde(default)]
    pub salary_max: Option<i64>,
    #[serde(default)]
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20, message = "may list at most 20 skills"))]
    pub skills: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 20, message = "may contain at most 20 questions"))]
    pub questions: Vec<JobQuestionInput>,
}

fn check_job(job: &CreateJobRequest) -> Result<(), ValidationError> {
    if job.salary_min.is_some_and(|v| v < 0) {
        return Err(rule("salary_min", "must not be negative"));
    }
    if job.salary_max.is_some_and(|v| v < 0) {
        return Err(rule("salary_max", "must not be negative"));
    }
    if let (Some(min), Some(max)) = (job.salary_min, job.salary_max) {
        if max < min {
            return Err(rule("salary_max", "must not be below salary_min"));
        }
    }
    if job
        .skills
        .iter()
        .any(|s| s.trim().is_empty() || s.chars().count() > MAX_SKILL_LEN)
    {
        return Err(rule("skills", "entries must be non-blank and at most 50 characters"));
    }
    if job
        .currency
        .as_deref()
        .is_some_and(|c| !c.chars().all(|ch| ch.is_ascii_uppercase()))
    {
        return Err(rule("currency", "must be an ISO 4217 code such as USD"));
    }
    Ok(())
}

impl CreateJobRequest {
    pub fn errors(&self) -> Vec<FieldError> {
        let mut errors = check("", self);
        errors.extend(check_each("questions", &self.questions));
        errors
    }

    /// Skills trimmed and de-duplicated, ignoring case.
    pub fn clean_skills(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.skills.len());
        for skill in self.skills.iter().map(|s| s.trim()) {
            if !out.iter().any(|seen| seen.eq_ignore_ascii_case(skill)) {
                out.push(skill.to_string());
            }
        }
        out
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobListParams {
    pub q: Option<String>,
    pub work_mode: Option<WorkMode>,
    pub job_type: Option<JobType>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl JobListParams {
    /// Returns `(limit, offset)` after bounds checks.
    pub fn page(&self) -> Result<(i64, i64), AppError> {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(AppError::Validation("offset must not be negative".to_string()));
        }
        Ok((limit, offset))
    }

    /// `ILIKE` pattern for the free-text query, with wildcards escaped.
    pub fn pattern(&self) -> Option<String> {
        let q = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())?;
        let mut escaped = String::with_capacity(q.len() + 2);
        for c in q.chars() {
            if matches!(c, '%' | '_' | '\\') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        Some(format!("%{escaped}%"))
    }
}

#[derive(Debug, Serialize)]
pub struct JobPage {
    pub jobs: Vec<JobRow>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize, FromRow)]
pub struct RecruiterJobRow {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub job: JobRow,
    pub applicant_count: i64,
}

pub async fn find_job(pool: &PgPool, id: Uuid) -> Result<JobRow, AppError> {
    sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1 AND is_active")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))
}

/// Loads a job the caller may manage.
pub async fn find_owned_job(pool: &PgPool, id: Uuid, recruiter_id: Uuid) -> Result<JobRow, AppError> {
    let job = find_job(pool, id).await?;
    if job.recruiter_id != recruiter_id {
        return Err(AppError::Forbidden(
            "Only the recruiter who posted this job can manage it".to_string(),
        ));
    }
    Ok(job)
}

pub async fn list_open_jobs(pool: &PgPool, params: &JobListParams) -> Result<JobPage, AppError> {
    let (limit, offset) = params.page()?;
    let pattern = params.pattern();
    let work_mode = params.work_mode.map(|m| m.as_str());
    let job_type = params.job_type.map(|t| t.as_str());

    const FILTER: &str = r#"
        WHERE is_active AND status = 'open'
          AND ($1::TEXT IS NULL OR title ILIKE $1 OR description ILIKE $1)
          AND ($2::TEXT IS NULL OR work_mode = $2)
          AND ($3::TEXT IS NULL OR job_type = $3)
    "#;

    let jobs = sqlx::query_as::<_, JobRow>(&format!(
        "SELECT * FROM jobs {FILTER} ORDER BY created_at DESC, id LIMIT $4 OFFSET $5"
    ))
    .bind(&pattern)
    .bind(work_mode)
    .bind(job_type)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM jobs {FILTER}"))
        .bind(&pattern)
        .bind(work_mode)
        .bind(job_type)
        .fetch_one(pool)
        .await?;

    Ok(JobPage {
        jobs,
        total,
        limit,
        offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> CreateJobRequest {
        serde_json::from_value(json!({
            "title": "Founding Engineer",
            "description": "Build the first version of our hiring platform.",
            "job_type": "full_time",
            "work_mode": "remote",
            "salary_min": 90000,
            "salary_max": 120000,
            "currency": "USD",
            "skills": ["Rust", "rust", "Postgres"],
            "questions": [{"question": "Why this role?", "is_required": true}]
        }))
        .unwrap()
    }

    #[test]
    fn test_valid_job() {
        assert!(request().errors().is_empty());
    }

    #[test]
    fn test_salary_must_be_ordered() {
        let mut job = request();
        job.salary_max = Some(50_000);
        assert_eq!(
            job.errors(),
            vec![FieldError::new("salary_max", "must not be below salary_min")]
        );
    }

    #[test]
    fn test_negative_salary() {
        let mut job = request();
        job.salary_min = Some(-1);
        assert_eq!(job.errors()[0].field, "salary_min");
    }

    #[test]
    fn test_question_errors_are_indexed() {
        let mut job = request();
        job.questions.push(JobQuestionInput {
            question: "Why".to_string(),
            is_required: false,
            position: 1,
        });
        let errors = job.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "questions[1].question");
    }

    #[test]
    fn test_unknown_job_type_rejected() {
        let raw = json!({
            "title": "Engineer",
            "description": "A sufficiently long description.",
            "job_type": "gig",
            "work_mode": "remote"
        });
        assert!(serde_json::from_value::<CreateJobRequest>(raw).is_err());
    }

    #[test]
    fn test_clean_skills() {
        assert_eq!(request().clean_skills(), vec!["Rust", "Postgres"]);
    }

    #[test]
    fn test_page_bounds() {
        let params = JobListParams {
            q: None,
            work_mode: None,
            job_type: None,
            limit: None,
            offset: None,
        };
        assert_eq!(params.page().unwrap(), (DEFAULT_PAGE_SIZE, 0));

        let too_many = JobListParams {
            limit: Some(101),
            ..params.clone()
        };
        assert!(too_many.page().is_err());

        let negative = JobListParams {
            offset: Some(-5),
            ..params
        };
        assert!(negative.page().is_err());
    }

    #[test]
    fn test_search_pattern_escapes_wildcards() {
        let params = JobListParams {
            q: Some(" 100%_rust ".to_string()),
            work_mode: None,
            job_type: None,
            limit: None,
            offset: None,
        };
        assert_eq!(params.pattern().as_deref(), Some("%100\\%\\_rust%"));

        let blank = JobListParams {
            q: Some("   ".to_string()),
            ..params
        };
        assert_eq!(blank.pattern(), None);
    }
}
