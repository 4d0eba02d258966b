//! Job applications and the recruiter's kanban board.
//!
//! Board columns follow [`ApplicationStatus::ALL`]. `hired` is terminal; every
//! other column can move to any other.

pub mod handlers;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;
use crate::models::job::{ApplicationAnswerRow, ApplicationRow, JobQuestionRow};
use crate::validation::{check, FieldError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    Shortlisted,
    Interviewing,
    Offered,
    Hired,
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 6] = [
        ApplicationStatus::Applied,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::Interviewing,
        ApplicationStatus::Offered,
        ApplicationStatus::Hired,
        ApplicationStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Interviewing => "interviewing",
            ApplicationStatus::Offered => "offered",
            ApplicationStatus::Hired => "hired",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        ApplicationStatus::ALL.into_iter().find(|s| s.as_str() == raw)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ApplicationStatus::Hired)
    }
}

/// What a status change request amounts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMove {
    Unchanged,
    Move(ApplicationStatus),
}

pub fn plan_move(
    current: ApplicationStatus,
    target: ApplicationStatus,
) -> Result<StatusMove, AppError> {
    if current == target {
        return Ok(StatusMove::Unchanged);
    }
    if current.is_terminal() {
        return Err(AppError::Conflict(format!(
            "Applications marked {} cannot be moved",
            current.as_str()
        )));
    }
    Ok(StatusMove::Move(target))
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AnswerInput {
    pub question_id: Uuid,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub answer: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ApplyRequest {
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub cover_letter: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub answers: Vec<AnswerInput>,
}

impl ApplyRequest {
    /// Checks the request against the job's active questions.
    pub fn errors(&self, questions: &[JobQuestionRow]) -> Vec<FieldError> {
        let mut errors = check("", self);
        let known: HashSet<Uuid> = questions.iter().map(|q| q.id).collect();
        let mut seen = HashSet::new();

        for (i, answer) in self.answers.iter().enumerate() {
            if !known.contains(&answer.question_id) {
                errors.push(FieldError::new(
                    format!("answers[{i}].question_id"),
                    "is not a question of this job",
                ));
            } else if !seen.insert(answer.question_id) {
                errors.push(FieldError::new(
                    format!("answers[{i}].question_id"),
                    "is answered more than once",
                ));
            }
        }

        for question in questions.iter().filter(|q| q.is_required) {
            let answered = self
                .answers
                .iter()
                .any(|a| a.question_id == question.id && !a.answer.trim().is_empty());
            if !answered {
                errors.push(FieldError::new(
                    format!("answers.{}", question.id),
                    "this question requires an answer",
                ));
            }
        }
        errors
    }

    /// Non-blank answers, trimmed, ready to store.
    pub fn answers_to_store(&self) -> Vec<(Uuid, String)> {
        self.answers
            .iter()
            .map(|a| (a.question_id, a.answer.trim()))
            .filter(|(_, answer)| !answer.is_empty())
            .map(|(id, answer)| (id, answer.to_string()))
            .collect()
    }
}

/// A freshly stored application with the answers it carried.
#[derive(Debug, Serialize)]
pub struct SubmittedApplication {
    #[serde(flatten)]
    pub application: ApplicationRow,
    pub answers: Vec<ApplicationAnswerRow>,
}

/// Candidate view of one of their applications.
#[derive(Debug, Serialize, FromRow)]
pub struct CandidateApplicationRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub job_title: String,
    pub job_status: String,
    pub status: String,
    pub cover_letter: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A card on the recruiter's board.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BoardCard {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub candidate_username: String,
    pub status: String,
    pub answers_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct BoardColumn {
    pub status: ApplicationStatus,
    pub cards: Vec<BoardCard>,
}

/// Moves an application from `from` to `to`. Returns `None` when the stored
/// status is no longer `from`, so a concurrent move is never overwritten.
pub async fn move_status(
    pool: &PgPool,
    id: Uuid,
    from: ApplicationStatus,
    to: ApplicationStatus,
    actor: Uuid,
) -> Result<Option<ApplicationRow>, sqlx::Error> {
    sqlx::query_as::<_, ApplicationRow>(
        r#"
        UPDATE job_applications
        SET status = $1, updated_by = $2, updated_at = NOW()
        WHERE id = $3 AND status = $4 AND is_active
        RETURNING *
        "#,
    )
    .bind(to.as_str())
    .bind(actor)
    .bind(id)
    .bind(from.as_str())
    .fetch_optional(pool)
    .await
}

/// Groups cards into one column per status, most recently moved first.
pub fn build_board(cards: Vec<BoardCard>) -> Vec<BoardColumn> {
    let mut columns: Vec<BoardColumn> = ApplicationStatus::ALL
        .into_iter()
        .map(|status| BoardColumn {
            status,
            cards: Vec::new(),
        })
        .collect();

    for card in cards {
        match ApplicationStatus::parse(&card.status) {
            Some(status) => {
                if let Some(column) = columns.iter_mut().find(|c| c.status == status) {
                    column.cards.push(card);
                }
            }
            None => warn!("Application {} has unknown status {}", card.id, card.status),
        }
    }

    for column in columns.iter_mut() {
        column
            .cards
            .sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
    }
    columns
}
