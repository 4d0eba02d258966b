//! Extra questions attached to a job posting. Owned by the job, not a user.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

use super::BatchResource;
use crate::models::job::JobQuestionRow;
use crate::validation::validate_not_blank;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct JobQuestionInput {
    #[validate(length(min = 5, max = 300), custom(function = "validate_not_blank"))]
    pub question: String,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    #[validate(range(min = 0, max = 1000))]
    pub position: i32,
}

#[async_trait]
impl BatchResource for JobQuestionInput {
    const TABLE: &'static str = "job_questions";
    const OWNER_COLUMN: &'static str = "job_id";
    const ORDER_BY: &'static str = "position, created_at, id";
    const LABEL: &'static str = "Question";

    type Row = JobQuestionRow;

    fn row_id(row: &JobQuestionRow) -> Uuid {
        row.id
    }

    fn from_row(row: &JobQuestionRow) -> Self {
        JobQuestionInput {
            question: row.question.clone(),
            is_required: row.is_required,
            position: row.position,
        }
    }

    async fn insert(
        conn: &mut PgConnection,
        owner: Uuid,
        actor: Uuid,
        item: &Self,
    ) -> sqlx::Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO job_questions
                (id, job_id, question, is_required, position, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(item.question.trim())
        .bind(item.is_required)
        .bind(item.position)
        .bind(actor)
        .execute(&mut *conn)
        .await?;
        Ok(id)
    }

    async fn update(
        conn: &mut PgConnection,
        owner: Uuid,
        actor: Uuid,
        id: Uuid,
        item: &Self,
    ) -> sqlx::Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE job_questions
            SET question = $1, is_required = $2, position = $3, updated_by = $4, updated_at = NOW()
            WHERE id = $5 AND job_id = $6 AND is_active
            "#,
        )
        .bind(item.question.trim())
        .bind(item.is_required)
        .bind(item.position)
        .bind(actor)
        .bind(id)
        .bind(owner)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }
}
