use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{clean_optional, BatchResource};
use crate::models::profile::EducationRow;
use crate::validation::{dates_ordered, rule, validate_not_blank};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[validate(schema(function = "check_education"))]
pub struct EducationInput {
    #[validate(length(min = 1, max = 150), custom(function = "validate_not_blank"))]
    pub institution: String,
    #[validate(length(min = 1, max = 150), custom(function = "validate_not_blank"))]
    pub degree: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub field_of_study: Option<String>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub grade: Option<String>,
}

fn check_education(input: &EducationInput) -> Result<(), ValidationError> {
    if input.is_current && input.end_date.is_some() {
        return Err(rule("end_date", "must be empty while studying here"));
    }
    if !dates_ordered(Some(input.start_date), input.end_date) {
        return Err(rule("end_date", "must not be before start_date"));
    }
    Ok(())
}

#[async_trait]
impl BatchResource for EducationInput {
    const TABLE: &'static str = "education";
    const OWNER_COLUMN: &'static str = "user_id";
    const ORDER_BY: &'static str = "start_date DESC, id";
    const LABEL: &'static str = "Education";

    type Row = EducationRow;

    fn row_id(row: &EducationRow) -> Uuid {
        row.id
    }

    fn from_row(row: &EducationRow) -> Self {
        EducationInput {
            institution: row.institution.clone(),
            degree: row.degree.clone(),
            field_of_study: row.field_of_study.clone(),
            start_date: row.start_date,
            end_date: row.end_date,
            is_current: row.is_current,
            grade: row.grade.clone(),
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
            INSERT INTO education
                (id, user_id, institution, degree, field_of_study, start_date,
                 end_date, is_current, grade, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(item.institution.trim())
        .bind(item.degree.trim())
        .bind(clean_optional(&item.field_of_study))
        .bind(item.start_date)
        .bind(item.end_date)
        .bind(item.is_current)
        .bind(clean_optional(&item.grade))
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
            UPDATE education
            SET institution = $1, degree = $2, field_of_study = $3, start_date = $4,
                end_date = $5, is_current = $6, grade = $7, updated_by = $8, updated_at = NOW()
            WHERE id = $9 AND user_id = $10 AND is_active
            "#,
        )
        .bind(item.institution.trim())
        .bind(item.degree.trim())
        .bind(clean_optional(&item.field_of_study))
        .bind(item.start_date)
        .bind(item.end_date)
        .bind(item.is_current)
        .bind(clean_optional(&item.grade))
        .bind(actor)
        .bind(id)
        .bind(owner)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }
}
