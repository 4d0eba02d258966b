use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{clean_optional, BatchResource};
use crate::models::profile::ExperienceRow;
use crate::validation::{dates_ordered, rule, validate_not_blank};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Internship,
    Freelance,
    SelfEmployed,
}

impl EmploymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentType::FullTime => "full_time",
            EmploymentType::PartTime => "part_time",
            EmploymentType::Contract => "contract",
            EmploymentType::Internship => "internship",
            EmploymentType::Freelance => "freelance",
            EmploymentType::SelfEmployed => "self_employed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "full_time" => Some(EmploymentType::FullTime),
            "part_time" => Some(EmploymentType::PartTime),
            "contract" => Some(EmploymentType::Contract),
            "internship" => Some(EmploymentType::Internship),
            "freelance" => Some(EmploymentType::Freelance),
            "self_employed" => Some(EmploymentType::SelfEmployed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[validate(schema(function = "check_experience"))]
pub struct ExperienceInput {
    #[validate(length(min = 1, max = 150), custom(function = "validate_not_blank"))]
    pub company: String,
    #[validate(length(min = 1, max = 150), custom(function = "validate_not_blank"))]
    pub title: String,
    pub employment_type: EmploymentType,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub location: Option<String>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

fn check_experience(input: &ExperienceInput) -> Result<(), ValidationError> {
    if input.is_current && input.end_date.is_some() {
        return Err(rule("end_date", "must be empty for a current position"));
    }
    if !input.is_current && input.end_date.is_none() {
        return Err(rule("end_date", "is required unless this is a current position"));
    }
    if !dates_ordered(Some(input.start_date), input.end_date) {
        return Err(rule("end_date", "must not be before start_date"));
    }
    Ok(())
}

#[async_trait]
impl BatchResource for ExperienceInput {
    const TABLE: &'static str = "experience";
    const OWNER_COLUMN: &'static str = "user_id";
    const ORDER_BY: &'static str = "is_current DESC, start_date DESC, id";
    const LABEL: &'static str = "Experience";

    type Row = ExperienceRow;

    fn row_id(row: &ExperienceRow) -> Uuid {
        row.id
    }

    fn from_row(row: &ExperienceRow) -> Self {
        ExperienceInput {
            company: row.company.clone(),
            title: row.title.clone(),
            employment_type: EmploymentType::parse(&row.employment_type)
                .unwrap_or(EmploymentType::FullTime),
            location: row.location.clone(),
            start_date: row.start_date,
            end_date: row.end_date,
            is_current: row.is_current,
            description: row.description.clone(),
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
            INSERT INTO experience
                (id, user_id, company, title, employment_type, location, start_date,
                 end_date, is_current, description, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(item.company.trim())
        .bind(item.title.trim())
        .bind(item.employment_type.as_str())
        .bind(clean_optional(&item.location))
        .bind(item.start_date)
        .bind(item.end_date)
        .bind(item.is_current)
        .bind(clean_optional(&item.description))
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
            UPDATE experience
            SET company = $1, title = $2, employment_type = $3, location = $4,
                start_date = $5, end_date = $6, is_current = $7, description = $8,
                updated_by = $9, updated_at = NOW()
            WHERE id = $10 AND user_id = $11 AND is_active
            "#,
        )
        .bind(item.company.trim())
        .bind(item.title.trim())
        .bind(item.employment_type.as_str())
        .bind(clean_optional(&item.location))
        .bind(item.start_date)
        .bind(item.end_date)
        .bind(item.is_current)
        .bind(clean_optional(&item.description))
        .bind(actor)
        .bind(id)
        .bind(owner)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }
}
