use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{clean_optional, BatchResource};
use crate::models::profile::ProjectRow;
use crate::validation::{dates_ordered, is_optional_http_url, rule, validate_not_blank};

const MAX_TECH_LEN: usize = 40;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[validate(schema(function = "check_project"))]
pub struct ProjectInput {
    #[validate(length(min = 1, max = 150), custom(function = "validate_not_blank"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub url: Option<String>,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub repo_url: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20, message = "may list at most 20 technologies"))]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

fn check_project(input: &ProjectInput) -> Result<(), ValidationError> {
    if !is_optional_http_url(input.url.as_deref()) {
        return Err(rule("url", "must be an http(s) URL"));
    }
    if !is_optional_http_url(input.repo_url.as_deref()) {
        return Err(rule("repo_url", "must be an http(s) URL"));
    }
    if input
        .tech_stack
        .iter()
        .any(|t| t.trim().is_empty() || t.chars().count() > MAX_TECH_LEN)
    {
        return Err(rule(
            "tech_stack",
            "entries must be non-blank and at most 40 characters",
        ));
    }
    if !dates_ordered(input.start_date, input.end_date) {
        return Err(rule("end_date", "must not be before start_date"));
    }
    Ok(())
}

fn clean_stack(stack: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(stack.len());
    for tech in stack.iter().map(|t| t.trim()) {
        if !out.iter().any(|seen| seen.eq_ignore_ascii_case(tech)) {
            out.push(tech.to_string());
        }
    }
    out
}

#[async_trait]
impl BatchResource for ProjectInput {
    const TABLE: &'static str = "projects";
    const OWNER_COLUMN: &'static str = "user_id";
    const ORDER_BY: &'static str = "start_date DESC NULLS LAST, created_at, id";
    const LABEL: &'static str = "Project";

    type Row = ProjectRow;

    fn row_id(row: &ProjectRow) -> Uuid {
        row.id
    }

    fn from_row(row: &ProjectRow) -> Self {
        ProjectInput {
            name: row.name.clone(),
            description: row.description.clone(),
            url: row.url.clone(),
            repo_url: row.repo_url.clone(),
            tech_stack: row.tech_stack.clone(),
            start_date: row.start_date,
            end_date: row.end_date,
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
            INSERT INTO projects
                (id, user_id, name, description, url, repo_url, tech_stack,
                 start_date, end_date, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(item.name.trim())
        .bind(clean_optional(&item.description))
        .bind(clean_optional(&item.url))
        .bind(clean_optional(&item.repo_url))
        .bind(clean_stack(&item.tech_stack))
        .bind(item.start_date)
        .bind(item.end_date)
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
            UPDATE projects
            SET name = $1, description = $2, url = $3, repo_url = $4, tech_stack = $5,
                start_date = $6, end_date = $7, updated_by = $8, updated_at = NOW()
            WHERE id = $9 AND user_id = $10 AND is_active
            "#,
        )
        .bind(item.name.trim())
        .bind(clean_optional(&item.description))
        .bind(clean_optional(&item.url))
        .bind(clean_optional(&item.repo_url))
        .bind(clean_stack(&item.tech_stack))
        .bind(item.start_date)
        .bind(item.end_date)
        .bind(actor)
        .bind(id)
        .bind(owner)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::check;

    fn input() -> ProjectInput {
        ProjectInput {
            name: "cofounds".to_string(),
            description: Some("Job board".to_string()),
            url: Some("https://cofounds.dev".to_string()),
            repo_url: None,
            tech_stack: vec!["Rust".to_string(), "Postgres".to_string()],
            start_date: None,
            end_date: None,
        }
    }

    #[test]
    fn test_valid_project() {
        assert!(check("", &input()).is_empty());
    }

    #[test]
    fn test_bad_repo_url() {
        let mut bad = input();
        bad.repo_url = Some("git@github.com:me/repo.git".to_string());
        assert_eq!(check("", &bad)[0].field, "repo_url");
    }

    #[test]
    fn test_tech_stack_limits() {
        let mut crowded = input();
        crowded.tech_stack = (0..21).map(|i| format!("tech{i}")).collect();
        let errors = check("", &crowded);
        assert_eq!(errors[0].field, "tech_stack");
        assert_eq!(errors[0].message, "may list at most 20 technologies");

        let mut blank = input();
        blank.tech_stack = vec!["  ".to_string()];
        assert_eq!(check("", &blank)[0].field, "tech_stack");
    }

    #[test]
    fn test_clean_stack_dedups_case_insensitively() {
        let stack = vec![" Rust".to_string(), "rust".to_string(), "Axum".to_string()];
        assert_eq!(clean_stack(&stack), vec!["Rust".to_string(), "Axum".to_string()]);
    }
}
