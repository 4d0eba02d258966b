use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

use super::BatchResource;
use crate::models::profile::SkillRow;
use crate::validation::{validate_not_blank, FieldError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl SkillLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillLevel::Beginner => "beginner",
            SkillLevel::Intermediate => "intermediate",
            SkillLevel::Advanced => "advanced",
            SkillLevel::Expert => "expert",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "beginner" => Some(SkillLevel::Beginner),
            "intermediate" => Some(SkillLevel::Intermediate),
            "advanced" => Some(SkillLevel::Advanced),
            "expert" => Some(SkillLevel::Expert),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct SkillInput {
    #[validate(
        length(min = 1, max = 50),
        custom(function = "validate_not_blank")
    )]
    pub name: String,
    #[serde(default)]
    pub level: Option<SkillLevel>,
}

#[async_trait]
impl BatchResource for SkillInput {
    const TABLE: &'static str = "skills";
    const OWNER_COLUMN: &'static str = "user_id";
    const ORDER_BY: &'static str = "created_at, id";
    const LABEL: &'static str = "Skill";

    type Row = SkillRow;

    fn row_id(row: &SkillRow) -> Uuid {
        row.id
    }

    fn from_row(row: &SkillRow) -> Self {
        SkillInput {
            name: row.name.clone(),
            level: row.level.as_deref().and_then(SkillLevel::parse),
        }
    }

    fn check_collection(prefix: &str, items: &[Self]) -> Vec<FieldError> {
        let mut seen: Vec<String> = Vec::with_capacity(items.len());
        let mut errors = Vec::new();
        for (i, item) in items.iter().enumerate() {
            let key = item.name.trim().to_lowercase();
            if seen.contains(&key) {
                errors.push(FieldError::new(
                    format!("{prefix}[{i}].name"),
                    "duplicates another skill",
                ));
            } else {
                seen.push(key);
            }
        }
        errors
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
            INSERT INTO skills (id, user_id, name, level, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $5)
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(item.name.trim())
        .bind(item.level.map(|l| l.as_str()))
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
            UPDATE skills
            SET name = $1, level = $2, updated_by = $3, updated_at = NOW()
            WHERE id = $4 AND user_id = $5 AND is_active
            "#,
        )
        .bind(item.name.trim())
        .bind(item.level.map(|l| l.as_str()))
        .bind(actor)
        .bind(id)
        .bind(owner)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }
}
