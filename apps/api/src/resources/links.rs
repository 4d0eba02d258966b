use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

use super::BatchResource;
use crate::models::profile::LinkRow;
use crate::validation::{validate_http_url, FieldError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LinkPlatform {
    Github,
    Linkedin,
    Twitter,
    Portfolio,
    Website,
    Other,
}

impl LinkPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkPlatform::Github => "github",
            LinkPlatform::Linkedin => "linkedin",
            LinkPlatform::Twitter => "twitter",
            LinkPlatform::Portfolio => "portfolio",
            LinkPlatform::Website => "website",
            LinkPlatform::Other => "other",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "github" => Some(LinkPlatform::Github),
            "linkedin" => Some(LinkPlatform::Linkedin),
            "twitter" => Some(LinkPlatform::Twitter),
            "portfolio" => Some(LinkPlatform::Portfolio),
            "website" => Some(LinkPlatform::Website),
            "other" => Some(LinkPlatform::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct LinkInput {
    pub platform: LinkPlatform,
    #[validate(length(max = 500), custom(function = "validate_http_url"))]
    pub url: String,
}

#[async_trait]
impl BatchResource for LinkInput {
    const TABLE: &'static str = "links";
    const OWNER_COLUMN: &'static str = "user_id";
    const ORDER_BY: &'static str = "created_at, id";
    const LABEL: &'static str = "Link";

    type Row = LinkRow;

    fn row_id(row: &LinkRow) -> Uuid {
        row.id
    }

    fn from_row(row: &LinkRow) -> Self {
        LinkInput {
            platform: LinkPlatform::parse(&row.platform).unwrap_or(LinkPlatform::Other),
            url: row.url.clone(),
        }
    }

    fn check_collection(prefix: &str, items: &[Self]) -> Vec<FieldError> {
        duplicate_platforms(items)
            .into_iter()
            .map(|platform| {
                FieldError::new(
                    prefix,
                    format!("only one {} link is allowed", platform.as_str()),
                )
            })
            .collect()
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
            INSERT INTO links (id, user_id, platform, url, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $5)
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(item.platform.as_str())
        .bind(item.url.trim())
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
            UPDATE links
            SET platform = $1, url = $2, updated_by = $3, updated_at = NOW()
            WHERE id = $4 AND user_id = $5 AND is_active
            "#,
        )
        .bind(item.platform.as_str())
        .bind(item.url.trim())
        .bind(actor)
        .bind(id)
        .bind(owner)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }
}

/// Platforms other than `other` may appear at most once in a profile.
pub fn duplicate_platforms(links: &[LinkInput]) -> Vec<LinkPlatform> {
    let mut seen = Vec::new();
    let mut dupes = Vec::new();
    for link in links.iter().filter(|l| l.platform != LinkPlatform::Other) {
        if seen.contains(&link.platform) {
            if !dupes.contains(&link.platform) {
                dupes.push(link.platform);
            }
        } else {
            seen.push(link.platform);
        }
    }
    dupes
}
