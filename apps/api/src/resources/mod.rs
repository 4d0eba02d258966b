//! Batch editing of profile sub-resources.
//!
//! Every editable list (skills, education, certificates, experience,
//! projects, links and a job's extra questions) implements [`BatchResource`].
//! A [`BatchUpdate`] is checked up front, then applied inside one
//! transaction: inserts, updates of live rows, and soft-deletes. A single
//! miss rolls the whole batch back.

pub mod certificates;
pub mod education;
pub mod experience;
pub mod handlers;
pub mod links;
pub mod projects;
pub mod questions;
pub mod skills;

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::errors::AppError;
use crate::pending::{BatchUpdate, PendingChanges, SyncItem};
use crate::validation::{check, FieldError};

pub use certificates::CertificateInput;
pub use education::EducationInput;
pub use experience::ExperienceInput;
pub use links::LinkInput;
pub use projects::ProjectInput;
pub use questions::JobQuestionInput;
pub use skills::SkillInput;

pub const MAX_BATCH_OPERATIONS: usize = 100;

#[async_trait]
pub trait BatchResource:
    Validate + Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const TABLE: &'static str;
    /// Column holding the owning user (or job, for extra questions).
    const OWNER_COLUMN: &'static str;
    const ORDER_BY: &'static str;
    /// Human-readable singular name used in messages.
    const LABEL: &'static str;

    type Row: for<'r> FromRow<'r, PgRow> + Serialize + Send + Sync + Unpin + 'static;

    fn row_id(row: &Self::Row) -> Uuid;

    fn from_row(row: &Self::Row) -> Self;

    /// Checks that need the acting user, such as ownership of referenced files.
    fn check_references(&self, _prefix: &str, _actor: Uuid) -> Vec<FieldError> {
        Vec::new()
    }

    /// Rules over a complete list, such as uniqueness. Runs on full-list saves.
    fn check_collection(_prefix: &str, _items: &[Self]) -> Vec<FieldError> {
        Vec::new()
    }

    async fn insert(
        conn: &mut PgConnection,
        owner: Uuid,
        actor: Uuid,
        item: &Self,
    ) -> sqlx::Result<Uuid>;

    /// Overwrites a live row; returns the number of rows touched.
    async fn update(
        conn: &mut PgConnection,
        owner: Uuid,
        actor: Uuid,
        id: Uuid,
        item: &Self,
    ) -> sqlx::Result<u64>;
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BatchOutcome {
    pub created: Vec<Uuid>,
    pub updated: Vec<Uuid>,
    pub deleted: Vec<Uuid>,
}

/// Structural and field checks run before any database work.
pub fn validate_batch<R: BatchResource>(
    batch: &BatchUpdate<R>,
    actor: Uuid,
) -> Result<(), AppError> {
    if batch.len() > MAX_BATCH_OPERATIONS {
        return Err(AppError::Validation(format!(
            "A batch may contain at most {MAX_BATCH_OPERATIONS} operations"
        )));
    }

    let mut seen = HashSet::new();
    for id in batch.updated.iter().map(|u| u.id).chain(batch.deleted.iter().copied()) {
        if !seen.insert(id) {
            return Err(AppError::Validation(format!(
                "{} {id} appears more than once in the batch",
                R::LABEL
            )));
        }
    }

    let mut errors = Vec::new();
    for (i, item) in batch.new.iter().enumerate() {
        let prefix = format!("new[{i}]");
        errors.extend(check(&prefix, item));
        errors.extend(item.check_references(&prefix, actor));
    }
    for (i, item) in batch.updated.iter().enumerate() {
        let prefix = format!("updated[{i}]");
        errors.extend(check(&prefix, &item.data));
        errors.extend(item.data.check_references(&prefix, actor));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::InvalidFields(errors))
    }
}

/// Applies a batch on an open connection or transaction.
pub async fn apply_batch_in<R: BatchResource>(
    conn: &mut PgConnection,
    owner: Uuid,
    actor: Uuid,
    batch: &BatchUpdate<R>,
) -> Result<BatchOutcome, AppError> {
    let mut outcome = BatchOutcome::default();

    for item in &batch.new {
        outcome.created.push(R::insert(conn, owner, actor, item).await?);
    }

    for item in &batch.updated {
        let touched = R::update(conn, owner, actor, item.id, &item.data).await?;
        if touched == 0 {
            return Err(AppError::NotFound(format!("{} {} not found", R::LABEL, item.id)));
        }
        outcome.updated.push(item.id);
    }

    if !batch.deleted.is_empty() {
        let sql = format!(
            "UPDATE {} SET is_active = FALSE, updated_by = $1, updated_at = NOW() \
             WHERE {} = $2 AND is_active AND id = ANY($3)",
            R::TABLE,
            R::OWNER_COLUMN
        );
        let result = sqlx::query(&sql)
            .bind(actor)
            .bind(owner)
            .bind(batch.deleted.as_slice())
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() != batch.deleted.len() as u64 {
            return Err(AppError::NotFound(format!(
                "One or more {} records to delete were not found",
                R::LABEL
            )));
        }
        outcome.deleted.extend(batch.deleted.iter().copied());
    }

    Ok(outcome)
}

/// Validates and applies a batch in its own transaction.
pub async fn apply_batch<R: BatchResource>(
    pool: &PgPool,
    owner: Uuid,
    actor: Uuid,
    batch: &BatchUpdate<R>,
) -> Result<BatchOutcome, AppError> {
    validate_batch(batch, actor)?;
    if batch.is_empty() {
        return Ok(BatchOutcome::default());
    }

    let mut tx = pool.begin().await?;
    // Dropping `tx` on an early return rolls the batch back.
    let outcome = apply_batch_in(&mut tx, owner, actor, batch).await?;
    tx.commit().await?;

    info!(
        "Applied {} batch for owner {owner}: {} created, {} updated, {} deleted",
        R::TABLE,
        outcome.created.len(),
        outcome.updated.len(),
        outcome.deleted.len()
    );
    Ok(outcome)
}

/// Active rows for an owner, in the resource's display order.
pub async fn list_active<R: BatchResource>(
    pool: &PgPool,
    owner: Uuid,
) -> Result<Vec<R::Row>, AppError> {
    let sql = format!(
        "SELECT * FROM {} WHERE {} = $1 AND is_active ORDER BY {}",
        R::TABLE,
        R::OWNER_COLUMN,
        R::ORDER_BY
    );
    Ok(sqlx::query_as::<_, R::Row>(&sql)
        .bind(owner)
        .fetch_all(pool)
        .await?)
}

/// Computes the batch that turns the stored list into `desired`.
pub async fn plan_sync<R: BatchResource>(
    pool: &PgPool,
    owner: Uuid,
    desired: Vec<SyncItem<R>>,
) -> Result<BatchUpdate<R>, AppError> {
    let rows = list_active::<R>(pool, owner).await?;
    let original = rows.iter().map(|row| (R::row_id(row), R::from_row(row))).collect();
    Ok(PendingChanges::diff(original, desired)?)
}

/// Trims a required string and collapses blank optional strings to `None`.
pub(crate) fn clean_optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
