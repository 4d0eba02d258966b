use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{clean_optional, BatchResource};
use crate::models::profile::CertificateRow;
use crate::pending::BatchUpdate;
use crate::storage::{promote, FileStore, Folder, StorageError};
use crate::validation::{
    dates_ordered, is_optional_http_url, path_owned_by, rule, validate_not_blank, FieldError,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[validate(schema(function = "check_certificate"))]
pub struct CertificateInput {
    #[validate(length(min = 1, max = 150), custom(function = "validate_not_blank"))]
    pub name: String,
    #[validate(length(min = 1, max = 150), custom(function = "validate_not_blank"))]
    pub issuer: String,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub credential_url: Option<String>,
    /// Storage key of the uploaded certificate file, temp or permanent.
    #[serde(default)]
    pub file_path: Option<String>,
}

fn check_certificate(input: &CertificateInput) -> Result<(), ValidationError> {
    if !dates_ordered(input.issue_date, input.expiry_date) {
        return Err(rule("expiry_date", "must not be before issue_date"));
    }
    if !is_optional_http_url(input.credential_url.as_deref()) {
        return Err(rule("credential_url", "must be an http(s) URL"));
    }
    Ok(())
}

impl CertificateInput {
    /// Promotes a temp upload into the certificates folder and points the record at it.
    pub async fn finalize_file(
        &mut self,
        store: &dyn FileStore,
        user_id: Uuid,
    ) -> Result<(), StorageError> {
        if let Some(path) = clean_optional(&self.file_path) {
            let promotion = promote(store, user_id, &path, Folder::Certificates).await?;
            self.file_path = Some(promotion.to);
        }
        Ok(())
    }
}

/// Finalizes every file referenced by a certificate batch.
pub async fn finalize_batch_files(
    batch: &mut BatchUpdate<CertificateInput>,
    store: &dyn FileStore,
    user_id: Uuid,
) -> Result<(), StorageError> {
    for item in batch.new.iter_mut() {
        item.finalize_file(store, user_id).await?;
    }
    for item in batch.updated.iter_mut() {
        item.data.finalize_file(store, user_id).await?;
    }
    Ok(())
}

#[async_trait]
impl BatchResource for CertificateInput {
    const TABLE: &'static str = "certificates";
    const OWNER_COLUMN: &'static str = "user_id";
    const ORDER_BY: &'static str = "issue_date DESC NULLS LAST, created_at, id";
    const LABEL: &'static str = "Certificate";

    type Row = CertificateRow;

    fn row_id(row: &CertificateRow) -> Uuid {
        row.id
    }

    fn from_row(row: &CertificateRow) -> Self {
        CertificateInput {
            name: row.name.clone(),
            issuer: row.issuer.clone(),
            issue_date: row.issue_date,
            expiry_date: row.expiry_date,
            credential_url: row.credential_url.clone(),
            file_path: row.file_path.clone(),
        }
    }

    fn check_references(&self, prefix: &str, actor: Uuid) -> Vec<FieldError> {
        match clean_optional(&self.file_path) {
            Some(path) if !path_owned_by(&path, actor) => vec![FieldError::new(
                format!("{prefix}.file_path"),
                "must reference a file uploaded by you",
            )],
            _ => Vec::new(),
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
            INSERT INTO certificates
                (id, user_id, name, issuer, issue_date, expiry_date,
                 credential_url, file_path, created_by, updated_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(item.name.trim())
        .bind(item.issuer.trim())
        .bind(item.issue_date)
        .bind(item.expiry_date)
        .bind(clean_optional(&item.credential_url))
        .bind(clean_optional(&item.file_path))
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
            UPDATE certificates
            SET name = $1, issuer = $2, issue_date = $3, expiry_date = $4,
                credential_url = $5, file_path = $6, updated_by = $7, updated_at = NOW()
            WHERE id = $8 AND user_id = $9 AND is_active
            "#,
        )
        .bind(item.name.trim())
        .bind(item.issuer.trim())
        .bind(item.issue_date)
        .bind(item.expiry_date)
        .bind(clean_optional(&item.credential_url))
        .bind(clean_optional(&item.file_path))
        .bind(actor)
        .bind(id)
        .bind(owner)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected())
    }
}
