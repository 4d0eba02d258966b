//! Users, personal info and username rules.

pub mod handlers;

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::auth::{AuthUser, Role};
use crate::errors::AppError;
use crate::models::user::{CandidateProfileRow, UserRow};
use crate::resources::clean_optional;
use crate::validation::{
    path_owned_by, rule, username_problem, validate_not_blank, validate_phone, validate_username,
    FieldError,
};

/// The personal step of candidate onboarding, also used for later profile edits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[validate(schema(function = "check_personal"))]
pub struct PersonalInfo {
    #[validate(length(min = 2, max = 100), custom(function = "validate_not_blank"))]
    pub full_name: String,
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    #[serde(default)]
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default)]
    #[validate(length(max = 120))]
    pub headline: Option<String>,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub bio: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub location: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Storage key of the uploaded profile image.
    #[serde(default)]
    pub avatar_path: Option<String>,
}

fn check_personal(info: &PersonalInfo) -> Result<(), ValidationError> {
    if let Some(phone) = clean_optional(&info.phone) {
        if validate_phone(&phone).is_err() {
            return Err(rule(
                "phone",
                "must be 7-20 characters of digits, spaces, +, -, ( or )",
            ));
        }
    }
    Ok(())
}

impl PersonalInfo {
    pub fn check_references(&self, prefix: &str, actor: Uuid) -> Vec<FieldError> {
        match clean_optional(&self.avatar_path) {
            Some(path) if !path_owned_by(&path, actor) => vec![FieldError::new(
                join_field(prefix, "avatar_path"),
                "must reference a file uploaded by you",
            )],
            _ => Vec::new(),
        }
    }
}

fn join_field(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct UsernameAvailability {
    pub username: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl UsernameAvailability {
    /// Format verdict; `None` means the name is well-formed and needs a lookup.
    pub fn from_format(username: &str) -> Option<Self> {
        username_problem(username).map(|reason| UsernameAvailability {
            username: username.to_string(),
            available: false,
            reason: Some(reason.to_string()),
        })
    }
}

pub async fn find_user(pool: &PgPool, id: Uuid) -> Result<Option<UserRow>, AppError> {
    Ok(sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn find_candidate_profile(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<CandidateProfileRow>, AppError> {
    Ok(
        sqlx::query_as::<_, CandidateProfileRow>("SELECT * FROM candidate_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?,
    )
}

/// True when another user already holds `username`, ignoring case.
pub async fn username_taken(pool: &PgPool, username: &str, except: Uuid) -> Result<bool, AppError> {
    Ok(sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(username) = LOWER($1) AND id <> $2)",
    )
    .bind(username)
    .bind(except)
    .fetch_one(pool)
    .await?)
}

/// Loads the caller's user row, rejecting callers who have not finished onboarding.
pub async fn require_onboarded(pool: &PgPool, user: &AuthUser) -> Result<UserRow, AppError> {
    match find_user(pool, user.id).await? {
        Some(row) if row.onboarded_at.is_some() && row.role == user.role.as_str() => Ok(row),
        _ => Err(AppError::Forbidden("Complete onboarding first".to_string())),
    }
}

/// Creates the user row, or claims a previous unfinished attempt.
///
/// Returns `None` when the user is already onboarded.
pub async fn claim_user(
    conn: &mut PgConnection,
    id: Uuid,
    role: Role,
    username: &str,
    full_name: &str,
    email: Option<&str>,
) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(
        r#"
        INSERT INTO users (id, username, email, role, full_name)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (id) DO UPDATE
            SET username = EXCLUDED.username,
                email = EXCLUDED.email,
                role = EXCLUDED.role,
                full_name = EXCLUDED.full_name,
                updated_at = NOW()
            WHERE users.onboarded_at IS NULL
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(username.trim())
    .bind(email.map(str::trim))
    .bind(role.as_str())
    .bind(full_name.trim())
    .fetch_optional(&mut *conn)
    .await
}

pub async fn mark_onboarded(conn: &mut PgConnection, id: Uuid) -> Result<UserRow, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(
        "UPDATE users SET onboarded_at = NOW(), updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await
}

/// Writes the candidate profile row; `avatar_path` must already be promoted.
pub async fn upsert_candidate_profile(
    conn: &mut PgConnection,
    user_id: Uuid,
    info: &PersonalInfo,
) -> Result<CandidateProfileRow, sqlx::Error> {
    sqlx::query_as::<_, CandidateProfileRow>(
        r#"
        INSERT INTO candidate_profiles (user_id, headline, bio, location, phone, avatar_path)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (user_id) DO UPDATE
            SET headline = EXCLUDED.headline,
                bio = EXCLUDED.bio,
                location = EXCLUDED.location,
                phone = EXCLUDED.phone,
                avatar_path = EXCLUDED.avatar_path,
                updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(clean_optional(&info.headline))
    .bind(clean_optional(&info.bio))
    .bind(clean_optional(&info.location))
    .bind(clean_optional(&info.phone))
    .bind(clean_optional(&info.avatar_path))
    .fetch_one(&mut *conn)
    .await
}
