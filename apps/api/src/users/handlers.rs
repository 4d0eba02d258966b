//! Axum route handlers for the caller's account.

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    find_candidate_profile, find_user, require_onboarded, upsert_candidate_profile,
    username_taken, PersonalInfo, UsernameAvailability,
};
use crate::auth::{AuthUser, Role};
use crate::errors::{conflict_on_unique, AppError};
use crate::extract::{ApiJson, ApiQuery};
use crate::models::user::{CandidateProfileRow, RecruiterProfileRow, UserRow};
use crate::onboarding::Step;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::storage::{promote, Folder};
use crate::validation::check;

#[derive(Debug, Deserialize)]
pub struct AvailabilityParams {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: uuid::Uuid,
    pub role: Role,
    pub onboarded: bool,
    /// First onboarding step for callers who have not finished it.
    pub next_step: Option<Step>,
    pub user: Option<UserRow>,
    pub candidate_profile: Option<CandidateProfileRow>,
    pub recruiter_profile: Option<RecruiterProfileRow>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserRow,
    pub profile: CandidateProfileRow,
    pub avatar_url: Option<String>,
}

/// GET /api/v1/users/username-availability?username=
///
/// Malformed names are answered without a lookup.
pub async fn handle_username_availability(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(params): ApiQuery<AvailabilityParams>,
) -> Result<ApiResponse<UsernameAvailability>, AppError> {
    let username = params.username.trim();
    if let Some(verdict) = UsernameAvailability::from_format(username) {
        return Ok(ApiResponse::ok(verdict));
    }

    let taken = username_taken(&state.db, username, user.id).await?;
    Ok(ApiResponse::ok(UsernameAvailability {
        username: username.to_string(),
        available: !taken,
        reason: taken.then(|| "This username is already taken".to_string()),
    }))
}

/// GET /api/v1/me
pub async fn handle_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<ApiResponse<MeResponse>, AppError> {
    let row = find_user(&state.db, user.id).await?;
    let onboarded = row.as_ref().is_some_and(|r| r.onboarded_at.is_some());

    let (candidate_profile, recruiter_profile) = match user.role {
        Role::Candidate => (find_candidate_profile(&state.db, user.id).await?, None),
        Role::Recruiter => (
            None,
            sqlx::query_as::<_, RecruiterProfileRow>(
                "SELECT * FROM recruiter_profiles WHERE user_id = $1",
            )
            .bind(user.id)
            .fetch_optional(&state.db)
            .await?,
        ),
    };
    let avatar_url = candidate_profile
        .as_ref()
        .and_then(|p| p.avatar_path.as_deref())
        .map(|path| state.storage.public_url(path));
    let next_step = match (onboarded, user.role) {
        (false, Role::Candidate) => Some(Step::first()),
        _ => None,
    };

    Ok(ApiResponse::ok(MeResponse {
        id: user.id,
        role: user.role,
        onboarded,
        next_step,
        user: row,
        candidate_profile,
        recruiter_profile,
        avatar_url,
    }))
}

/// PUT /api/v1/profile
///
/// Edits the personal info of an onboarded candidate.
pub async fn handle_update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(mut info): ApiJson<PersonalInfo>,
) -> Result<ApiResponse<ProfileResponse>, AppError> {
    user.require_candidate()?;

    let mut errors = check("", &info);
    errors.extend(info.check_references("", user.id));
    if !errors.is_empty() {
        return Err(AppError::InvalidFields(errors));
    }

    require_onboarded(&state.db, &user).await?;
    if username_taken(&state.db, info.username.trim(), user.id).await? {
        return Err(AppError::Conflict("This username is already taken".to_string()));
    }

    if let Some(path) = info.avatar_path.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        let promotion = promote(state.storage.as_ref(), user.id, path, Folder::ProfileImages).await?;
        info.avatar_path = Some(promotion.to);
    }

    let mut tx = state.db.begin().await?;
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        UPDATE users
        SET username = $1, full_name = $2, email = $3, updated_at = NOW()
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(info.username.trim())
    .bind(info.full_name.trim())
    .bind(info.email.as_deref().map(str::trim))
    .bind(user.id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| conflict_on_unique(e, "This username is already taken"))?;
    let profile = upsert_candidate_profile(&mut tx, user.id, &info).await?;
    tx.commit().await?;

    info!("User {} updated their profile", user.id);

    Ok(ApiResponse::ok(ProfileResponse {
        avatar_url: profile
            .avatar_path
            .as_deref()
            .map(|path| state.storage.public_url(path)),
        user: row,
        profile,
    }))
}
