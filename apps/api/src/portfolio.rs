//! Public, read-only portfolio of an onboarded candidate.

use axum::extract::State;
use serde::Serialize;

use crate::errors::AppError;
use crate::extract::ApiPath;
use crate::models::profile::{
    CertificateRow, EducationRow, ExperienceRow, LinkRow, ProjectRow, SkillRow,
};
use crate::models::user::{CandidateProfileRow, UserRow};
use crate::resources::{
    list_active, CertificateInput, EducationInput, ExperienceInput, LinkInput, ProjectInput,
    SkillInput,
};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::storage::FileStore;
use crate::users::find_candidate_profile;

/// Public subset of the user row. Email and audit fields stay private.
#[derive(Debug, Serialize)]
pub struct PortfolioOwner {
    pub username: String,
    pub full_name: String,
}

#[derive(Debug, Serialize)]
pub struct PortfolioProfile {
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PortfolioCertificate {
    #[serde(flatten)]
    pub certificate: CertificateRow,
    pub file_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Portfolio {
    pub user: PortfolioOwner,
    pub profile: Option<PortfolioProfile>,
    pub skills: Vec<SkillRow>,
    pub education: Vec<EducationRow>,
    pub experience: Vec<ExperienceRow>,
    pub projects: Vec<ProjectRow>,
    pub certificates: Vec<PortfolioCertificate>,
    pub links: Vec<LinkRow>,
}

fn public_profile(profile: CandidateProfileRow, store: &dyn FileStore) -> PortfolioProfile {
    PortfolioProfile {
        avatar_url: profile.avatar_path.as_deref().map(|p| store.public_url(p)),
        headline: profile.headline,
        bio: profile.bio,
        location: profile.location,
    }
}

fn with_file_urls(rows: Vec<CertificateRow>, store: &dyn FileStore) -> Vec<PortfolioCertificate> {
    rows.into_iter()
        .map(|certificate| PortfolioCertificate {
            file_url: certificate.file_path.as_deref().map(|p| store.public_url(p)),
            certificate,
        })
        .collect()
}

/// GET /api/portfolio/:username
pub async fn handle_portfolio(
    State(state): State<AppState>,
    ApiPath(username): ApiPath<String>,
) -> Result<ApiResponse<Portfolio>, AppError> {
    let user = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT * FROM users
        WHERE LOWER(username) = LOWER($1) AND role = 'candidate' AND onboarded_at IS NOT NULL
        "#,
    )
    .bind(username.trim())
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Portfolio {username} not found")))?;

    let db = &state.db;
    let (profile, skills, education, experience, projects, certificates, links) = tokio::try_join!(
        find_candidate_profile(db, user.id),
        list_active::<SkillInput>(db, user.id),
        list_active::<EducationInput>(db, user.id),
        list_active::<ExperienceInput>(db, user.id),
        list_active::<ProjectInput>(db, user.id),
        list_active::<CertificateInput>(db, user.id),
        list_active::<LinkInput>(db, user.id),
    )?;

    let store = state.storage.as_ref();
    Ok(ApiResponse::ok(Portfolio {
        user: PortfolioOwner {
            username: user.username,
            full_name: user.full_name,
        },
        profile: profile.map(|p| public_profile(p, store)),
        skills,
        education,
        experience,
        projects,
        certificates: with_file_urls(certificates, store),
        links,
    }))
}
