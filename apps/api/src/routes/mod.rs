pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::applications::handlers as applications;
use crate::jobs::handlers as jobs;
use crate::onboarding::handlers as onboarding;
use crate::portfolio::handle_portfolio;
use crate::resources::handlers::{
    handle_batch, handle_certificate_batch, handle_certificate_sync, handle_list, handle_sync,
};
use crate::resources::{
    BatchResource, CertificateInput, EducationInput, ExperienceInput, LinkInput, ProjectInput,
    SkillInput,
};
use crate::state::AppState;
use crate::storage::handlers as files;
use crate::users::handlers as users;

/// Multipart framing on top of the largest accepted file.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// `GET` / `PUT /api/v1/{resource}` and `POST /api/v1/{resource}/batch`.
fn profile_list<R: BatchResource>(router: Router<AppState>, resource: &str) -> Router<AppState> {
    router
        .route(
            &format!("/api/v1/{resource}"),
            get(handle_list::<R>).put(handle_sync::<R>),
        )
        .route(&format!("/api/v1/{resource}/batch"), post(handle_batch::<R>))
}

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    let router = Router::new()
        .route("/health", get(health::health_handler))
        // Account
        .route("/api/v1/me", get(users::handle_me))
        .route("/api/v1/profile", put(users::handle_update_profile))
        .route(
            "/api/v1/users/username-availability",
            get(users::handle_username_availability),
        )
        // Onboarding
        .route(
            "/api/v1/onboarding/candidate",
            post(onboarding::handle_candidate_onboarding),
        )
        .route(
            "/api/v1/onboarding/candidate/steps/:step/validate",
            post(onboarding::handle_validate_step),
        )
        .route(
            "/api/v1/onboarding/recruiter",
            post(onboarding::handle_recruiter_onboarding),
        )
        // Files
        .route(
            "/api/v1/files/upload",
            post(files::handle_upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/v1/files", delete(files::handle_delete))
        .route("/api/v1/files/finalize", post(files::handle_finalize))
        .route("/api/v1/files/cleanup", post(files::handle_cleanup))
        // Certificates promote their files, so they get dedicated handlers
        .route(
            "/api/v1/certificates",
            get(handle_list::<CertificateInput>).put(handle_certificate_sync),
        )
        .route("/api/v1/certificates/batch", post(handle_certificate_batch))
        // Jobs
        .route("/api/v1/jobs", get(jobs::handle_list_jobs).post(jobs::handle_create_job))
        .route("/api/v1/jobs/:id", get(jobs::handle_get_job))
        .route("/api/v1/jobs/:id/status", patch(jobs::handle_update_job_status))
        .route("/api/v1/jobs/:id/questions", get(jobs::handle_list_questions))
        .route(
            "/api/v1/jobs/:id/questions/batch",
            post(jobs::handle_question_batch),
        )
        .route("/api/v1/recruiter/jobs", get(jobs::handle_recruiter_jobs))
        // Applications
        .route("/api/v1/jobs/:id/apply", post(applications::handle_apply))
        .route("/api/v1/jobs/:id/board", get(applications::handle_board))
        .route("/api/v1/applications", get(applications::handle_my_applications))
        .route(
            "/api/v1/applications/:id/status",
            patch(applications::handle_move_application),
        )
        // Public
        .route("/api/portfolio/:username", get(handle_portfolio));

    let router = profile_list::<SkillInput>(router, "skills");
    let router = profile_list::<EducationInput>(router, "education");
    let router = profile_list::<ExperienceInput>(router, "experience");
    let router = profile_list::<ProjectInput>(router, "projects");
    let router = profile_list::<LinkInput>(router, "links");

    router.with_state(state)
}
