//! End-to-end tests against PostgreSQL. Run with
//! `DATABASE_URL=postgres://... cargo test -- --ignored`.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

use cofounds_api::applications::{move_status, ApplicationStatus};
use common::{candidate_payload, Caller, TestContext};

fn ids(rows: &Value) -> Vec<String> {
    rows.as_array()
        .unwrap()
        .iter()
        .map(|row| row["id"].as_str().unwrap().to_string())
        .collect()
}

fn names(rows: &Value) -> Vec<String> {
    rows.as_array()
        .unwrap()
        .iter()
        .map(|row| row["name"].as_str().unwrap().to_string())
        .collect()
}

async fn skills(ctx: &TestContext, caller: Caller) -> Value {
    let (status, body) = ctx.send(Method::GET, "/api/v1/skills", Some(caller), None).await;
    assert_eq!(status, StatusCode::OK);
    body["data"].clone()
}

fn questions(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| json!({"question": format!("Question number {i}?"), "position": i}))
        .collect()
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL instance
async fn test_batch_rolls_back_when_a_record_is_missing() {
    let ctx = TestContext::new().await.unwrap();
    let (candidate, _) = ctx.onboard_candidate().await;

    let before = skills(&ctx, candidate).await;
    assert_eq!(names(&before), vec!["Rust"]);
    assert_eq!(before[0]["created_by"], candidate.id.to_string());

    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/v1/skills/batch",
            Some(candidate),
            Some(json!({"new": [{"name": "Go"}], "deleted": [Uuid::new_v4()]})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(names(&skills(&ctx, candidate).await), vec!["Rust"]);

    // Another candidate cannot touch the row either.
    let (other, _) = ctx.onboard_candidate().await;
    let rust = before[0]["id"].as_str().unwrap();
    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/v1/skills/batch",
            Some(other),
            Some(json!({"updated": [{"id": rust, "name": "Rustlang"}]})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/v1/skills/batch",
            Some(candidate),
            Some(json!({"updated": [{"id": rust, "name": "Rust", "level": "expert"}]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["updated"], json!([rust]));

    let after = skills(&ctx, candidate).await;
    assert_eq!(after[0]["level"], "expert");
    assert_eq!(after[0]["updated_by"], candidate.id.to_string());
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL instance
async fn test_soft_deleted_rows_leave_lists_and_portfolio() {
    let ctx = TestContext::new().await.unwrap();
    let (candidate, username) = ctx.onboard_candidate().await;
    let rust = ids(&skills(&ctx, candidate).await).remove(0);

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/v1/skills/batch",
            Some(candidate),
            Some(json!({"new": [{"name": "Go"}], "deleted": [rust]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(names(&skills(&ctx, candidate).await), vec!["Go"]);

    let still_stored: bool = sqlx::query_scalar("SELECT is_active FROM skills WHERE id = $1")
        .bind(Uuid::parse_str(&rust).unwrap())
        .fetch_one(&ctx.db)
        .await
        .unwrap();
    assert!(!still_stored);

    let (status, body) = ctx
        .send(Method::GET, &format!("/api/portfolio/{}", username.to_uppercase()), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body["data"]["skills"]), vec!["Go"]);
    assert!(body["data"]["profile"].get("phone").is_none());
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL instance
async fn test_sync_replaces_the_list() {
    let ctx = TestContext::new().await.unwrap();
    let (candidate, _) = ctx.onboard_candidate().await;
    let rust = ids(&skills(&ctx, candidate).await).remove(0);

    let (status, _) = ctx
        .send(
            Method::PUT,
            "/api/v1/skills",
            Some(candidate),
            Some(json!({"items": [
                {"id": rust, "name": "Rust"},
                {"id": rust, "name": "Go"}
            ]})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(names(&skills(&ctx, candidate).await), vec!["Rust"]);

    let (status, body) = ctx
        .send(
            Method::PUT,
            "/api/v1/skills",
            Some(candidate),
            Some(json!({"items": [{"name": "Go"}, {"name": "Zig"}]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["deleted"], json!([rust]));
    // Rows inserted in one transaction share `created_at`.
    let mut kept = names(&skills(&ctx, candidate).await);
    kept.sort();
    assert_eq!(kept, vec!["Go", "Zig"]);
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL instance
async fn test_second_onboarding_is_conflict() {
    let ctx = TestContext::new().await.unwrap();
    let (candidate, username) = ctx.onboard_candidate().await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/v1/onboarding/candidate",
            Some(candidate),
            Some(candidate_payload(&username)),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
    assert_eq!(names(&skills(&ctx, candidate).await), vec!["Rust"]);

    // Someone else cannot take the name.
    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/v1/onboarding/candidate",
            Some(Caller::candidate()),
            Some(candidate_payload(&username)),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL instance
async fn test_second_application_is_conflict() {
    let ctx = TestContext::new().await.unwrap();
    let recruiter = ctx.onboard_recruiter().await;
    let job = ctx
        .post_job(
            recruiter,
            vec![json!({"question": "Why do you want to join?", "is_required": true})],
        )
        .await;
    let job_id = job["id"].as_str().unwrap();
    let question_id = job["questions"][0]["id"].as_str().unwrap();
    let (candidate, _) = ctx.onboard_candidate().await;
    let apply = format!("/api/v1/jobs/{job_id}/apply");

    let (status, body) = ctx
        .send(Method::POST, &apply, Some(candidate), Some(json!({"answers": []})))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], format!("answers.{question_id}"));

    let answers = json!({"answers": [{"question_id": question_id, "answer": " I like Rust "}]});
    let (status, body) = ctx
        .send(Method::POST, &apply, Some(candidate), Some(answers.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "applied");
    assert_eq!(body["data"]["answers"][0]["answer"], "I like Rust");

    let (status, body) = ctx
        .send(Method::POST, &apply, Some(candidate), Some(answers))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "You have already applied to this job");
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL instance
async fn test_board_moves_and_hired_is_terminal() {
    let ctx = TestContext::new().await.unwrap();
    let recruiter = ctx.onboard_recruiter().await;
    let job = ctx.post_job(recruiter, Vec::new()).await;
    let job_id = job["id"].as_str().unwrap();
    let (candidate, _) = ctx.onboard_candidate().await;

    let (_, body) = ctx
        .send(
            Method::POST,
            &format!("/api/v1/jobs/{job_id}/apply"),
            Some(candidate),
            Some(json!({})),
        )
        .await;
    let application_id = body["data"]["id"].as_str().unwrap().to_string();
    let move_to = |status: &str| json!({ "status": status });
    let uri = format!("/api/v1/applications/{application_id}/status");

    // Only the job's recruiter moves cards.
    let stranger = ctx.onboard_recruiter().await;
    let (status, _) = ctx
        .send(Method::PATCH, &uri, Some(stranger), Some(move_to("shortlisted")))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = ctx
        .send(Method::PATCH, &uri, Some(recruiter), Some(move_to("hired")))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "hired");

    let (status, _) = ctx
        .send(Method::PATCH, &uri, Some(recruiter), Some(move_to("hired")))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = ctx
        .send(Method::PATCH, &uri, Some(recruiter), Some(move_to("rejected")))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = ctx
        .send(Method::GET, &format!("/api/v1/jobs/{job_id}/board"), Some(recruiter), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let hired = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|column| column["status"] == "hired")
        .unwrap();
    assert_eq!(ids(&hired["cards"]), vec![application_id]);
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL instance
async fn test_stale_move_is_not_applied() {
    let ctx = TestContext::new().await.unwrap();
    let recruiter = ctx.onboard_recruiter().await;
    let job = ctx.post_job(recruiter, Vec::new()).await;
    let (candidate, _) = ctx.onboard_candidate().await;
    let (_, body) = ctx
        .send(
            Method::POST,
            &format!("/api/v1/jobs/{}/apply", job["id"].as_str().unwrap()),
            Some(candidate),
            Some(json!({})),
        )
        .await;
    let id = Uuid::parse_str(body["data"]["id"].as_str().unwrap()).unwrap();

    use ApplicationStatus::*;
    let moved = move_status(&ctx.db, id, Applied, Shortlisted, recruiter.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(moved.status, "shortlisted");
    assert_eq!(moved.updated_by, recruiter.id);

    // A second writer that still believes the card is in `applied`.
    let stale = move_status(&ctx.db, id, Applied, Rejected, recruiter.id)
        .await
        .unwrap();
    assert!(stale.is_none());
}

#[tokio::test]
#[ignore] // Requires a running PostgreSQL instance
async fn test_question_cap_holds_across_batches() {
    let ctx = TestContext::new().await.unwrap();
    let recruiter = ctx.onboard_recruiter().await;
    let job = ctx.post_job(recruiter, questions(20)).await;
    let job_id = job["id"].as_str().unwrap();
    let uri = format!("/api/v1/jobs/{job_id}/questions/batch");
    let extra = json!({"question": "One question too many?"});

    let (status, _) = ctx
        .send(Method::POST, &uri, Some(recruiter), Some(json!({"new": [extra]})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let first = job["questions"][0]["id"].as_str().unwrap();
    let (status, body) = ctx
        .send(
            Method::POST,
            &uri,
            Some(recruiter),
            Some(json!({"new": [extra], "deleted": [first]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = ctx
        .send(Method::GET, &format!("/api/v1/jobs/{job_id}/questions"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let listed = body["data"].as_array().unwrap();
    assert_eq!(listed.len(), 20);
    assert!(listed.iter().all(|q| q["id"] != first));
}
