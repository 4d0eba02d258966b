#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use cofounds_api::auth::{USER_ID_HEADER, USER_ROLE_HEADER};
use cofounds_api::config::Config;
use cofounds_api::db::{create_pool, lazy_pool};
use cofounds_api::routes::build_router;
use cofounds_api::state::AppState;
use cofounds_api::storage::MemoryFileStore;

pub const FILES_BASE_URL: &str = "http://localhost:9000/cofounds-test";

/// Router over an in-memory bucket and a pool that never connects unless queried.
pub fn test_app() -> (Router, Arc<MemoryFileStore>) {
    let config = Config::for_tests();
    let store = Arc::new(MemoryFileStore::new(FILES_BASE_URL));
    let db = lazy_pool(&config.database_url, config.db_max_connections).unwrap();
    let state = AppState {
        db,
        storage: store.clone(),
        config,
    };
    (build_router(state), store)
}

#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub id: Uuid,
    pub role: &'static str,
}

impl Caller {
    pub fn candidate() -> Self {
        Caller {
            id: Uuid::new_v4(),
            role: "candidate",
        }
    }

    pub fn recruiter() -> Self {
        Caller {
            id: Uuid::new_v4(),
            role: "recruiter",
        }
    }
}

pub fn json_request(method: Method, uri: &str, caller: Option<Caller>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(caller) = caller {
        builder = builder
            .header(USER_ID_HEADER, caller.id.to_string())
            .header(USER_ROLE_HEADER, caller.role);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn multipart_upload(caller: Caller, file_name: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
    let boundary = "cofounds-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/api/v1/files/upload")
        .header(USER_ID_HEADER, caller.id.to_string())
        .header(USER_ROLE_HEADER, caller.role)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Lowercase, letter-first and unique per call.
pub fn unique_username() -> String {
    format!("u{}", &Uuid::new_v4().simple().to_string()[..12])
}

/// Router over a migrated PostgreSQL database, taken from `DATABASE_URL`.
pub struct TestContext {
    pub db: PgPool,
    pub app: Router,
    pub store: Arc<MemoryFileStore>,
}

impl TestContext {
    pub async fn new() -> anyhow::Result<Self> {
        let mut config = Config::for_tests();
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }
        config.db_max_connections = 5;

        let db = create_pool(&config.database_url, config.db_max_connections).await?;
        let store = Arc::new(MemoryFileStore::new(FILES_BASE_URL));
        let state = AppState {
            db: db.clone(),
            storage: store.clone(),
            config,
        };
        Ok(TestContext {
            db,
            app: build_router(state),
            store,
        })
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        caller: Option<Caller>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self
            .app
            .clone()
            .oneshot(json_request(method, uri, caller, body))
            .await
            .unwrap();
        let status = response.status();
        (status, body_json(response).await)
    }

    /// A candidate who finished onboarding with a single `Rust` skill.
    pub async fn onboard_candidate(&self) -> (Caller, String) {
        let caller = Caller::candidate();
        let username = unique_username();
        let (status, body) = self
            .send(
                Method::POST,
                "/api/v1/onboarding/candidate",
                Some(caller),
                Some(candidate_payload(&username)),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (caller, username)
    }

    pub async fn onboard_recruiter(&self) -> Caller {
        let caller = Caller::recruiter();
        let (status, body) = self
            .send(
                Method::POST,
                "/api/v1/onboarding/recruiter",
                Some(caller),
                Some(json!({
                    "username": unique_username(),
                    "full_name": "Grace Hopper",
                    "company_name": "Cobol Labs",
                    "company_website": "https://cobol.example.com",
                    "designation": "Head of Talent"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        caller
    }

    /// Posts an open job with the given extra questions; returns the job detail.
    pub async fn post_job(&self, recruiter: Caller, questions: Vec<Value>) -> Value {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/v1/jobs",
                Some(recruiter),
                Some(json!({
                    "title": "Founding Engineer",
                    "description": "Build the first version of our hiring platform.",
                    "job_type": "full_time",
                    "work_mode": "remote",
                    "questions": questions
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }
}

pub fn candidate_payload(username: &str) -> Value {
    json!({
        "personal": {
            "full_name": "Ada Lovelace",
            "username": username,
            "phone": "+44 20 7946 0000"
        },
        "skills": [{"name": "Rust", "level": "advanced"}]
    })
}
