use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::storage::FileStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Bucket for certificates and profile images. S3 in production, in-memory in tests.
    pub storage: Arc<dyn FileStore>,
    pub config: Config,
}
