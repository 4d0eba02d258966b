//! Caller identity.
//!
//! Sign-in happens at the gateway in front of this service. The gateway
//! forwards the authenticated user as `x-user-id` and `x-user-role` headers,
//! which the `AuthUser` extractor turns into a typed identity.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Candidate,
    Recruiter,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Candidate => "candidate",
            Role::Recruiter => "recruiter",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "candidate" => Some(Role::Candidate),
            "recruiter" => Some(Role::Recruiter),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn require_candidate(&self) -> Result<(), AppError> {
        match self.role {
            Role::Candidate => Ok(()),
            Role::Recruiter => Err(AppError::Forbidden(
                "This action is only available to candidates".to_string(),
            )),
        }
    }

    pub fn require_recruiter(&self) -> Result<(), AppError> {
        match self.role {
            Role::Recruiter => Ok(()),
            Role::Candidate => Err(AppError::Forbidden(
                "This action is only available to recruiters".to_string(),
            )),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let id = header(USER_ID_HEADER)
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .ok_or(AppError::Unauthorized)?;
        let role = header(USER_ROLE_HEADER)
            .and_then(|raw| Role::parse(&raw))
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthUser { id, role })
    }
}
