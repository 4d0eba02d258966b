//! CoFounds API: candidate and recruiter portals of a job board.

pub mod applications;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod extract;
pub mod jobs;
pub mod models;
pub mod onboarding;
pub mod pending;
pub mod portfolio;
pub mod resources;
pub mod response;
pub mod routes;
pub mod state;
pub mod storage;
pub mod users;
pub mod validation;
