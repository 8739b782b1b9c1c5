//! Axum HTTP API server for the job marketplace.
//!
//! This crate provides:
//! - Job listing, eligibility and lifecycle routes
//! - Applicant interested-list and skill routes
//! - Firebase ID token verification
//! - Rate limiting, security headers and Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod security;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{AccountService, Role};
pub use state::AppState;
