//! HTTP API for Mentora Core.
//!
//! Thin plumbing around the policy engine and the store: every handler
//! authenticates (via the auth layer), consults the policy engine, and
//! only then touches data. Denials surface as 403 responses; the engine
//! itself never errors.

pub mod handlers;

use axum::{
    routing::{get, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::middleware::AuthLayer;
use crate::policy::PolicyEngine;
use crate::store::Store;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub policy: PolicyEngine,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            policy: PolicyEngine::new(),
        }
    }
}

/// Build the API router.
///
/// `/health` stays open; everything under `/api/v1` requires a valid
/// bearer token.
pub fn build_router(state: AppState, jwt_secret: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Projects
        .route("/projects", get(handlers::list_projects).post(handlers::create_project))
        .route("/projects/mine", get(handlers::my_projects))
        .route(
            "/projects/:id",
            get(handlers::get_project)
                .put(handlers::update_project)
                .delete(handlers::delete_project),
        )
        .route("/projects/:id/status", put(handlers::update_project_status))
        .route("/projects/:id/download", get(handlers::download_project))
        // Reports
        .route("/reports", get(handlers::list_reports).post(handlers::create_report))
        .route("/reports/mine", get(handlers::my_reports))
        .route(
            "/reports/:id",
            get(handlers::get_report)
                .put(handlers::update_report)
                .delete(handlers::delete_report),
        )
        .route("/reports/:id/status", put(handlers::update_report_status))
        .route("/reports/:id/download", get(handlers::download_report))
        // Tests
        .route("/tests", get(handlers::list_tests).post(handlers::create_test))
        .route(
            "/tests/:id",
            get(handlers::get_test)
                .put(handlers::update_test)
                .delete(handlers::delete_test),
        )
        .route("/tests/:id/download", get(handlers::download_test))
        // Questions
        .route(
            "/questions",
            get(handlers::list_questions).post(handlers::create_question),
        )
        .route(
            "/questions/:id",
            get(handlers::get_question)
                .put(handlers::update_question)
                .delete(handlers::delete_question),
        )
        .route("/questions/:id/download", get(handlers::download_question))
        // Resources
        .route(
            "/resources",
            get(handlers::list_resources).post(handlers::create_resource),
        )
        .route(
            "/resources/:id",
            get(handlers::get_resource)
                .put(handlers::update_resource)
                .delete(handlers::delete_resource),
        )
        .route("/resources/:id/download", get(handlers::download_resource))
        // Test results
        .route(
            "/test-results",
            get(handlers::list_test_results).post(handlers::create_test_result),
        )
        .route(
            "/test-results/:id",
            get(handlers::get_test_result).put(handlers::update_test_result),
        )
        .route(
            "/test-results/:id/download",
            get(handlers::download_test_result),
        )
        // Users
        .route("/users", get(handlers::list_users))
        .route("/users/me", get(handlers::me))
        .route(
            "/users/:id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .layer(AuthLayer::new(jwt_secret));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

/// API response wrapper.
#[derive(serde::Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_success() {
        let response = ApiResponse::success("data");
        assert!(response.success);
        assert_eq!(response.data, Some("data"));
        assert!(response.error.is_none());
    }

    #[test]
    fn test_api_response_error() {
        let response: ApiResponse<()> = ApiResponse::error("boom");
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.error, Some("boom".to_string()));
    }
}
