use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::features::issues::handlers::{self, AdminState, IssueState};

/// Citizen-facing routes; caller applies the auth middleware.
pub fn routes(state: IssueState) -> Router {
    Router::new()
        .route(
            "/api/issues",
            post(handlers::submit_issue).get(handlers::list_issues),
        )
        .with_state(state)
}

/// Administrative routes; caller applies the auth middleware, handlers check
/// the admin role.
pub fn admin_routes(state: AdminState) -> Router {
    Router::new()
        .route("/api/admin/issues", get(handlers::list_all_issues))
        .route(
            "/api/admin/issues/{id}/status",
            patch(handlers::update_issue_status),
        )
        .with_state(state)
}
