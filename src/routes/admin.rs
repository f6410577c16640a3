use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, put},
};

/// Admin Router Module
///
/// Defines the routes exclusively accessible to administrators: the dashboard,
/// the review and claim moderation queues, and user management.
///
/// Access Control:
/// The Access Gate redirects every non-admin request for /admin/* to the home
/// page before routing happens. Each handler nevertheless re-checks the
/// resolved Actor and answers 403; moderation endpoints must not depend on a
/// single enforcement point.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/stats
        // Retrieves core dashboard metrics (courses, users, reviews, pending queues).
        .route("/stats", get(handlers::get_admin_stats))
        // GET /admin/reviews?status=...
        // The review moderation queue, including hidden statuses.
        .route("/reviews", get(handlers::get_admin_reviews))
        // PUT /admin/reviews/{id}/status
        // Approves or rejects a review. This controls the public listing.
        .route("/reviews/{id}/status", put(handlers::moderate_review))
        // GET /admin/claims?status=... and PUT /admin/claims/{id}/status
        // The same moderation cycle for ownership claims.
        .route("/claims", get(handlers::get_admin_claims))
        .route("/claims/{id}/status", put(handlers::moderate_claim))
        // GET /admin/users
        // Lists every profile for the user-management screen.
        .route("/users", get(handlers::get_admin_users))
        // PUT /admin/users/{id}/role
        // Reassigns a role. Refused for super-admin targets: allowlisted
        // accounts are immune to demotion by any admin action.
        .route("/users/{id}/role", put(handlers::set_user_role))
        // DELETE /admin/users/{id}
        // Removes a profile. Refused for super-admin targets as well.
        .route("/users/{id}", delete(handlers::delete_user))
}
