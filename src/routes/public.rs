use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Defines endpoints that are accessible to any client, anonymous or logged-in.
/// These routes primarily handle read-only marketplace data and the entry pages
/// of the hosted sign-in flow.
///
/// Security Mandate:
/// The review listing handler must only surface approved reviews; the
/// `status = 'approved'` restriction is enforced at the Repository level so
/// pending or rejected submissions can never leak to anonymous visitors.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // The marketing landing page. Note that the Access Gate confines
        // administrators to /admin, so they never actually see this.
        .route("/", get(|| async { "Course Review Marketplace" }))
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // GET /login, GET /signup
        // Entry pages for the hosted auth flow; the real credential UI lives
        // with the identity provider.
        .route("/login", get(|| async { "Sign in via your identity provider" }))
        .route("/signup", get(|| async { "Create an account via your identity provider" }))
        // GET /courses?category=...&search=...
        // Lists all courses, supporting category filtering and full-text search.
        .route("/courses", get(handlers::get_courses))
        // GET /courses/{id}
        // Retrieves the detailed view of a single course.
        .route("/courses/{id}", get(handlers::get_course_details))
        // GET /courses/{id}/reviews
        // Lists the approved reviews for a course.
        .route("/courses/{id}/reviews", get(handlers::get_course_reviews))
}
