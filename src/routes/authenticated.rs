use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Defines the routes accessible to any signed-in user (student or coach):
/// profile and settings, course submission, review writing and ownership
/// claims.
///
/// Access Control Strategy:
/// The Access Gate already redirects anonymous visitors to /login for every
/// path in this module. Each handler additionally takes the `CurrentUser`
/// extractor, which rejects session-less requests with 401; the gate and the
/// extractor resolve the Actor through the same function, so the two layers
/// cannot disagree.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /profile
        // Retrieves the currently authenticated user's profile.
        .route("/profile", get(handlers::get_profile))
        // GET /profile/reviews, GET /profile/claims
        // The user's own submissions, including pending and rejected ones.
        .route("/profile/reviews", get(handlers::get_my_reviews))
        .route("/profile/claims", get(handlers::get_my_claims))
        // PUT /settings/profile
        // Updates the caller's own display name.
        .route("/settings/profile", put(handlers::update_settings))
        // POST /add-course
        // Submits a new course listing.
        .route("/add-course", post(handlers::create_course))
        // POST /courses/{id}/write-review
        // Submits a review; it enters the moderation queue as 'pending'.
        .route("/courses/{id}/write-review", post(handlers::write_review))
        // POST /courses/{id}/claim
        // Submits an ownership claim for a course.
        .route("/courses/{id}/claim", post(handlers::submit_claim))
}
