use crate::{
    AppState,
    gate::{Actor, resolve_actor},
    models::{
        self, AdminDashboardStats, Claim, Course, CreateClaimRequest, CreateCourseRequest,
        CreateReviewRequest, ModerationRequest, Profile, Review, SetRoleRequest,
        UpdateProfileRequest, UserProfile,
    },
    session::{self, CurrentUser},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use uuid::Uuid;

// --- Filter Structs ---

/// CourseFilter
///
/// Defines the accepted query parameters for the public course listing endpoint
/// (GET /courses). Used by Axum's Query extractor to safely bind HTTP query
/// parameters for filtering and search.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct CourseFilter {
    /// Optional filter for a single category.
    pub category: Option<String>,
    /// Optional full-text search string for title/summary/provider matching.
    pub search: Option<String>,
}

/// StatusFilter
///
/// Moderation-queue filter for the admin listing endpoints.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct StatusFilter {
    /// 'pending', 'approved' or 'rejected'; omit to list all.
    pub status: Option<String>,
}

/// AuthCallbackParams
///
/// Query parameters the identity provider appends when redirecting back after
/// sign-in: the one-time authorization code, the role the user requested on the
/// signup form, and the path originally requested before the auth detour.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct AuthCallbackParams {
    pub code: Option<String>,
    pub role: Option<String>,
    pub next: Option<String>,
}

// --- Auth Flow Handlers ---

/// Only same-origin paths are accepted as post-login targets; anything else
/// (absolute URLs, protocol-relative paths) falls back to the landing page.
fn sanitize_next(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
        _ => "/".to_string(),
    }
}

/// Builds the post-login redirect carrying the session cookie, so the very
/// next request resolves a session.
fn session_redirect(target: &str, access_token: &str) -> Response {
    let mut response = Redirect::temporary(target).into_response();
    if let Ok(cookie) = HeaderValue::from_str(&format!(
        "sb-access-token={}; Path=/; HttpOnly; SameSite=Lax",
        access_token
    )) {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}

/// auth_callback
///
/// [Public Route] Completes the hosted sign-in flow: exchanges the one-time
/// authorization code for a session, conditionally applies the signup role,
/// and lands the user on the right page.
///
/// *Promotion guard*: role metadata is written **only if** no profile exists
/// yet, or the existing profile is a 'student' asking to become a 'coach'.
/// The guard is one-way: a coach is never demoted through this path, and an
/// admin's role is never touched. A failed write skips the promotion and the
/// request proceeds with the pre-update role; nothing else changed, so there
/// is nothing to roll back.
///
/// *Failure*: a missing or unredeemable code is terminal for the request:
/// redirect to the dedicated auth error page, no retry.
#[utoipa::path(
    get,
    path = "/auth/callback",
    params(AuthCallbackParams),
    responses((status = 307, description = "Redirect to /admin, the requested next path, or the auth error page"))
)]
pub async fn auth_callback(
    State(state): State<AppState>,
    Query(params): Query<AuthCallbackParams>,
) -> Response {
    let Some(code) = params.code else {
        return Redirect::temporary("/auth/auth-code-error").into_response();
    };

    let grant = match state.identity.exchange_code(&code).await {
        Ok(grant) => grant,
        Err(e) => {
            tracing::warn!("authorization code exchange failed: {}", e);
            return Redirect::temporary("/auth/auth-code-error").into_response();
        }
    };

    // Signup role assignment, gated by the one-way promotion rule.
    if let Some(requested) = params.role.as_deref() {
        if matches!(requested, "student" | "coach") {
            let profile = state.repo.get_profile(grant.session.user_id).await;
            let promotable = match &profile {
                None => true,
                Some(p) => p.role == "student" && requested == "coach",
            };
            if promotable {
                if let Err(e) = state
                    .identity
                    .update_role_metadata(&grant.access_token, requested)
                    .await
                {
                    tracing::warn!("role metadata update skipped: {}", e);
                }
            }
        }
    }

    // Re-resolve the actor and land admins in the admin area.
    let actor = resolve_actor(
        Some(&grant.session),
        &state.repo,
        &state.config.super_admins,
    )
    .await;

    let target = if actor == Actor::Admin {
        "/admin".to_string()
    } else {
        sanitize_next(params.next.as_deref())
    };

    session_redirect(&target, &grant.access_token)
}

/// sign_out
///
/// [Public Route] Revokes the current session with the identity provider and
/// clears the session cookie. Revocation failures are logged, not surfaced:
/// the cookie is cleared either way and the user lands on the home page.
#[utoipa::path(
    post,
    path = "/auth/signout",
    responses((status = 307, description = "Redirect home with the session cookie cleared"))
)]
pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = session::token_from_headers(&headers) {
        if let Err(e) = state.identity.sign_out(&token).await {
            tracing::warn!("sign-out revocation failed: {}", e);
        }
    }

    let mut response = Redirect::temporary("/").into_response();
    response.headers_mut().append(
        header::SET_COOKIE,
        HeaderValue::from_static("sb-access-token=; Path=/; Max-Age=0"),
    );
    response
}

/// auth_code_error
///
/// [Public Route] The single dedicated auth error page. Every other failure in
/// the system surfaces as a redirect; this is where the terminal ones land.
#[utoipa::path(
    get,
    path = "/auth/auth-code-error",
    responses((status = 200, description = "Auth error page"))
)]
pub async fn auth_code_error() -> impl IntoResponse {
    (
        StatusCode::OK,
        "Sign-in failed: the authorization code was invalid or expired. Please try signing in again.",
    )
}

// --- Public Marketplace Handlers ---

/// get_courses
///
/// [Public Route] Lists courses with category filtering and search.
#[utoipa::path(
    get,
    path = "/courses",
    params(CourseFilter),
    responses((status = 200, description = "List filtered courses", body = [Course]))
)]
pub async fn get_courses(
    State(state): State<AppState>,
    Query(filter): Query<CourseFilter>,
) -> Json<Vec<models::Course>> {
    let courses = state.repo.get_courses(filter.category, filter.search).await;
    Json(courses)
}

/// get_course_details
///
/// [Public Route] Retrieves a single course by ID.
#[utoipa::path(
    get,
    path = "/courses/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses((status = 200, description = "Found", body = Course))
)]
pub async fn get_course_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<models::Course>, StatusCode> {
    match state.repo.get_course(id).await {
        Some(course) => Ok(Json(course)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// get_course_reviews
///
/// [Public Route] Lists reviews for a course.
///
/// *Security*: the repository method applies the `status = 'approved'` filter
/// **unconditionally**; pending and rejected reviews are not leaked to
/// anonymous visitors.
#[utoipa::path(
    get,
    path = "/courses/{id}/reviews",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses((status = 200, description = "Approved reviews", body = [Review]))
)]
pub async fn get_course_reviews(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> Json<Vec<models::Review>> {
    let reviews = state.repo.get_approved_reviews(course_id).await;
    Json(reviews)
}

// --- Authenticated Handlers ---

/// get_profile
///
/// [Authenticated Route] Provides the authenticated user's profile. A session
/// can exist moments before its profile row does (the provider trigger is
/// asynchronous), so a missing row falls back to the session identity with
/// the default role.
#[utoipa::path(
    get,
    path = "/profile",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_profile(user: CurrentUser, State(state): State<AppState>) -> Json<UserProfile> {
    let profile = state.repo.get_profile(user.id).await;
    Json(match profile {
        Some(p) => UserProfile {
            id: p.id,
            email: p.email,
            display_name: p.display_name,
            role: p.role,
            actor: user.actor.as_str().to_string(),
        },
        None => UserProfile {
            id: user.id,
            email: user.email.clone(),
            display_name: None,
            role: "student".to_string(),
            actor: user.actor.as_str().to_string(),
        },
    })
}

/// update_settings
///
/// [Authenticated Route] Updates the caller's own display name. The update is
/// scoped to the session's user id; there is no way to reach another profile
/// from here.
#[utoipa::path(
    put,
    path = "/settings/profile",
    request_body = UpdateProfileRequest,
    responses((status = 200, description = "Updated", body = Profile))
)]
pub async fn update_settings(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<models::Profile>, StatusCode> {
    let Some(display_name) = payload.display_name else {
        return Err(StatusCode::BAD_REQUEST);
    };
    match state.repo.update_display_name(user.id, display_name).await {
        Some(profile) => Ok(Json(profile)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// get_my_reviews
///
/// [Authenticated Route] Lists all reviews written by the requesting user,
/// including those still pending or rejected.
#[utoipa::path(
    get,
    path = "/profile/reviews",
    responses((status = 200, description = "My Reviews", body = [Review]))
)]
pub async fn get_my_reviews(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Json<Vec<models::Review>> {
    let reviews = state.repo.get_my_reviews(user.id).await;
    Json(reviews)
}

/// get_my_claims
///
/// [Authenticated Route] Lists the requesting user's ownership claims.
#[utoipa::path(
    get,
    path = "/profile/claims",
    responses((status = 200, description = "My Claims", body = [Claim]))
)]
pub async fn get_my_claims(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Json<Vec<models::Claim>> {
    let claims = state.repo.get_my_claims(user.id).await;
    Json(claims)
}

/// create_course
///
/// [Authenticated Route] Handles the submission of a new course listing.
/// The submitter id is taken from the authenticated session, ensuring data integrity.
#[utoipa::path(
    post,
    path = "/add-course",
    request_body = CreateCourseRequest,
    responses((status = 200, description = "Created", body = Course))
)]
pub async fn create_course(
    user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<models::CreateCourseRequest>,
) -> Result<Json<models::Course>, StatusCode> {
    if payload.title.trim().is_empty() || payload.provider.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let course = state.repo.create_course(payload, user.id).await;
    Ok(Json(course))
}

/// write_review
///
/// [Authenticated Route] Submits a review for a course. The review enters the
/// moderation queue as 'pending' and becomes public only after admin approval.
#[utoipa::path(
    post,
    path = "/courses/{id}/write-review",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = CreateReviewRequest,
    responses(
        (status = 200, description = "Submitted", body = Review),
        (status = 400, description = "Rating out of range"),
        (status = 404, description = "Course Not Found")
    )
)]
pub async fn write_review(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<models::CreateReviewRequest>,
) -> Result<Json<models::Review>, StatusCode> {
    if !(1..=5).contains(&payload.rating) {
        return Err(StatusCode::BAD_REQUEST);
    }
    if state.repo.get_course(course_id).await.is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    let review = state.repo.add_review(course_id, user.id, payload).await;
    Ok(Json(review))
}

/// submit_claim
///
/// [Authenticated Route] Submits an ownership claim for a course, entering the
/// same moderation cycle as reviews.
#[utoipa::path(
    post,
    path = "/courses/{id}/claim",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = CreateClaimRequest,
    responses(
        (status = 200, description = "Submitted", body = Claim),
        (status = 404, description = "Course Not Found")
    )
)]
pub async fn submit_claim(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    Json(payload): Json<models::CreateClaimRequest>,
) -> Result<Json<models::Claim>, StatusCode> {
    if state.repo.get_course(course_id).await.is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    let claim = state
        .repo
        .add_claim(course_id, user.id, payload.message)
        .await;
    Ok(Json(claim))
}

// --- Admin Handlers ---

/// get_admin_stats
///
/// [Admin Route] Retrieves core application statistics for the dashboard.
///
/// *Authorization*: explicitly checks the resolved Actor; the gate already
/// redirected non-admins away from /admin, this is the second layer.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses((status = 200, description = "Stats", body = AdminDashboardStats))
)]
pub async fn get_admin_stats(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AdminDashboardStats>, StatusCode> {
    if user.actor != Actor::Admin {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(state.repo.get_stats().await))
}

/// get_admin_reviews
///
/// [Admin Route] The review moderation queue, optionally filtered by status.
/// Unlike the public listing, pending and rejected reviews are included.
#[utoipa::path(
    get,
    path = "/admin/reviews",
    params(StatusFilter),
    responses((status = 200, description = "Reviews", body = [Review]))
)]
pub async fn get_admin_reviews(
    user: CurrentUser,
    State(state): State<AppState>,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<models::Review>>, StatusCode> {
    if user.actor != Actor::Admin {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(state.repo.get_reviews_by_status(filter.status).await))
}

/// moderate_review
///
/// [Admin Route] Approves or rejects a pending review. This is the core
/// moderation endpoint controlling what the public listing shows.
#[utoipa::path(
    put,
    path = "/admin/reviews/{id}/status",
    params(("id" = Uuid, Path, description = "Review ID")),
    request_body = ModerationRequest,
    responses(
        (status = 200, description = "Updated", body = Review),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn moderate_review(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ModerationRequest>,
) -> Result<Json<models::Review>, StatusCode> {
    if user.actor != Actor::Admin {
        return Err(StatusCode::FORBIDDEN);
    }
    if !matches!(payload.status.as_str(), "approved" | "rejected") {
        return Err(StatusCode::BAD_REQUEST);
    }
    match state.repo.set_review_status(id, payload.status).await {
        Some(review) => Ok(Json(review)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// get_admin_claims
///
/// [Admin Route] The claim moderation queue.
#[utoipa::path(
    get,
    path = "/admin/claims",
    params(StatusFilter),
    responses((status = 200, description = "Claims", body = [Claim]))
)]
pub async fn get_admin_claims(
    user: CurrentUser,
    State(state): State<AppState>,
    Query(filter): Query<StatusFilter>,
) -> Result<Json<Vec<models::Claim>>, StatusCode> {
    if user.actor != Actor::Admin {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(state.repo.get_claims_by_status(filter.status).await))
}

/// moderate_claim
///
/// [Admin Route] Approves or rejects an ownership claim.
#[utoipa::path(
    put,
    path = "/admin/claims/{id}/status",
    params(("id" = Uuid, Path, description = "Claim ID")),
    request_body = ModerationRequest,
    responses(
        (status = 200, description = "Updated", body = Claim),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn moderate_claim(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ModerationRequest>,
) -> Result<Json<models::Claim>, StatusCode> {
    if user.actor != Actor::Admin {
        return Err(StatusCode::FORBIDDEN);
    }
    if !matches!(payload.status.as_str(), "approved" | "rejected") {
        return Err(StatusCode::BAD_REQUEST);
    }
    match state.repo.set_claim_status(id, payload.status).await {
        Some(claim) => Ok(Json(claim)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// get_admin_users
///
/// [Admin Route] Lists every profile for the user-management screen.
#[utoipa::path(
    get,
    path = "/admin/users",
    responses((status = 200, description = "All users", body = [Profile]))
)]
pub async fn get_admin_users(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<models::Profile>>, StatusCode> {
    if user.actor != Actor::Admin {
        return Err(StatusCode::FORBIDDEN);
    }
    Ok(Json(state.repo.get_users().await))
}

/// set_user_role
///
/// [Admin Route] Rewrites a user's role.
///
/// *Irrevocability*: super-admin accounts cannot be demoted by any admin
/// action. The target's email is checked against the injected allowlist
/// before the store is touched, and a match is refused with 403.
#[utoipa::path(
    put,
    path = "/admin/users/{id}/role",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = SetRoleRequest,
    responses(
        (status = 200, description = "Updated", body = Profile),
        (status = 400, description = "Unknown role"),
        (status = 403, description = "Target is a super-admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn set_user_role(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetRoleRequest>,
) -> Result<Json<models::Profile>, StatusCode> {
    if user.actor != Actor::Admin {
        return Err(StatusCode::FORBIDDEN);
    }
    if !matches!(payload.role.as_str(), "student" | "coach" | "admin") {
        return Err(StatusCode::BAD_REQUEST);
    }

    let target = state
        .repo
        .get_profile(id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;
    if state.config.super_admins.contains(&target.email) {
        return Err(StatusCode::FORBIDDEN);
    }

    match state.repo.set_user_role(id, payload.role).await {
        Some(profile) => Ok(Json(profile)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// delete_user
///
/// [Admin Route] Removes a user's profile (cascading to their submissions).
///
/// *Irrevocability*: super-admin accounts can never be removed through this
/// endpoint, mirroring the role guard above.
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Target is a super-admin"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_user(
    user: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> StatusCode {
    if user.actor != Actor::Admin {
        return StatusCode::FORBIDDEN;
    }

    let Some(target) = state.repo.get_profile(id).await else {
        return StatusCode::NOT_FOUND;
    };
    if state.config.super_admins.contains(&target.email) {
        return StatusCode::FORBIDDEN;
    }

    if state.repo.delete_user(id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
