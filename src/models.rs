use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// Profile
///
/// Represents the user's canonical identity record stored in the `public.profiles` table.
/// This is the authoritative source the Access Gate consults when deciding whether a
/// session belongs to an administrator. The row is created by the identity provider's
/// signup trigger; this service reads and moderates it but never creates it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Profile {
    // Primary Key, also the Foreign Key to the external auth.users table.
    pub id: Uuid,
    // The user's primary identifier.
    pub email: String,
    // Optional display name, editable through the settings endpoint.
    pub display_name: Option<String>,
    // The RBAC field: 'student', 'coach' or 'admin'.
    pub role: String,
    // Secondary admin flag; either this or role='admin' marks an administrator.
    pub is_admin: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Course
///
/// Represents a listed course from the `public.courses` table.
/// This is the primary data structure the marketplace is built around.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Course {
    pub id: Uuid,
    // FK to public.profiles.id (submitter).
    pub created_by: Uuid,
    pub title: String,
    // The organisation or coach offering the course.
    pub provider: String,
    pub summary: String,
    pub category: String,
    pub website: Option<String>,

    // Timestamp handling for database integration and JSON serialization.
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Review
///
/// A student review of a course, from `public.reviews`. New reviews start in the
/// 'pending' state and only become publicly visible once an administrator sets the
/// status to 'approved'.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Review {
    pub id: Uuid,
    pub course_id: Uuid,
    pub user_id: Uuid,
    // 1..=5, validated at the handler boundary.
    pub rating: i32,
    pub body: String,
    // Moderation state: 'pending' | 'approved' | 'rejected'.
    pub status: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Claim
///
/// An ownership claim from `public.claims`: a coach asserting they run a listed
/// course. Follows the same pending/approved/rejected moderation cycle as reviews.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Claim {
    pub id: Uuid,
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub message: String,
    pub status: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// --- Request Payloads (Input Schemas) ---

/// CreateCourseRequest
///
/// Input payload for submitting a new course (POST /add-course).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCourseRequest {
    pub title: String,
    pub provider: String,
    pub summary: String,
    pub category: String,
    pub website: Option<String>,
}

/// CreateReviewRequest
///
/// Input payload for submitting a review (POST /courses/{id}/write-review).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateReviewRequest {
    /// Star rating, 1 to 5.
    #[schema(example = 4)]
    pub rating: i32,
    pub body: String,
}

/// CreateClaimRequest
///
/// Input payload for submitting an ownership claim (POST /courses/{id}/claim).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateClaimRequest {
    /// Free-form justification shown to the moderator.
    pub message: String,
}

/// UpdateProfileRequest
///
/// Partial update payload for the settings endpoint (PUT /settings/profile).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// ModerationRequest
///
/// Input payload for the admin moderation endpoints
/// (PUT /admin/reviews/{id}/status, PUT /admin/claims/{id}/status).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ModerationRequest {
    /// Target state: 'approved' or 'rejected'.
    #[schema(example = "approved")]
    pub status: String,
}

/// SetRoleRequest
///
/// Input payload for the admin role-assignment endpoint (PUT /admin/users/{id}/role).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SetRoleRequest {
    /// Target role: 'student', 'coach' or 'admin'.
    pub role: String,
}

/// --- Dashboard & Profile Schemas (Output) ---

/// AdminDashboardStats
///
/// Output schema for the administrative statistics dashboard (GET /admin/stats).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_courses: i64,
    pub total_users: i64,
    pub total_reviews: i64,
    /// Reviews still awaiting moderation.
    pub pending_reviews: i64,
    /// Ownership claims still awaiting moderation.
    pub pending_claims: i64,
}

/// UserProfile
///
/// Output schema for the authenticated user's own profile (GET /profile).
/// Mirrors `Profile` minus the moderation-only flags, plus the resolved
/// access-control classification for the frontend to branch on.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub role: String,
    /// "anonymous" | "authenticated" | "admin" as resolved by the gate.
    pub actor: String,
}
