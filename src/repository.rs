use crate::models::{
    AdminDashboardStats, Claim, Course, CreateCourseRequest, CreateReviewRequest, Profile, Review,
};
use async_trait::async_trait;
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations. This is the core
/// of the Repository Abstraction pattern, allowing the handlers and the Access Gate
/// to interact with the data layer without knowing the specific implementation
/// (Postgres, Mock, etc.).
///
/// **Send + Sync + async_trait** are required to make the trait object (`Arc<dyn Repository>`)
/// safely shareable and usable across Axum's asynchronous task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Profiles ---
    // The gate's authoritative role source. A missing row or a failed lookup both
    // return None; the caller degrades to Authenticated, never to Admin.
    async fn get_profile(&self, id: Uuid) -> Option<Profile>;
    // Settings: updates the caller's own display name.
    async fn update_display_name(&self, id: Uuid, display_name: String) -> Option<Profile>;

    // --- Courses ---
    // Public listing with filtering and full-text-ish search.
    async fn get_courses(&self, category: Option<String>, search: Option<String>) -> Vec<Course>;
    async fn get_course(&self, id: Uuid) -> Option<Course>;
    async fn create_course(&self, req: CreateCourseRequest, user_id: Uuid) -> Course;

    // --- Reviews ---
    // Public listing: must only ever surface status='approved' rows.
    async fn get_approved_reviews(&self, course_id: Uuid) -> Vec<Review>;
    // New reviews always start in 'pending'.
    async fn add_review(&self, course_id: Uuid, user_id: Uuid, req: CreateReviewRequest) -> Review;
    // Owner listing: includes pending and rejected rows.
    async fn get_my_reviews(&self, user_id: Uuid) -> Vec<Review>;
    // Admin moderation queue; None lists every status.
    async fn get_reviews_by_status(&self, status: Option<String>) -> Vec<Review>;
    async fn set_review_status(&self, id: Uuid, status: String) -> Option<Review>;

    // --- Claims ---
    async fn add_claim(&self, course_id: Uuid, user_id: Uuid, message: String) -> Claim;
    async fn get_my_claims(&self, user_id: Uuid) -> Vec<Claim>;
    async fn get_claims_by_status(&self, status: Option<String>) -> Vec<Claim>;
    async fn set_claim_status(&self, id: Uuid, status: String) -> Option<Claim>;

    // --- Admin User Management ---
    async fn get_users(&self) -> Vec<Profile>;
    // Role mutation belongs to admin actions only; the super-admin guard sits in
    // the handler, against the injected allowlist, before this is ever called.
    async fn set_user_role(&self, id: Uuid, role: String) -> Option<Profile>;
    async fn delete_user(&self, id: Uuid) -> bool;

    // --- Dashboard ---
    async fn get_stats(&self) -> AdminDashboardStats;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the PostgreSQL database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// get_profile
    ///
    /// Retrieves the profile record (id, email, role, admin flag) needed for actor
    /// resolution. Errors are logged and collapse into None so that a store outage
    /// can never escalate a session's privileges.
    async fn get_profile(&self, id: Uuid) -> Option<Profile> {
        sqlx::query_as::<_, Profile>(
            "SELECT id, email, display_name, role, is_admin, created_at FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_profile error: {:?}", e);
            None
        })
    }

    /// update_display_name
    ///
    /// Self-service profile edit. Scoped by id, so a user can only ever touch
    /// their own row.
    async fn update_display_name(&self, id: Uuid, display_name: String) -> Option<Profile> {
        sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles SET display_name = $2
            WHERE id = $1
            RETURNING id, email, display_name, role, is_admin, created_at
            "#,
        )
        .bind(id)
        .bind(display_name)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("update_display_name error: {:?}", e);
            None
        })
    }

    /// get_courses
    ///
    /// Implements flexible search/filtering using QueryBuilder for safe parameterization,
    /// adhering to the **"No SQL Injection Risk"** mandate.
    async fn get_courses(&self, category: Option<String>, search: Option<String>) -> Vec<Course> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            r#"
            SELECT
                id, created_by, title, provider, summary, category, website,
                created_at, updated_at
            FROM courses
            WHERE true
            "#,
        );

        if let Some(c) = category {
            builder.push(" AND category = ");
            builder.push_bind(c);
        }

        if let Some(s) = search {
            // Case-insensitive search across title, summary, and provider fields.
            let search_pattern = format!("%{}%", s);
            builder.push(" AND (title ILIKE ");
            builder.push_bind(search_pattern.clone());
            builder.push(" OR summary ILIKE ");
            builder.push_bind(search_pattern.clone());
            builder.push(" OR provider ILIKE ");
            builder.push_bind(search_pattern);
            builder.push(")");
        }

        builder.push(" ORDER BY created_at DESC");

        let query = builder.build_query_as::<Course>();

        match query.fetch_all(&self.pool).await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("get_courses error: {:?}", e);
                vec![]
            }
        }
    }

    /// get_course
    ///
    /// Simple retrieval of a course by ID. Course listings are public content;
    /// moderation applies to reviews and claims, not to the listing itself.
    async fn get_course(&self, id: Uuid) -> Option<Course> {
        sqlx::query_as::<_, Course>(
            r#"
            SELECT id, created_by, title, provider, summary, category, website,
                   created_at, updated_at
            FROM courses
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_course error: {:?}", e);
            None
        })
    }

    /// create_course
    ///
    /// Inserts a new course submitted by an authenticated user.
    async fn create_course(&self, req: CreateCourseRequest, user_id: Uuid) -> Course {
        let new_id = Uuid::new_v4();
        sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO courses (id, created_by, title, provider, summary, category, website, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
            RETURNING id, created_by, title, provider, summary, category, website, created_at, updated_at
            "#,
        )
        .bind(new_id)
        .bind(user_id)
        .bind(req.title)
        .bind(req.provider)
        .bind(req.summary)
        .bind(req.category)
        .bind(req.website)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to insert course")
    }

    /// get_approved_reviews
    ///
    /// **Security**: Strictly enforces `status = 'approved'`; pending and rejected
    /// reviews never reach the public listing.
    async fn get_approved_reviews(&self, course_id: Uuid) -> Vec<Review> {
        sqlx::query_as::<_, Review>(
            r#"
            SELECT id, course_id, user_id, rating, body, status, created_at
            FROM reviews
            WHERE course_id = $1 AND status = 'approved'
            ORDER BY created_at DESC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_approved_reviews error: {:?}", e);
            vec![]
        })
    }

    /// add_review
    ///
    /// All new reviews are inserted with `status = 'pending'`, requiring
    /// administrative approval before they appear publicly.
    async fn add_review(
        &self,
        course_id: Uuid,
        user_id: Uuid,
        req: CreateReviewRequest,
    ) -> Review {
        let new_id = Uuid::new_v4();
        sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (id, course_id, user_id, rating, body, status, created_at)
            VALUES ($1, $2, $3, $4, $5, 'pending', NOW())
            RETURNING id, course_id, user_id, rating, body, status, created_at
            "#,
        )
        .bind(new_id)
        .bind(course_id)
        .bind(user_id)
        .bind(req.rating)
        .bind(req.body)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to insert review")
    }

    /// get_my_reviews
    ///
    /// Retrieves all reviews written by the authenticated user, including
    /// pending and rejected ones.
    async fn get_my_reviews(&self, user_id: Uuid) -> Vec<Review> {
        sqlx::query_as::<_, Review>(
            r#"
            SELECT id, course_id, user_id, rating, body, status, created_at
            FROM reviews
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_my_reviews error: {:?}", e);
            vec![]
        })
    }

    /// get_reviews_by_status
    ///
    /// Administrative moderation queue. Unlike the public listing, this does
    /// *not* restrict on status unless a filter is supplied.
    async fn get_reviews_by_status(&self, status: Option<String>) -> Vec<Review> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            "SELECT id, course_id, user_id, rating, body, status, created_at FROM reviews WHERE true",
        );
        if let Some(s) = status {
            builder.push(" AND status = ");
            builder.push_bind(s);
        }
        builder.push(" ORDER BY created_at ASC");

        match builder.build_query_as::<Review>().fetch_all(&self.pool).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!("get_reviews_by_status error: {:?}", e);
                vec![]
            }
        }
    }

    /// set_review_status
    ///
    /// Updates the moderation state. Used by the admin moderation handler.
    async fn set_review_status(&self, id: Uuid, status: String) -> Option<Review> {
        sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews SET status = $2
            WHERE id = $1
            RETURNING id, course_id, user_id, rating, body, status, created_at
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("set_review_status error: {:?}", e);
            None
        })
    }

    /// add_claim
    ///
    /// Inserts an ownership claim, always starting as 'pending'.
    async fn add_claim(&self, course_id: Uuid, user_id: Uuid, message: String) -> Claim {
        let new_id = Uuid::new_v4();
        sqlx::query_as::<_, Claim>(
            r#"
            INSERT INTO claims (id, course_id, user_id, message, status, created_at)
            VALUES ($1, $2, $3, $4, 'pending', NOW())
            RETURNING id, course_id, user_id, message, status, created_at
            "#,
        )
        .bind(new_id)
        .bind(course_id)
        .bind(user_id)
        .bind(message)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to insert claim")
    }

    /// get_my_claims
    async fn get_my_claims(&self, user_id: Uuid) -> Vec<Claim> {
        sqlx::query_as::<_, Claim>(
            r#"
            SELECT id, course_id, user_id, message, status, created_at
            FROM claims
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_my_claims error: {:?}", e);
            vec![]
        })
    }

    /// get_claims_by_status
    async fn get_claims_by_status(&self, status: Option<String>) -> Vec<Claim> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            "SELECT id, course_id, user_id, message, status, created_at FROM claims WHERE true",
        );
        if let Some(s) = status {
            builder.push(" AND status = ");
            builder.push_bind(s);
        }
        builder.push(" ORDER BY created_at ASC");

        match builder.build_query_as::<Claim>().fetch_all(&self.pool).await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("get_claims_by_status error: {:?}", e);
                vec![]
            }
        }
    }

    /// set_claim_status
    async fn set_claim_status(&self, id: Uuid, status: String) -> Option<Claim> {
        sqlx::query_as::<_, Claim>(
            r#"
            UPDATE claims SET status = $2
            WHERE id = $1
            RETURNING id, course_id, user_id, message, status, created_at
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("set_claim_status error: {:?}", e);
            None
        })
    }

    /// get_users
    ///
    /// Administrative listing of every profile in the system.
    async fn get_users(&self) -> Vec<Profile> {
        sqlx::query_as::<_, Profile>(
            "SELECT id, email, display_name, role, is_admin, created_at FROM profiles ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("get_users error: {:?}", e);
            vec![]
        })
    }

    /// set_user_role
    ///
    /// Admin action: rewrites a profile's role. Also clears the is_admin flag
    /// when the new role is not 'admin', keeping the two admin markers in step.
    async fn set_user_role(&self, id: Uuid, role: String) -> Option<Profile> {
        sqlx::query_as::<_, Profile>(
            r#"
            UPDATE profiles SET role = $2, is_admin = ($2 = 'admin')
            WHERE id = $1
            RETURNING id, email, display_name, role, is_admin, created_at
            "#,
        )
        .bind(id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("set_user_role error: {:?}", e);
            None
        })
    }

    /// delete_user
    ///
    /// Admin action: removes a profile row. Cascades to the user's reviews and
    /// claims via foreign keys.
    async fn delete_user(&self, id: Uuid) -> bool {
        match sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
        {
            Ok(res) => res.rows_affected() > 0,
            Err(e) => {
                tracing::error!("delete_user error: {:?}", e);
                false
            }
        }
    }

    /// get_stats
    ///
    /// Compiles all necessary counters for the administrative dashboard in a single call.
    async fn get_stats(&self) -> AdminDashboardStats {
        let total_courses = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM courses")
            .fetch_one(&self.pool)
            .await
            .unwrap_or(0);
        let total_users = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM profiles")
            .fetch_one(&self.pool)
            .await
            .unwrap_or(0);
        let total_reviews = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reviews")
            .fetch_one(&self.pool)
            .await
            .unwrap_or(0);
        let pending_reviews =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reviews WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await
                .unwrap_or(0);
        let pending_claims =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM claims WHERE status = 'pending'")
                .fetch_one(&self.pool)
                .await
                .unwrap_or(0);
        AdminDashboardStats {
            total_courses,
            total_users,
            total_reviews,
            pending_reviews,
            pending_claims,
        }
    }
}
