use async_trait::async_trait;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use review_portal::{
    AppState,
    config::AppConfig,
    gate::Actor,
    handlers,
    identity::MockIdentity,
    models::{
        AdminDashboardStats, Claim, Course, CreateCourseRequest, CreateReviewRequest,
        ModerationRequest, Profile, Review, SetRoleRequest,
    },
    repository::Repository,
    session::CurrentUser,
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use uuid::Uuid;

// --- MOCK REPOSITORY IMPLEMENTATION ---

// This struct is the central control point for testing handler logic.
// Handlers rely on traits, so we mock the trait implementation and record
// every mutating call to assert exactly what reached the store.
#[derive(Default)]
struct MockRepoControl {
    profiles: HashMap<Uuid, Profile>,
    review_to_return: Option<Review>,
    claim_to_return: Option<Claim>,
    role_updates: Mutex<Vec<(Uuid, String)>>,
    deletions: Mutex<Vec<Uuid>>,
}

impl MockRepoControl {
    fn role_updates(&self) -> Vec<(Uuid, String)> {
        self.role_updates.lock().unwrap().clone()
    }
    fn deletions(&self) -> Vec<Uuid> {
        self.deletions.lock().unwrap().clone()
    }
}

#[async_trait]
impl Repository for MockRepoControl {
    async fn get_profile(&self, id: Uuid) -> Option<Profile> {
        self.profiles.get(&id).cloned()
    }
    async fn update_display_name(&self, id: Uuid, display_name: String) -> Option<Profile> {
        self.profiles.get(&id).cloned().map(|mut p| {
            p.display_name = Some(display_name);
            p
        })
    }
    async fn get_courses(&self, _category: Option<String>, _search: Option<String>) -> Vec<Course> {
        vec![]
    }
    async fn get_course(&self, _id: Uuid) -> Option<Course> {
        None
    }
    async fn create_course(&self, _req: CreateCourseRequest, _user_id: Uuid) -> Course {
        Course::default()
    }
    async fn get_approved_reviews(&self, _course_id: Uuid) -> Vec<Review> {
        vec![]
    }
    async fn add_review(
        &self,
        _course_id: Uuid,
        _user_id: Uuid,
        _req: CreateReviewRequest,
    ) -> Review {
        Review::default()
    }
    async fn get_my_reviews(&self, _user_id: Uuid) -> Vec<Review> {
        vec![]
    }
    async fn get_reviews_by_status(&self, _status: Option<String>) -> Vec<Review> {
        vec![]
    }
    async fn set_review_status(&self, _id: Uuid, status: String) -> Option<Review> {
        self.review_to_return.clone().map(|mut r| {
            r.status = status;
            r
        })
    }
    async fn add_claim(&self, _course_id: Uuid, _user_id: Uuid, _message: String) -> Claim {
        Claim::default()
    }
    async fn get_my_claims(&self, _user_id: Uuid) -> Vec<Claim> {
        vec![]
    }
    async fn get_claims_by_status(&self, _status: Option<String>) -> Vec<Claim> {
        vec![]
    }
    async fn set_claim_status(&self, _id: Uuid, status: String) -> Option<Claim> {
        self.claim_to_return.clone().map(|mut c| {
            c.status = status;
            c
        })
    }
    async fn get_users(&self) -> Vec<Profile> {
        self.profiles.values().cloned().collect()
    }
    async fn set_user_role(&self, id: Uuid, role: String) -> Option<Profile> {
        self.role_updates.lock().unwrap().push((id, role.clone()));
        self.profiles.get(&id).cloned().map(|mut p| {
            p.is_admin = role == "admin";
            p.role = role;
            p
        })
    }
    async fn delete_user(&self, id: Uuid) -> bool {
        self.deletions.lock().unwrap().push(id);
        self.profiles.contains_key(&id)
    }
    async fn get_stats(&self) -> AdminDashboardStats {
        AdminDashboardStats {
            total_users: self.profiles.len() as i64,
            ..AdminDashboardStats::default()
        }
    }
}

// --- Helpers ---

const SUPER_ADMIN_ID: Uuid = Uuid::from_u128(10);
const STUDENT_ID: Uuid = Uuid::from_u128(11);

fn seeded_repo() -> Arc<MockRepoControl> {
    let mut profiles = HashMap::new();
    profiles.insert(
        SUPER_ADMIN_ID,
        Profile {
            id: SUPER_ADMIN_ID,
            // Deliberately cased differently from the configured allowlist
            // entry; the guard must still match.
            email: "Admin@Gmail.com".to_string(),
            role: "admin".to_string(),
            is_admin: true,
            ..Profile::default()
        },
    );
    profiles.insert(
        STUDENT_ID,
        Profile {
            id: STUDENT_ID,
            email: "sam@example.com".to_string(),
            role: "student".to_string(),
            ..Profile::default()
        },
    );
    Arc::new(MockRepoControl {
        profiles,
        review_to_return: Some(Review::default()),
        claim_to_return: Some(Claim::default()),
        ..MockRepoControl::default()
    })
}

fn app_state(repo: Arc<MockRepoControl>) -> AppState {
    AppState {
        repo,
        identity: Arc::new(MockIdentity::new_failing()),
        config: AppConfig::default(),
    }
}

fn admin_caller() -> CurrentUser {
    CurrentUser {
        id: Uuid::from_u128(99),
        email: "mod@example.com".to_string(),
        actor: Actor::Admin,
    }
}

fn student_caller() -> CurrentUser {
    CurrentUser {
        id: STUDENT_ID,
        email: "sam@example.com".to_string(),
        actor: Actor::Authenticated,
    }
}

// --- Tests ---

#[tokio::test]
async fn test_admin_handlers_refuse_non_admin_actors() {
    // Even if the gate were bypassed, the handlers answer 403 on their own.
    let repo = seeded_repo();
    let state = app_state(repo.clone());

    let result = handlers::get_admin_stats(student_caller(), State(state.clone())).await;
    assert_eq!(result.unwrap_err(), StatusCode::FORBIDDEN);

    let result = handlers::get_admin_users(student_caller(), State(state.clone())).await;
    assert_eq!(result.unwrap_err(), StatusCode::FORBIDDEN);

    let result = handlers::set_user_role(
        student_caller(),
        State(state.clone()),
        Path(STUDENT_ID),
        Json(SetRoleRequest {
            role: "admin".to_string(),
        }),
    )
    .await;
    assert_eq!(result.unwrap_err(), StatusCode::FORBIDDEN);

    let status =
        handlers::delete_user(student_caller(), State(state), Path(SUPER_ADMIN_ID)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Nothing reached the store.
    assert!(repo.role_updates().is_empty());
    assert!(repo.deletions().is_empty());
}

#[tokio::test]
async fn test_admin_stats_served_to_admin() {
    let state = app_state(seeded_repo());
    let stats = handlers::get_admin_stats(admin_caller(), State(state))
        .await
        .unwrap();
    assert_eq!(stats.0.total_users, 2);
}

#[tokio::test]
async fn test_super_admin_role_is_irrevocable() {
    let repo = seeded_repo();
    let state = app_state(repo.clone());

    // Demotion attempt against an allowlisted account: refused, store untouched.
    let result = handlers::set_user_role(
        admin_caller(),
        State(state),
        Path(SUPER_ADMIN_ID),
        Json(SetRoleRequest {
            role: "student".to_string(),
        }),
    )
    .await;

    assert_eq!(result.unwrap_err(), StatusCode::FORBIDDEN);
    assert!(repo.role_updates().is_empty());
}

#[tokio::test]
async fn test_super_admin_cannot_be_deleted() {
    let repo = seeded_repo();
    let state = app_state(repo.clone());

    let status = handlers::delete_user(admin_caller(), State(state), Path(SUPER_ADMIN_ID)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(repo.deletions().is_empty());
}

#[tokio::test]
async fn test_regular_user_role_can_be_changed() {
    let repo = seeded_repo();
    let state = app_state(repo.clone());

    let result = handlers::set_user_role(
        admin_caller(),
        State(state),
        Path(STUDENT_ID),
        Json(SetRoleRequest {
            role: "coach".to_string(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(result.0.role, "coach");
    assert_eq!(repo.role_updates(), vec![(STUDENT_ID, "coach".to_string())]);
}

#[tokio::test]
async fn test_unknown_role_is_rejected() {
    let repo = seeded_repo();
    let state = app_state(repo.clone());

    let result = handlers::set_user_role(
        admin_caller(),
        State(state),
        Path(STUDENT_ID),
        Json(SetRoleRequest {
            role: "superuser".to_string(),
        }),
    )
    .await;

    assert_eq!(result.unwrap_err(), StatusCode::BAD_REQUEST);
    assert!(repo.role_updates().is_empty());
}

#[tokio::test]
async fn test_regular_user_can_be_deleted() {
    let repo = seeded_repo();
    let state = app_state(repo.clone());

    let status = handlers::delete_user(admin_caller(), State(state), Path(STUDENT_ID)).await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(repo.deletions(), vec![STUDENT_ID]);
}

#[tokio::test]
async fn test_delete_unknown_user_is_not_found() {
    let repo = seeded_repo();
    let state = app_state(repo.clone());

    let status = handlers::delete_user(admin_caller(), State(state), Path(Uuid::new_v4())).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    // The guard needs the target's email first; an unknown target never
    // reaches the delete call.
    assert!(repo.deletions().is_empty());
}

#[tokio::test]
async fn test_moderation_accepts_only_known_statuses() {
    let state = app_state(seeded_repo());

    let result = handlers::moderate_review(
        admin_caller(),
        State(state.clone()),
        Path(Uuid::new_v4()),
        Json(ModerationRequest {
            status: "published".to_string(),
        }),
    )
    .await;
    assert_eq!(result.unwrap_err(), StatusCode::BAD_REQUEST);

    let result = handlers::moderate_review(
        admin_caller(),
        State(state),
        Path(Uuid::new_v4()),
        Json(ModerationRequest {
            status: "approved".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(result.0.status, "approved");
}

#[tokio::test]
async fn test_claim_moderation_mirrors_reviews() {
    let state = app_state(seeded_repo());

    let result = handlers::moderate_claim(
        admin_caller(),
        State(state),
        Path(Uuid::new_v4()),
        Json(ModerationRequest {
            status: "rejected".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(result.0.status, "rejected");
}

#[tokio::test]
async fn test_settings_update_requires_a_field() {
    let state = app_state(seeded_repo());

    let result = handlers::update_settings(
        student_caller(),
        State(state),
        Json(review_portal::models::UpdateProfileRequest { display_name: None }),
    )
    .await;
    assert_eq!(result.unwrap_err(), StatusCode::BAD_REQUEST);
}
