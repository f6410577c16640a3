use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use review_portal::{
    AppState,
    config::Env,
    gate::Actor,
    models::{
        AdminDashboardStats, Claim, Course, CreateCourseRequest, CreateReviewRequest, Profile,
        Review,
    },
    repository::Repository,
    session::{Claims, CurrentUser, OptionalSession, RoleMetadata},
};
use std::{sync::Arc, time::SystemTime};
use uuid::Uuid;

// --- Mock Repository for Session/Actor Logic ---

#[derive(Default)]
struct MockSessionRepo {
    profile_to_return: Option<Profile>,
}

#[async_trait]
impl Repository for MockSessionRepo {
    async fn get_profile(&self, _id: Uuid) -> Option<Profile> {
        self.profile_to_return.clone()
    }
    async fn update_display_name(&self, _id: Uuid, _display_name: String) -> Option<Profile> {
        None
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
    async fn set_review_status(&self, _id: Uuid, _status: String) -> Option<Review> {
        None
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
    async fn set_claim_status(&self, _id: Uuid, _status: String) -> Option<Claim> {
        None
    }
    async fn get_users(&self) -> Vec<Profile> {
        vec![]
    }
    async fn set_user_role(&self, _id: Uuid, _role: String) -> Option<Profile> {
        None
    }
    async fn delete_user(&self, _id: Uuid) -> bool {
        false
    }
    async fn get_stats(&self) -> AdminDashboardStats {
        AdminDashboardStats::default()
    }
}

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
const TEST_USER_ID: Uuid = Uuid::from_u128(1);

fn create_token(user_id: Uuid, email: &str, exp_offset: i64) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        iat: now.max(0) as usize,
        exp: (now + exp_offset).max(0) as usize,
        user_metadata: RoleMetadata {
            role: Some("student".to_string()),
        },
    };

    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

fn create_app_state(env: Env, repo: MockSessionRepo) -> AppState {
    let mut config = review_portal::config::AppConfig::default();
    config.env = env;
    config.jwt_secret = TEST_JWT_SECRET.to_string();

    AppState {
        repo: Arc::new(repo),
        identity: Arc::new(review_portal::identity::MockIdentity::new_failing()),
        config,
    }
}

/// Helper to get the mutable Parts struct from a generated Request
fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

// --- Tests ---

#[tokio::test]
async fn test_session_resolved_from_valid_jwt() {
    let token = create_token(TEST_USER_ID, "test@example.com", 3600);
    let app_state = create_app_state(Env::Production, MockSessionRepo::default());

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );

    let OptionalSession(session) = OptionalSession::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    let session = session.expect("valid token should produce a session");
    assert_eq!(session.user_id, TEST_USER_ID);
    assert_eq!(session.email, "test@example.com");
    assert_eq!(session.metadata_role.as_deref(), Some("student"));
}

#[tokio::test]
async fn test_session_resolved_from_cookie() {
    let token = create_token(TEST_USER_ID, "cookie@example.com", 3600);
    let app_state = create_app_state(Env::Production, MockSessionRepo::default());

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::COOKIE,
        header::HeaderValue::from_str(&format!("theme=dark; sb-access-token={}", token)).unwrap(),
    );

    let OptionalSession(session) = OptionalSession::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    assert_eq!(session.unwrap().email, "cookie@example.com");
}

#[tokio::test]
async fn test_expired_jwt_is_anonymous() {
    // Expired well past the validation leeway.
    let token = create_token(TEST_USER_ID, "late@example.com", -3600);
    let app_state = create_app_state(Env::Production, MockSessionRepo::default());

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );

    let OptionalSession(session) = OptionalSession::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    // An invalid token and a missing token are the same thing downstream.
    assert!(session.is_none());
}

#[tokio::test]
async fn test_missing_token_rejects_current_user() {
    let app_state = create_app_state(Env::Production, MockSessionRepo::default());

    let mut parts = get_request_parts(Method::GET, "/profile".parse().unwrap());
    let result = CurrentUser::from_request_parts(&mut parts, &app_state).await;

    assert!(result.is_err());
    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_current_user_resolves_actor_through_profile() {
    let token = create_token(TEST_USER_ID, "mod@example.com", 3600);
    let repo = MockSessionRepo {
        profile_to_return: Some(Profile {
            id: TEST_USER_ID,
            email: "mod@example.com".to_string(),
            role: "admin".to_string(),
            is_admin: false,
            ..Profile::default()
        }),
    };
    let app_state = create_app_state(Env::Production, repo);

    let mut parts = get_request_parts(Method::GET, "/admin/stats".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );

    let user = CurrentUser::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    assert_eq!(user.id, TEST_USER_ID);
    assert_eq!(user.actor, Actor::Admin);
}

#[tokio::test]
async fn test_local_bypass_success() {
    let mock_user_id = Uuid::new_v4();
    let app_state = create_app_state(Env::Local, MockSessionRepo::default());

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&mock_user_id.to_string()).unwrap(),
    );
    parts.headers.insert(
        header::HeaderName::from_static("x-user-email"),
        header::HeaderValue::from_static("local@dev.com"),
    );

    let OptionalSession(session) = OptionalSession::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();

    let session = session.expect("bypass should produce a session in local env");
    assert_eq!(session.user_id, mock_user_id);
    assert_eq!(session.email, "local@dev.com");
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let mock_user_id = Uuid::new_v4();
    let app_state = create_app_state(Env::Production, MockSessionRepo::default());

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    // Provide ONLY the local bypass header
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&mock_user_id.to_string()).unwrap(),
    );

    let OptionalSession(session) = OptionalSession::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    assert!(session.is_none());

    let result = CurrentUser::from_request_parts(&mut parts, &app_state).await;
    assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_has_no_cross_request_memory() {
    // Two back-to-back resolutions of the same request parts agree; there is
    // no cached actor state to go stale.
    let token = create_token(TEST_USER_ID, "test@example.com", 3600);
    let app_state = create_app_state(Env::Production, MockSessionRepo::default());

    for _ in 0..2 {
        let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
        parts.headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        let OptionalSession(session) = OptionalSession::from_request_parts(&mut parts, &app_state)
            .await
            .unwrap();
        assert_eq!(session.unwrap().user_id, TEST_USER_ID);
    }
}
