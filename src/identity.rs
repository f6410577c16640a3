use async_trait::async_trait;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::session::{RoleMetadata, Session};

/// IdentityError
///
/// Failure taxonomy for outbound identity-provider calls. Every variant is
/// handled locally by the auth flow: a code-exchange failure is terminal for
/// the request (redirect to the auth error page), a role-update failure skips
/// the promotion, and a sign-out failure is logged and ignored.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("authorization code exchange failed: {0}")]
    CodeExchange(String),
    #[error("role metadata update failed: {0}")]
    RoleUpdate(String),
    #[error("sign-out failed: {0}")]
    SignOut(String),
    #[error("identity provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

/// ExchangeGrant
///
/// The result of redeeming an authorization code: the bearer token for
/// follow-up provider calls plus the session identity it asserts.
#[derive(Debug, Clone)]
pub struct ExchangeGrant {
    pub access_token: String,
    pub session: Session,
}

/// IdentityProvider Contract
///
/// Defines the abstract contract for the hosted identity service. This trait
/// allows us to swap the concrete implementation (the real Supabase client
/// (SupabaseIdentity) in production, the in-memory Mock (MockIdentity) during
/// testing) without affecting the calling handlers.
///
/// Session *validation* is not part of this contract: the provider signs
/// session JWTs and this service verifies them locally (see `session`).
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchanges a one-time authorization code for a session.
    async fn exchange_code(&self, code: &str) -> Result<ExchangeGrant, IdentityError>;

    /// Writes the given role into the user's provider-side metadata.
    /// The caller is responsible for the promotion rules; this is a dumb write.
    async fn update_role_metadata(&self, access_token: &str, role: &str)
    -> Result<(), IdentityError>;

    /// Revokes the session behind the given token.
    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError>;
}

/// IdentityState
///
/// The concrete type used to share the identity client across the application state.
pub type IdentityState = Arc<dyn IdentityProvider>;

// --- The Real Implementation (Supabase auth REST API) ---

/// SupabaseIdentity
///
/// The concrete implementation backed by the provider's auth REST endpoints:
/// `/auth/v1/token` (PKCE code exchange), `/auth/v1/user` (metadata update)
/// and `/auth/v1/logout`. All calls carry the project's publishable key as
/// the `apikey` header.
#[derive(Clone)]
pub struct SupabaseIdentity {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

/// Wire shape of the provider's token-grant response.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: ProviderUser,
}

/// Wire shape of the provider's user record, reduced to the fields we read.
#[derive(Deserialize)]
struct ProviderUser {
    id: Uuid,
    #[serde(default)]
    email: String,
    #[serde(default)]
    user_metadata: RoleMetadata,
}

impl SupabaseIdentity {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentity {
    /// exchange_code
    ///
    /// POST /auth/v1/token?grant_type=pkce. A non-2xx response (expired or
    /// already-used code, typically) is mapped to CodeExchange; the caller
    /// treats it as terminal and never retries.
    async fn exchange_code(&self, code: &str) -> Result<ExchangeGrant, IdentityError> {
        let url = format!("{}/auth/v1/token?grant_type=pkce", self.base_url);

        let response = self
            .http
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "auth_code": code }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::CodeExchange(format!("{status}: {body}")));
        }

        let grant = response.json::<TokenResponse>().await?;

        Ok(ExchangeGrant {
            access_token: grant.access_token,
            session: Session {
                user_id: grant.user.id,
                email: grant.user.email,
                metadata_role: grant.user.user_metadata.role,
            },
        })
    }

    /// update_role_metadata
    ///
    /// PUT /auth/v1/user with the user's own bearer token. The provider merges
    /// `data` into user_metadata; the signup trigger mirrors it into the
    /// profile row.
    async fn update_role_metadata(
        &self,
        access_token: &str,
        role: &str,
    ) -> Result<(), IdentityError> {
        let url = format!("{}/auth/v1/user", self.base_url);

        let response = self
            .http
            .put(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "data": { "role": role } }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::RoleUpdate(format!("{status}: {body}")));
        }

        Ok(())
    }

    /// sign_out
    ///
    /// POST /auth/v1/logout. Best-effort: the caller clears the session cookie
    /// whether or not the provider acknowledged the revocation.
    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        let url = format!("{}/auth/v1/logout", self.base_url);

        let response = self
            .http
            .post(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IdentityError::SignOut(response.status().to_string()));
        }

        Ok(())
    }
}

// --- The Mock Implementation (tests, local development) ---

/// MockIdentity
///
/// In-memory stand-in for the provider. Returns a pre-configured grant from
/// `exchange_code` and records every metadata write so tests can assert on
/// exactly which promotions were applied.
pub struct MockIdentity {
    grant: Option<ExchangeGrant>,
    fail_role_update: bool,
    recorded_updates: Mutex<Vec<String>>,
    signed_out: Mutex<Vec<String>>,
}

impl MockIdentity {
    /// A provider that successfully exchanges any code for the given identity.
    pub fn new(user_id: Uuid, email: &str, metadata_role: Option<&str>) -> Self {
        Self {
            grant: Some(ExchangeGrant {
                access_token: format!("mock-token-{user_id}"),
                session: Session {
                    user_id,
                    email: email.to_string(),
                    metadata_role: metadata_role.map(str::to_string),
                },
            }),
            fail_role_update: false,
            recorded_updates: Mutex::new(vec![]),
            signed_out: Mutex::new(vec![]),
        }
    }

    /// A provider whose code exchange always fails (expired/invalid code).
    pub fn new_failing() -> Self {
        Self {
            grant: None,
            fail_role_update: false,
            recorded_updates: Mutex::new(vec![]),
            signed_out: Mutex::new(vec![]),
        }
    }

    /// Makes `update_role_metadata` fail while the exchange still succeeds.
    pub fn with_failing_role_update(mut self) -> Self {
        self.fail_role_update = true;
        self
    }

    /// Every role value successfully written, in call order.
    pub fn recorded_updates(&self) -> Vec<String> {
        self.recorded_updates.lock().unwrap().clone()
    }

    /// Every token passed to sign_out.
    pub fn signed_out_tokens(&self) -> Vec<String> {
        self.signed_out.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityProvider for MockIdentity {
    async fn exchange_code(&self, code: &str) -> Result<ExchangeGrant, IdentityError> {
        self.grant
            .clone()
            .ok_or_else(|| IdentityError::CodeExchange(format!("invalid code: {code}")))
    }

    async fn update_role_metadata(
        &self,
        _access_token: &str,
        role: &str,
    ) -> Result<(), IdentityError> {
        if self.fail_role_update {
            return Err(IdentityError::RoleUpdate("mock failure".to_string()));
        }
        self.recorded_updates.lock().unwrap().push(role.to_string());
        Ok(())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        self.signed_out
            .lock()
            .unwrap()
            .push(access_token.to_string());
        Ok(())
    }
}
