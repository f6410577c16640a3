use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Auth Flow Router Module
///
/// The identity provider redirects back into these routes, so they must stay
/// reachable for every actor: the route classifier marks /auth/* Public, and
/// the gate's admin-confinement rule explicitly skips the /auth prefix.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        // GET /auth/callback?code=...&role=...&next=...
        // Completes sign-in: exchanges the authorization code for a session,
        // applies the one-way role promotion, and redirects per the resolved actor.
        .route("/auth/callback", get(handlers::auth_callback))
        // POST /auth/signout
        // Revokes the session with the provider and clears the session cookie.
        .route("/auth/signout", post(handlers::sign_out))
        // GET /auth/auth-code-error
        // The dedicated terminal error page for failed code exchanges.
        .route("/auth/auth-code-error", get(handlers::auth_code_error))
}
