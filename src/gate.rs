use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    AppState,
    config::SuperAdmins,
    repository::RepositoryState,
    session::{OptionalSession, Session},
};

/// Actor
///
/// The access-control classification of the current request's user. Derived
/// fresh on every request from the session and the profile store; never
/// persisted, never cached across requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    Authenticated,
    Admin,
}

impl Actor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Actor::Anonymous => "anonymous",
            Actor::Authenticated => "authenticated",
            Actor::Admin => "admin",
        }
    }
}

/// RouteClass
///
/// Static categorization of a request path. Classification is a pure function
/// of the path string; the session plays no part in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    ProtectedUser,
    AdminOnly,
}

/// GateDecision
///
/// The gate's verdict for a request: render the requested route, or send the
/// client elsewhere. Redirect targets are the only side channel; the gate
/// mutates no identity or profile state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Redirect(&'static str),
}

/// The auth flow lives under this prefix. Admin confinement (rule 3) must not
/// fire for these paths or the callback could never complete.
pub const AUTH_PREFIX: &str = "/auth";

/// Prefix for bundled static files.
const STATIC_PREFIX: &str = "/assets";

/// Path prefixes that require any authenticated user.
const PROTECTED_PREFIXES: [&str; 3] = ["/add-course", "/profile", "/settings"];

/// Asset and static-file paths bypass the gate entirely: the gate guards
/// pages, not files, and resolving an actor per stylesheet fetch would hit
/// the profile store for nothing.
pub fn is_asset_path(path: &str) -> bool {
    path.contains('.') || path == STATIC_PREFIX || path.starts_with("/assets/")
}

/// True when `path` equals `prefix` or sits underneath it. A plain
/// starts_with would also capture e.g. "/profiles-export" for "/profile".
fn under_prefix(path: &str, prefix: &str) -> bool {
    path == prefix || (path.starts_with(prefix) && path.as_bytes().get(prefix.len()) == Some(&b'/'))
}

/// classify_route
///
/// Pure request-path classification. Precedence: the AdminOnly check is
/// evaluated first, then ProtectedUser, and everything else is Public by
/// default, including the landing page, login/signup, and the auth flow.
pub fn classify_route(path: &str) -> RouteClass {
    if under_prefix(path, "/admin") {
        return RouteClass::AdminOnly;
    }

    if PROTECTED_PREFIXES.iter().any(|p| under_prefix(path, p))
        || path.contains("write-review")
        || path.contains("claim")
    {
        return RouteClass::ProtectedUser;
    }

    RouteClass::Public
}

/// resolve_actor
///
/// The single place admin status is decided; both the gate middleware and the
/// handler-side CurrentUser extractor call this, so the check cannot diverge.
///
/// Resolution order:
/// 1. No session: Anonymous.
/// 2. Super-admin allowlist match (case-insensitive): Admin, unconditionally;
///    the profile store is not consulted and cannot override this.
/// 3. Profile record says admin (role = 'admin' or is_admin flag): Admin.
/// 4. Otherwise, including a missing profile row and a failed lookup:
///    Authenticated. A store outage degrades basic access upward, never
///    privileges upward.
///
/// The provider's metadata role is deliberately not an input here: the
/// profile store is authoritative for admin status.
pub async fn resolve_actor(
    session: Option<&Session>,
    repo: &RepositoryState,
    super_admins: &SuperAdmins,
) -> Actor {
    let Some(session) = session else {
        return Actor::Anonymous;
    };

    if super_admins.contains(&session.email) {
        return Actor::Admin;
    }

    match repo.get_profile(session.user_id).await {
        Some(profile) if profile.role == "admin" || profile.is_admin => Actor::Admin,
        _ => Actor::Authenticated,
    }
}

/// evaluate
///
/// Applies route policy to an already-resolved actor. Pure and synchronous,
/// so the full decision table is directly testable.
///
/// Precedence order:
/// 1. AdminOnly route, actor is not Admin: redirect home. Unauthenticated and
///    unauthorized are treated identically; never a /login redirect here, so
///    the response does not reveal which paths require elevated privilege.
/// 2. ProtectedUser route, Anonymous actor: redirect to /login.
/// 3. Admin actor on a Public route outside the auth flow: redirect to /admin.
///    Admins are confined to the admin area, even on their first visit.
/// 4. Otherwise: proceed.
pub fn evaluate(path: &str, actor: Actor) -> GateDecision {
    if is_asset_path(path) {
        return GateDecision::Proceed;
    }

    let route = classify_route(path);

    if route == RouteClass::AdminOnly && actor != Actor::Admin {
        return GateDecision::Redirect("/");
    }

    if route == RouteClass::ProtectedUser && actor == Actor::Anonymous {
        return GateDecision::Redirect("/login");
    }

    if actor == Actor::Admin && route == RouteClass::Public && !path.starts_with(AUTH_PREFIX) {
        return GateDecision::Redirect("/admin");
    }

    GateDecision::Proceed
}

/// access_gate
///
/// The request middleware wrapping the entire router: every inbound request
/// passes through here before any handler runs. Resolves the actor, evaluates
/// route policy, and either forwards the request or answers with a 307
/// redirect.
///
/// Asset paths short-circuit before actor resolution to keep static fetches
/// off the profile store.
pub async fn access_gate(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();

    if is_asset_path(&path) {
        return next.run(request).await;
    }

    let actor = resolve_actor(session.as_ref(), &state.repo, &state.config.super_admins).await;

    match evaluate(&path, actor) {
        GateDecision::Proceed => next.run(request).await,
        GateDecision::Redirect(target) => Redirect::temporary(target).into_response(),
    }
}
