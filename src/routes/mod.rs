/// Router Module Index
///
/// Organizes the application's routing logic into security-segregated modules.
/// The Access Gate middleware wraps all of them and enforces route policy
/// before any handler runs; the per-handler extractors and role checks are the
/// second layer of the Defense-in-Depth strategy.
///
/// The modules map directly to the route classification tiers.

/// Routes accessible to all visitors (anonymous, read-only).
pub mod public;

/// The auth flow: callback, sign-out and the dedicated error page. Public by
/// classification, but excluded from admin confinement so sign-in can finish.
pub mod auth;

/// Routes requiring any authenticated user (student or coach).
pub mod authenticated;

/// Routes restricted exclusively to administrators.
pub mod admin;
