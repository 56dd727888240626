/// Router Module Index
///
/// Routes are grouped by how access is enforced. Page routes rely on the access gate
/// installed in `create_router`; API routes sit under the bypass prefix and check the
/// session themselves through the `SessionUser` extractor.

/// Auth pages (at their configured paths), health check and the auth endpoints.
/// No session required.
pub mod public;

/// Session-only JSON API (registry, dashboard counters, image analysis).
pub mod authenticated;

/// `/`, the admin panel pages and the configured landing page. Gated by the access router.
pub mod admin;
