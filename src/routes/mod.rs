/// Router Module Index
///
/// Routing is split by access level so each group carries its protection as a
/// router layer rather than inside handlers.

/// Routes open to anonymous callers.
pub mod public;

/// Routes requiring a verified principal (`AuthPrincipal` middleware).
pub mod authenticated;

/// Dashboard views, each behind the access guard with its own policy.
pub mod dashboards;
