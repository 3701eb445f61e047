/// Router Module Index
///
/// Routing is split by access level so that authentication is applied as a layer on
/// a whole router, never handler by handler.

/// Routes accessible without an identity.
pub mod public;

/// Note routes. Wrapped in the configured auth middleware stack by `create_router`.
pub mod authenticated;
