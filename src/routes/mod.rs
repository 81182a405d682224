/// Router Module Index
///
/// Routes are split by access level. Anything under `authenticated` sits
/// behind the `auth_middleware` layer applied in `create_router`.

/// Health check plus the entry points of the identity flow.
pub mod public;

/// Everything else. Requires a valid Bearer access token.
pub mod authenticated;
