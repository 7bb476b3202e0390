//! Request-level middleware.

pub mod auth;

pub use auth::{AuthError, AuthLayer, AuthService, Claims};
