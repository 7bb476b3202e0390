//! Authentication middleware.
//!
//! Validates the bearer token on each request and injects an
//! [`Actor`] into request extensions for handlers to extract. Token
//! issuance lives elsewhere; this layer only verifies.
//!
//! The role claim is parsed into the closed [`crate::domain::Role`] enum
//! exactly here. A token whose role string is unrecognized still
//! authenticates (the identity is real), but the resulting actor carries
//! no role and the policy engine denies it everything. Authentication
//! failures are 401s; authorization failures stay 403s downstream.

use axum::{
    body::Body,
    extract::{FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::future::BoxFuture;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::{
    sync::Arc,
    task::{Context, Poll},
};
use thiserror::Error;
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::domain::{Actor, Role, UserId};

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication credentials")]
    MissingCredentials,

    #[error("Invalid authentication token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (code, message) = match &self {
            Self::MissingCredentials => (
                "MISSING_CREDENTIALS",
                "Authentication credentials are required",
            ),
            Self::InvalidToken => ("INVALID_TOKEN", "The provided token is invalid"),
            Self::TokenExpired => ("TOKEN_EXPIRED", "The authentication token has expired"),
        };

        let body = serde_json::json!({
            "success": false,
            "error": {
                "code": code,
                "message": message,
            }
        });
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Claims
// ═══════════════════════════════════════════════════════════════════════════════

/// Bearer token claims this service consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: i64,
    /// Role name as issued. Parsed once into the closed enum.
    pub role: String,
    /// Whether the account completed email verification.
    #[serde(default)]
    pub verified: bool,
    /// Expiry (unix seconds).
    pub exp: i64,
}

impl Claims {
    /// Build the actor this token represents. Fail-closed on the role:
    /// an unknown string becomes `None`, never an error.
    pub fn to_actor(&self) -> Actor {
        let role = Role::parse(&self.role);
        if role.is_none() {
            warn!(user_id = self.sub, role = %self.role, "unrecognized role claim");
        }
        Actor {
            id: UserId(self.sub),
            role,
            verified: self.verified,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tower Layer
// ═══════════════════════════════════════════════════════════════════════════════

/// Layer that authenticates every request passing through it.
#[derive(Clone)]
pub struct AuthLayer {
    decoding_key: Arc<DecodingKey>,
}

impl AuthLayer {
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            decoding_key: Arc::new(DecodingKey::from_secret(jwt_secret.as_bytes())),
        }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            decoding_key: self.decoding_key.clone(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tower Service
// ═══════════════════════════════════════════════════════════════════════════════

/// Service that validates the bearer token and injects the [`Actor`].
#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    decoding_key: Arc<DecodingKey>,
}

impl<S> Service<Request<Body>> for AuthService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let decoding_key = self.decoding_key.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let token = match bearer_token(&request) {
                Some(token) => token,
                None => return Ok(AuthError::MissingCredentials.into_response()),
            };

            let claims = match decode::<Claims>(&token, &decoding_key, &Validation::default()) {
                Ok(data) => data.claims,
                Err(err) => {
                    debug!(error = %err, "token validation failed");
                    let auth_err = match err.kind() {
                        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                            AuthError::TokenExpired
                        }
                        _ => AuthError::InvalidToken,
                    };
                    return Ok(auth_err.into_response());
                }
            };

            request.extensions_mut().insert(claims.to_actor());

            inner.call(request).await
        })
    }
}

fn bearer_token(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.to_string())
}

// ═══════════════════════════════════════════════════════════════════════════════
// Actor extractor
// ═══════════════════════════════════════════════════════════════════════════════

/// Extract the authenticated [`Actor`] placed by [`AuthService`].
#[axum::async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Actor>().copied().ok_or_else(|| {
            let body = serde_json::json!({
                "success": false,
                "error": {
                    "code": "MISSING_AUTH_CONTEXT",
                    "message": "Authentication context not available. Ensure the auth middleware is applied.",
                }
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: &str) -> Claims {
        Claims {
            sub: 7,
            role: role.to_string(),
            verified: true,
            exp: 4102444800,
        }
    }

    #[test]
    fn test_claims_to_actor() {
        let actor = claims("Mentor").to_actor();
        assert_eq!(actor.id, UserId(7));
        assert_eq!(actor.role, Some(Role::Mentor));
        assert!(actor.verified);
    }

    #[test]
    fn test_unknown_role_claim_yields_roleless_actor() {
        let actor = claims("Superuser").to_actor();
        assert_eq!(actor.id, UserId(7));
        assert_eq!(actor.role, None);
    }

    #[test]
    fn test_token_roundtrip() {
        let secret = "test-secret";
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &claims("Admin"),
            &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(decoded.claims.sub, 7);
        assert_eq!(decoded.claims.role, "Admin");
    }
}
