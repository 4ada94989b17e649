//! Bearer-token authentication for the HTTP transport.
//!
//! Tokens are compared in constant time. Rejections use the same
//! `{kind, message, suggestion}` shape as tool errors so agents can read
//! both the same way.

use crate::error::{GatewayError, GatewayResult};
use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

/// Tokens accepted by the HTTP transport. Empty means authentication is off.
#[derive(Clone, Default)]
pub struct BearerAuth {
    tokens: Vec<Vec<u8>>,
}

impl BearerAuth {
    /// Build from configured tokens. Blank tokens are a configuration error.
    pub fn from_tokens(tokens: &[String]) -> GatewayResult<Self> {
        let mut accepted: Vec<Vec<u8>> = Vec::with_capacity(tokens.len());
        for token in tokens {
            let token = token.trim();
            if token.is_empty() {
                return Err(GatewayError::configuration("empty auth token in configuration"));
            }
            let bytes = token.as_bytes().to_vec();
            if !accepted.contains(&bytes) {
                accepted.push(bytes);
            }
        }
        Ok(Self { tokens: accepted })
    }

    pub fn is_enabled(&self) -> bool {
        !self.tokens.is_empty()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Check a presented token against every configured one without short-circuiting.
    pub fn verify(&self, presented: &str) -> bool {
        let presented = presented.as_bytes();
        self.tokens.iter().fold(false, |found, expected| {
            // ct_eq on slices of different length returns false without leaking where they differ
            found | bool::from(expected.as_slice().ct_eq(presented))
        })
    }
}

impl std::fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuth")
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

/// Axum middleware rejecting requests without a valid bearer token.
pub async fn require_bearer(
    State(auth): State<Arc<BearerAuth>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match bearer_token(&request) {
        Ok(token) if auth.verify(token) => next.run(request).await,
        Ok(token) => {
            warn!(token_prefix = %mask(token), "Rejected HTTP request: unknown bearer token");
            unauthorized(
                "Invalid bearer token",
                "Use a token configured on the server (SQL_GATEWAY_AUTH_TOKENS)",
            )
        }
        Err(reason) => {
            warn!(reason, "Rejected HTTP request: no usable Authorization header");
            unauthorized(reason, "Send 'Authorization: Bearer <token>'")
        }
    }
}

fn bearer_token(request: &Request<Body>) -> Result<&str, &'static str> {
    let value = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or("Missing Authorization header")?
        .to_str()
        .map_err(|_| "Authorization header contains invalid characters")?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or("Authorization header must use the Bearer scheme")?
        .trim();
    if token.is_empty() {
        return Err("Bearer token is empty");
    }
    Ok(token)
}

fn mask(token: &str) -> String {
    match token.char_indices().nth(3) {
        Some((idx, _)) => format!("{}***", &token[..idx]),
        None => "***".to_string(),
    }
}

fn unauthorized(message: &str, suggestion: &str) -> Response {
    let body = json!({
        "error": {
            "kind": "unauthorized",
            "message": message,
            "suggestion": suggestion,
        }
    });
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
