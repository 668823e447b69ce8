//! Bearer token identity for authenticated calls.
//!
//! The identity provider issues HS256 session tokens whose `sub` claim is the
//! external identity id. Handlers take [`Identity`] to require a caller, or
//! `Option<Identity>` when anonymous calls are allowed.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::config::Auth;
use crate::error::ServiceError;
use crate::handler::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
}

impl Identity {
    pub fn new(subject: impl Into<String>) -> Self {
        Identity {
            subject: subject.into(),
        }
    }
}

#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(cfg: &Auth) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &cfg.jwt_issuer {
            validation.set_issuer(&[issuer]);
        }

        TokenVerifier {
            key: DecodingKey::from_secret(cfg.jwt_secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Identity, ServiceError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::warn!(error = %e, "rejected bearer token");
            ServiceError::Unauthenticated
        })?;

        if data.claims.sub.is_empty() {
            return Err(ServiceError::Unauthenticated);
        }

        Ok(Identity::new(data.claims.sub))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for Identity {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ServiceError::Unauthenticated)?;
        state.auth.verify(token)
    }
}

#[cfg(test)]
pub(crate) fn issue_token(secret: &str, subject: &str) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};

    let claims = Claims {
        sub: subject.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        iss: None,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
}
