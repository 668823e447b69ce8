use std::fmt;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::api::ErrorResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Snippet,
    Comment,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Entity::*;
        match self {
            User => write!(f, "User"),
            Snippet => write!(f, "Snippet"),
            Comment => write!(f, "Comment"),
        }
    }
}

#[derive(Debug)]
pub enum ServiceError {
    Unauthenticated,
    Unauthorized(String),
    NotFound(Entity),
    ConfigurationError(String),
    VerificationFailure(String),
    BadRequest(String),
    InternalError(anyhow::Error),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        use ServiceError::*;
        match self {
            Unauthenticated => StatusCode::UNAUTHORIZED,
            Unauthorized(_) => StatusCode::FORBIDDEN,
            NotFound(_) => StatusCode::NOT_FOUND,
            ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            VerificationFailure(_) => StatusCode::BAD_REQUEST,
            BadRequest(_) => StatusCode::BAD_REQUEST,
            InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_not_found(&self, entity: Entity) -> bool {
        matches!(self, ServiceError::NotFound(e) if *e == entity)
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ServiceError::*;
        match self {
            Unauthenticated => write!(f, "Unauthenticated"),
            Unauthorized(s) => write!(f, "Unauthorized: {}", s),
            NotFound(e) => write!(f, "NotFound: {}", e),
            ConfigurationError(s) => write!(f, "ConfigurationError: {}", s),
            VerificationFailure(s) => write!(f, "VerificationFailure: {}", s),
            BadRequest(s) => write!(f, "BadRequest: {}", s),
            InternalError(e) => write!(f, "InternalError: {}", e),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        use ServiceError::*;
        match self {
            InternalError(e) => Some(&**e),
            _ => None,
        }
    }
}

impl From<libsql::Error> for ServiceError {
    fn from(error: libsql::Error) -> Self {
        ServiceError::InternalError(error.into())
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(error: anyhow::Error) -> Self {
        ServiceError::InternalError(error)
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ServiceError::InternalError(e) => {
                tracing::error!(error = %crate::unpack_error(&**e), "internal error");
                "internal error".to_string()
            }
            ServiceError::ConfigurationError(s) => {
                tracing::error!(error = %s, "service misconfigured");
                "service misconfigured".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
