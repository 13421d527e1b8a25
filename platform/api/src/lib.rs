use std::sync::Arc;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use platform_authn::AuthnError;
use platform_authz::AuthzError;
use platform_db::DbError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Shared handler result type.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error, Clone)]
pub enum ApiError {
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("forbidden")]
    Forbidden {
        resource: &'static str,
        action: &'static str,
    },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("bad request: {0}")]
    InvalidInput(String),
    #[error("internal server error")]
    Internal(Arc<anyhow::Error>),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    action: Option<&'static str>,
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "UNAUTHENTICATED",
            ApiError::Forbidden { .. } => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self::Internal(Arc::new(err))
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::internal(value)
    }
}

impl From<AuthzError> for ApiError {
    fn from(value: AuthzError) -> Self {
        match value {
            AuthzError::Denied {
                resource, action, ..
            } => ApiError::Forbidden { resource, action },
            err @ AuthzError::Evaluation { .. } => ApiError::internal(err.into()),
        }
    }
}

impl From<AuthnError> for ApiError {
    fn from(value: AuthnError) -> Self {
        if value.is_unauthenticated() {
            ApiError::Unauthenticated
        } else {
            ApiError::internal(value.into())
        }
    }
}

impl From<DbError> for ApiError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::NotFound(what) => ApiError::NotFound(what),
            DbError::Conflict(message) => ApiError::Conflict(message),
            other => ApiError::internal(other.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(source) = &self {
            error!(error = ?source, "request failed");
        }
        let (resource, action) = match &self {
            ApiError::Forbidden { resource, action } => (Some(*resource), Some(*action)),
            _ => (None, None),
        };
        let body = ErrorBody {
            code: self.code(),
            message: self.to_string(),
            resource,
            action,
        };
        (self.status(), Json(body)).into_response()
    }
}
