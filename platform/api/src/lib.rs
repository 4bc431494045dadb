use std::sync::Arc;

use async_graphql::{Error, ErrorExtensions};
use platform_authz::{AllowReason, Decision, DenyReason};
use thiserror::Error;
use tracing::warn;

/// Shared GraphQL result type.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error, Clone)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("{message}")]
    Forbidden {
        message: String,
        reason: DenyReason,
    },
    #[error("bad request: {0}")]
    InvalidInput(String),
    #[error("internal server error")]
    Internal(Arc<anyhow::Error>),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::Forbidden { .. } => "FORBIDDEN",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self::Internal(Arc::new(err))
    }

    pub fn forbidden(message: impl Into<String>, reason: DenyReason) -> Self {
        Self::Forbidden {
            message: message.into(),
            reason,
        }
    }
}

impl ErrorExtensions for ApiError {
    fn extend(&self) -> Error {
        let mut err = Error::new(self.to_string());
        err = err.extend_with(|_err, e| {
            e.set("code", self.code());
        });
        match self {
            ApiError::InvalidInput(_) => {
                err = err.extend_with(|_err, e| {
                    e.set("type", "BAD_REQUEST");
                });
            }
            ApiError::Forbidden { reason, .. } => {
                let reason = reason.code();
                err = err.extend_with(|_err, e| {
                    e.set("reason", reason);
                });
            }
            _ => {}
        }
        err
    }
}

/// Enforcement point for a policy decision.
///
/// Denials without a caller identity surface as `UNAUTHORIZED`, every other
/// denial as `FORBIDDEN` carrying `message` and the denial code.
pub fn ensure_allowed(decision: Decision, message: impl Into<String>) -> ApiResult<AllowReason> {
    match decision {
        Decision::Allowed(reason) => Ok(reason),
        Decision::Denied(DenyReason::NoIdentity) => Err(ApiError::Unauthorized),
        Decision::Denied(reason) => {
            let message = message.into();
            warn!(reason = reason.code(), %message, "request rejected by access policy");
            Err(ApiError::forbidden(message, reason))
        }
    }
}

/// Convert any error into a GraphQL error payload while hiding internals.
pub fn internal_error(err: impl Into<anyhow::Error>) -> Error {
    ApiError::internal(err.into()).extend()
}
