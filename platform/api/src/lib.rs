use std::sync::Arc;

use async_graphql::{Error, ErrorExtensions};
use serde::Serialize;
use thiserror::Error;

/// Shared API result type.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error, Clone)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("bad request: {0}")]
    InvalidInput(String),
    #[error("internal server error")]
    Internal(Arc<anyhow::Error>),
}

/// JSON body returned by the REST routes on failure.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub error: String,
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    /// HTTP status the JSON routes answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::InvalidInput(_) => 400,
            ApiError::Internal(_) => 500,
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        tracing::error!(error = ?err, "request failed");
        Self::Internal(Arc::new(err))
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code(),
            error: self.to_string(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::internal(value)
    }
}

impl ErrorExtensions for ApiError {
    fn extend(&self) -> Error {
        let mut err = Error::new(self.to_string());
        err = err.extend_with(|_err, e| {
            e.set("code", self.code());
        });
        if let ApiError::InvalidInput(_) = self {
            err = err.extend_with(|_err, e| {
                e.set("type", "BAD_REQUEST");
            });
        }
        err
    }
}

/// Convert any error into a GraphQL error payload while hiding internals.
pub fn internal_error(err: impl Into<anyhow::Error>) -> Error {
    ApiError::internal(err.into()).extend()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql::Value;

    #[test]
    fn internal_errors_are_masked() {
        let err = internal_error(anyhow::anyhow!("boom"));
        assert_eq!(err.message, "internal server error");
        let extra = err.extensions.as_ref().and_then(|map| map.get("code"));
        let code = extra.cloned();
        assert_eq!(code, Some(Value::from("INTERNAL")));
    }

    #[test]
    fn statuses_follow_the_error_kind() {
        assert_eq!(ApiError::NotFound("deal".into()).http_status(), 404);
        assert_eq!(ApiError::InvalidInput("empty".into()).http_status(), 400);
        assert_eq!(
            ApiError::internal(anyhow::anyhow!("db down")).http_status(),
            500
        );
    }

    #[test]
    fn bad_requests_are_tagged() {
        let err = ApiError::InvalidInput("nothing to update".into()).extend();
        assert_eq!(err.message, "bad request: nothing to update");
        let kind = err
            .extensions
            .as_ref()
            .and_then(|map| map.get("type"))
            .cloned();
        assert_eq!(kind, Some(Value::from("BAD_REQUEST")));
    }

    #[test]
    fn body_carries_code_and_message() {
        let body = ApiError::NotFound("deal".into()).body();
        assert_eq!(body.code, "NOT_FOUND");
        assert_eq!(body.error, "deal not found");
    }
}
