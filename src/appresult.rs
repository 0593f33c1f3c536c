use axum::{extract::{rejection::{JsonRejection, QueryRejection}, ws::rejection::WebSocketUpgradeRejection}, http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Auth(String),
    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable kind, shared by HTTP bodies and socket error events.
    pub fn kind(&self) -> &'static str {
        use AppError::*;
        match self {
            Validation(_) => "validation_error",
            Conflict(_) => "conflict_error",
            NotFound(_) => "not_found_error",
            Auth(_) => "auth_error",
            Storage(_) => "storage_error",
            Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        use AppError::*;
        match self {
            Validation(_) => StatusCode::BAD_REQUEST,
            Conflict(_) => StatusCode::CONFLICT,
            NotFound(_) => StatusCode::NOT_FOUND,
            Auth(_) => StatusCode::UNAUTHORIZED,
            Storage(_) | Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to a client. Storage and internal details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Storage(_) => "storage unavailable".to_owned(),
            AppError::Internal(_) => "internal error".to_owned(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Storage(err) => tracing::error!(error = %err, "storage error"),
            AppError::Internal(err) => tracing::error!(error = ?err, "internal error"),
            _ => {}
        }

        (
            self.status(),
            Json(json!({
                "error": self.public_message(),
                "kind": self.kind(),
            })),
        )
            .into_response()
    }
}

macro_rules! rejection_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(rejection: $E) -> Self {
                Self::Validation(rejection.body_text())
            }
        }
    };
}

rejection_impl!(JsonRejection);
rejection_impl!(QueryRejection);
rejection_impl!(WebSocketUpgradeRejection);

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        Self::Internal(anyhow::Error::from(err).context("malformed id in store"))
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        Self::Internal(anyhow::Error::from(err))
    }
}
