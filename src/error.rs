//! Unified API error model and its HTTP mapping.
//! Every handler returns `AppResult<T>`; errors are recovered at the handler boundary and
//! rendered as a small JSON body that never carries internal detail.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Deliberately generic: never says whether the user or the password was wrong.
    InvalidCredentials,
    Unauthenticated { message: String },
    Forbidden { message: String },
    NotFound { message: String },
    /// The resource exists, but not under the parent named in the path.
    ResourceMismatch { message: String },
    UnsupportedVersion { message: String },
    ValidationFailed { errors: FieldErrors },
    PersistenceFailed { message: String },
    Internal { message: String },
}

impl AppError {
    pub fn code_str(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::Unauthenticated { .. } => "unauthenticated",
            AppError::Forbidden { .. } => "forbidden",
            AppError::NotFound { .. } => "not_found",
            AppError::ResourceMismatch { .. } => "resource_mismatch",
            AppError::UnsupportedVersion { .. } => "unsupported_version",
            AppError::ValidationFailed { .. } => "validation_failed",
            AppError::PersistenceFailed { .. } => "persistence_failed",
            AppError::Internal { .. } => "internal",
        }
    }

    /// Client-facing message. Internal errors are masked.
    pub fn message(&self) -> &str {
        match self {
            AppError::InvalidCredentials => "Failed to login",
            AppError::ValidationFailed { .. } => "The request is invalid",
            AppError::Internal { .. } => "internal server error",
            AppError::Unauthenticated { message }
            | AppError::Forbidden { message }
            | AppError::NotFound { message }
            | AppError::ResourceMismatch { message }
            | AppError::UnsupportedVersion { message }
            | AppError::PersistenceFailed { message } => message.as_str(),
        }
    }

    pub fn unauthenticated<S: Into<String>>(msg: S) -> Self { AppError::Unauthenticated { message: msg.into() } }
    pub fn forbidden<S: Into<String>>(msg: S) -> Self { AppError::Forbidden { message: msg.into() } }
    pub fn not_found<S: Into<String>>(msg: S) -> Self { AppError::NotFound { message: msg.into() } }
    pub fn mismatch<S: Into<String>>(msg: S) -> Self { AppError::ResourceMismatch { message: msg.into() } }
    pub fn unsupported_version<S: Into<String>>(msg: S) -> Self { AppError::UnsupportedVersion { message: msg.into() } }
    pub fn persistence<S: Into<String>>(msg: S) -> Self { AppError::PersistenceFailed { message: msg.into() } }
    pub fn internal<S: Into<String>>(msg: S) -> Self { AppError::Internal { message: msg.into() } }

    pub fn validation(errors: FieldErrors) -> Self { AppError::ValidationFailed { errors } }

    /// Single-field validation failure.
    pub fn invalid_field<F: Into<String>, M: Into<String>>(field: F, msg: M) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.into(), vec![msg.into()]);
        AppError::ValidationFailed { errors }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::ResourceMismatch { .. } => StatusCode::BAD_REQUEST,
            AppError::UnsupportedVersion { .. } => StatusCode::BAD_REQUEST,
            AppError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            AppError::PersistenceFailed { .. } => StatusCode::BAD_REQUEST,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Internal { message } => write!(f, "internal: {}", message),
            other => write!(f, "{}: {}", other.code_str(), other.message()),
        }
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { message: format!("{:#}", err) }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal { message } = &self {
            error!(target: "api", "internal error: {}", message);
        }
        let mut body = serde_json::json!({
            "status": "error",
            "code": self.code_str(),
            "message": self.message(),
        });
        if let AppError::ValidationFailed { errors } = &self {
            body["errors"] = serde_json::json!(errors);
        }
        (self.http_status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AppError::InvalidCredentials.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::unauthenticated("no").http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::forbidden("no").http_status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::not_found("missing").http_status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::mismatch("elsewhere").http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::unsupported_version("9.9").http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::invalid_field("name", "required").http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::persistence("save").http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::internal("boom").http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn internal_detail_is_masked() {
        let err: AppError = anyhow::anyhow!("disk on fire at /var/lib").into();
        assert_eq!(err.code_str(), "internal");
        assert_eq!(err.message(), "internal server error");
        assert!(err.to_string().contains("disk on fire"));
    }

    #[tokio::test]
    async fn validation_body_lists_fields() {
        let resp = AppError::invalid_field("moniker", "The moniker field is required.").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["code"], "validation_failed");
        assert_eq!(v["errors"]["moniker"][0], "The moniker field is required.");
    }
}
