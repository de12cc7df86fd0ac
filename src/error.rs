use axum::{
    Json,
    response::{IntoResponse, Response},
};
use http::StatusCode;
use serde_json::json;

use crate::utils::truncate_detail;

/// How an upstream model call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamStatus {
    Ok,
    ClientError,
    ServerError,
    Timeout,
    NetworkError,
}

impl UpstreamStatus {
    /// Transient failures worth another attempt. Client errors never are.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::ServerError | Self::Timeout | Self::NetworkError)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY missing")]
    MissingApiKey,
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("upstream model call failed ({status:?}): {detail}")]
pub struct UpstreamError {
    pub status: UpstreamStatus,
    /// Upstream body or local error text, at most 500 characters.
    pub detail: String,
}

impl UpstreamError {
    pub fn new(status: UpstreamStatus, detail: impl AsRef<str>) -> Self {
        Self {
            status,
            detail: truncate_detail(detail.as_ref()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid object path: {0}")]
    InvalidPath(String),
    #[error("render failed: {0}")]
    Render(String),
}

impl From<zip::result::ZipError> for StorageError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Render(err.to_string())
    }
}

impl From<lopdf::Error> for StorageError {
    fn from(err: lopdf::Error) -> Self {
        Self::Render(err.to_string())
    }
}

/// Errors surfaced at the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Config(e) => Self::Config(e),
            PipelineError::Upstream(e) => Self::Upstream(e),
        }
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::Upstream(_) => "upstream_error",
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Storage(_) => "storage_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let detail = match &self {
            Self::Upstream(e) => e.detail.clone(),
            other => truncate_detail(&other.to_string()),
        };
        let body = json!({ "error": self.kind(), "detail": detail });
        (status, Json(body)).into_response()
    }
}
