use actix_web::{error::JsonPayloadError, http::StatusCode, HttpResponse, ResponseError};
use async_openai::error::OpenAIError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Validation error: {message}")]
    ValidationError {
        message: String,
        details: serde_json::Value,
    },

    #[error("Upstream provider error: {0}")]
    UpstreamError(String),

    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Failures while producing or delivering a PDF export.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PdfError {
    #[error("PDF generation failed: {0}")]
    Generation(String),

    #[error("PDF download failed: {0}")]
    Download(String),

    #[error("PDF export is not supported by this browser: {0}")]
    UnsupportedBrowser(String),
}

impl PdfError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, PdfError::UnsupportedBrowser(_))
    }
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::ValidationError {
            message: message.into(),
            details: serde_json::Value::Null,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::ValidationError { .. } => "VALIDATION_ERROR",
            AppError::UpstreamError(_) => "UPSTREAM_ERROR",
            AppError::Pdf(PdfError::UnsupportedBrowser(_)) => "PDF_UNSUPPORTED_BROWSER",
            AppError::Pdf(PdfError::Download(_)) => "PDF_DOWNLOAD_FAILED",
            AppError::Pdf(PdfError::Generation(_)) => "PDF_GENERATION_FAILED",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
    pub code: String,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            AppError::UpstreamError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Pdf(PdfError::UnsupportedBrowser(_)) => StatusCode::NOT_ACCEPTABLE,
            AppError::Pdf(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let details = match self {
            AppError::ValidationError { details, .. } => details.clone(),
            _ => serde_json::Value::Null,
        };
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
            details,
            code: self.error_code().to_string(),
        })
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError {
            message: "Invalid request payload".to_string(),
            details: serde_json::to_value(&err).unwrap_or(serde_json::Value::Null),
        }
    }
}

impl From<JsonPayloadError> for AppError {
    fn from(err: JsonPayloadError) -> Self {
        AppError::ValidationError {
            message: "Invalid request payload".to_string(),
            details: serde_json::json!({ "body": err.to_string() }),
        }
    }
}

impl From<OpenAIError> for AppError {
    fn from(err: OpenAIError) -> Self {
        AppError::UpstreamError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalError(format!("JSON serialization error: {}", err))
    }
}

pub type AppResult<T> = Result<T, AppError>;
