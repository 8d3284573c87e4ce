//! # Error Handling
//!
//! This module defines the application's error type and is the one place that
//! decides which HTTP status code and JSON body a failure turns into.
//!
//! ## Key Rust Concepts for Error Handling:
//!
//! ### Enums for Error Types
//! - **Variants**: Each variant is one failure kind the API can report
//! - **Data**: Variants carry what the response needs (retry delay, validation reason)
//! - **Pattern matching**: `match` maps each kind to a status and a stable body
//!
//! ### Traits for Error Conversion
//! - **From trait**: `?` turns validation and anyhow errors into `AppError`
//! - **ResponseError trait**: Converts errors to HTTP responses
//! - **Display trait**: Defines how errors are formatted in logs
//!
//! ## Response Shape:
//! Every failure renders as `{ "error": <short title>, "message": <friendly text> }`,
//! plus `maxSize` for oversize uploads and `retryAfter` (seconds) for throttling.
//! Server-side failures are logged with their detail here and answered with a
//! generic message; the detail never reaches the client.

use crate::audio::ValidationError;
use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;
use tracing::error;

/// Custom error types for the application.
///
/// ## Error Categories:
/// - **Validation**: The submission was refused (400 errors)
/// - **RateLimited**: The caller exhausted its window (429 errors)
/// - **Classification**: A label had no response variant (500 errors)
/// - **Internal**: Anything unexpected (500 errors)
///
/// ## Usage Example:
/// ```rust,ignore
/// return Err(AppError::RateLimited { retry_after_seconds: 42 });
/// ```
#[derive(Debug)]
pub enum AppError {
    /// The payload failed ingress validation
    Validation(ValidationError),

    /// The caller must wait before trying again
    RateLimited { retry_after_seconds: u64 },

    /// The catalog had nothing for a produced label
    Classification(String),

    /// Internal server errors (lock poisoning, store failures, etc.)
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(err) => write!(f, "Validation error: {}", err),
            AppError::RateLimited { retry_after_seconds } => {
                write!(f, "Rate limited: retry after {}s", retry_after_seconds)
            }
            AppError::Classification(msg) => write!(f, "Classification error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Short title placed in the `error` field.
    pub fn title(&self) -> &'static str {
        match self {
            AppError::Validation(kind) => match kind {
                ValidationError::EmptyPayload => "No audio data",
                ValidationError::BadEncoding => "Invalid audio data",
                ValidationError::EmptyAudio => "Empty audio",
                ValidationError::TypeNotAllowed { .. } => "Invalid file type",
                ValidationError::TooLarge { .. } => "File too large",
                ValidationError::MalformedUpload(_) => "Upload error",
            },
            AppError::RateLimited { .. } => "Too many requests",
            AppError::Classification(_) => "Translation failed",
            AppError::Internal(_) => "Internal server error",
        }
    }

    /// Friendly, non-technical text placed in the `message` field.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(kind) => match kind {
                ValidationError::EmptyPayload => {
                    "Please provide audio file or base64 data".to_string()
                }
                ValidationError::BadEncoding => "Could not decode base64 audio data".to_string(),
                ValidationError::EmptyAudio => {
                    "The audio file appears to be empty. Did your pet forget to speak?".to_string()
                }
                ValidationError::TypeNotAllowed { mime_type } => format!(
                    "File type {} not allowed. Our animals only understand certain formats!",
                    mime_type
                ),
                ValidationError::TooLarge { .. } => {
                    "Your audio file is too big! Our animals have small ears.".to_string()
                }
                ValidationError::MalformedUpload(_) => {
                    "We couldn't read that upload. Please try sending it again.".to_string()
                }
            },
            AppError::RateLimited { .. } => {
                "Our animals need a break! Please try again later.".to_string()
            }
            AppError::Classification(_) => {
                "Our animal translators are having a coffee break. Please try again!".to_string()
            }
            AppError::Internal(_) => {
                "Something went wrong! Our hamsters fell off their wheels.".to_string()
            }
        }
    }
}

/// Maps each error kind to a status code and JSON body.
///
/// ## HTTP Status Code Mapping:
/// - Validation → 400 (Bad Request)
/// - RateLimited → 429 (Too Many Requests), with a `Retry-After` header
/// - Classification/Internal → 500 (Internal Server Error)
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Classification(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let mut body = json!({
            "error": self.title(),
            "message": self.user_message(),
        });

        let mut response = HttpResponse::build(status);
        match self {
            AppError::Validation(ValidationError::TooLarge { max_bytes, .. }) => {
                body["maxSize"] = json!(format_size(*max_bytes));
            }
            AppError::RateLimited { retry_after_seconds } => {
                body["retryAfter"] = json!(retry_after_seconds);
                response.insert_header((header::RETRY_AFTER, retry_after_seconds.to_string()));
            }
            AppError::Classification(_) | AppError::Internal(_) => {
                // Detail goes to the log only
                error!(error = %self, "Request failed with a server error");
                body["timestamp"] = json!(chrono::Utc::now().to_rfc3339());
            }
            AppError::Validation(_) => {}
        }

        response.json(body)
    }
}

/// Automatic conversion from ingress validation failures.
impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

/// Automatic conversion from anyhow::Error to AppError.
///
/// ## Usage:
/// When you use `?` with an anyhow::Error, it automatically becomes an AppError::Internal.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(format!("{:#}", err))
    }
}

/// Human-readable byte count for the `maxSize` field, e.g. `10MB`.
pub fn format_size(bytes: usize) -> String {
    const KIB: usize = 1024;
    const MIB: usize = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else if bytes >= KIB && bytes % KIB == 0 {
        format!("{}KB", bytes / KIB)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Type alias for Results that use our custom error type.
pub type AppResult<T> = Result<T, AppError>;
