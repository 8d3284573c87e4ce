//! # Translation REST API Handlers
//!
//! HTTP surface of the translation pipeline.
//!
//! ## Available Endpoints:
//! - `POST /api/translate` - Translate an uploaded or base64-encoded sound
//! - `GET /api/translate/stats` - Response catalog size per label
//!
//! ## Accepted Bodies for `POST /api/translate`:
//! - `multipart/form-data` with an `audio` file part (or an `audioData` text part)
//! - `application/json` with `{ "audioData": "data:audio/wav;base64,..." }`

use crate::audio::{read_audio_field, IngressInput, ValidationError};
use crate::error::AppResult;
use crate::rate_limit::client_identity;
use crate::state::AppState;
use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use futures_util::stream::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// JSON body of `POST /api/translate`.
#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    #[serde(rename = "audioData")]
    pub audio_data: Option<String>,
}

/// Translate one animal sound.
///
/// ## Endpoint: `POST /api/translate`
///
/// ## Order of Checks:
/// 1. Translation rate limit (before the body is read)
/// 2. Body parsing, streamed with size caps
/// 3. The pipeline's own validation, classification and assembly
///
/// ## Response:
/// ```json
/// {
///   "success": true,
///   "animalType": "Sassy Cat 🐱",
///   "dialog": "...",
///   "memeImageURL": "/assets/memes/sassy-cat.jpg",
///   "audioURL": "/assets/audio/sassy-cat.mp3",
///   "mood": "sassy",
///   "metadata": {
///     "confidence": 91,
///     "processingTime": 1834,
///     "audioSize": 5120,
///     "timestamp": "2024-05-01T12:00:00.000Z",
///     "detectedAnimal": "cat"
///   }
/// }
/// ```
pub async fn translate(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let identity = client_identity(&req, state.config.rate_limit.trust_forwarded_for);
    state.pipeline.admit(&identity).await?;

    let max_file_bytes = state.pipeline.validator().max_bytes();
    let input = read_body(&req, payload, max_file_bytes, state.config.upload.json_body_limit_bytes).await?;
    let result = state.pipeline.translate(input).await?;

    Ok(HttpResponse::Ok().json(result.to_response()))
}

/// Report how many response variants the catalog holds.
///
/// ## Endpoint: `GET /api/translate/stats`
pub async fn translation_stats(state: web::Data<AppState>) -> HttpResponse {
    let stats = state.catalog.stats();
    HttpResponse::Ok().json(json!({
        "totalVariants": stats.total_variants,
        "labels": stats.labels,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Pull the payload out of a multipart form or a JSON body.
///
/// File parts are capped at `max_file_bytes`; text (JSON bodies and
/// `audioData` form parts) at `max_text_bytes`.
async fn read_body(
    req: &HttpRequest,
    payload: web::Payload,
    max_file_bytes: usize,
    max_text_bytes: usize,
) -> Result<Option<IngressInput>, ValidationError> {
    if is_multipart(req) {
        debug!("Reading multipart translation request");
        let multipart = Multipart::new(req.headers(), payload);
        return read_audio_field(multipart, max_file_bytes, max_text_bytes).await;
    }

    read_json_body(payload, max_text_bytes).await
}

fn is_multipart(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

/// Buffer a JSON body up to `limit` bytes. An empty body means no payload.
async fn read_json_body(
    mut payload: web::Payload,
    limit: usize,
) -> Result<Option<IngressInput>, ValidationError> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| ValidationError::MalformedUpload(e.to_string()))?;
        let size_bytes = body.len() + chunk.len();
        if size_bytes > limit {
            return Err(ValidationError::TooLarge {
                size_bytes,
                max_bytes: limit,
            });
        }
        body.extend_from_slice(&chunk);
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    let request: TranslateRequest = serde_json::from_slice(&body)
        .map_err(|e| ValidationError::MalformedUpload(format!("invalid JSON body: {}", e)))?;
    Ok(request.audio_data.map(IngressInput::Encoded))
}
