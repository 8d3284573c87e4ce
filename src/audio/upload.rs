//! # Multipart Upload Reader
//!
//! Pulls the `audio` file part out of a multipart form. The part is streamed
//! chunk by chunk and abandoned as soon as it passes the size limit, so an
//! oversized upload is never fully buffered.

use crate::audio::ingress::{IngressInput, ValidationError};
use actix_multipart::{Field, Multipart};
use futures_util::stream::StreamExt;
use tracing::debug;

/// Form field carrying the audio file.
pub const AUDIO_FIELD: &str = "audio";

/// Form field carrying a base64 data URL, as in the JSON body.
pub const AUDIO_DATA_FIELD: &str = "audioData";

/// Read the audio payload from a multipart form.
///
/// ## Parameters:
/// - **payload**: The multipart stream
/// - **max_file_bytes**: Upload size limit; exceeding it fails with `TooLarge`
/// - **max_text_bytes**: Limit for an `audioData` text part
///
/// ## Returns:
/// - **Ok(Some(..))**: The file part if present, else the `audioData` text part
/// - **Ok(None)**: Neither field was sent
/// - **Err(..)**: Broken multipart stream, duplicate file part, or oversize payload
pub async fn read_audio_field(
    mut payload: Multipart,
    max_file_bytes: usize,
    max_text_bytes: usize,
) -> Result<Option<IngressInput>, ValidationError> {
    let mut file: Option<IngressInput> = None;
    let mut text: Option<String> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| ValidationError::MalformedUpload(e.to_string()))?;

        let (name, file_name) = match field.content_disposition() {
            Some(disposition) => (
                disposition.get_name().map(str::to_string),
                disposition.get_filename().map(str::to_string),
            ),
            None => (None, None),
        };

        match name.as_deref() {
            Some(AUDIO_FIELD) => {
                if file.is_some() {
                    return Err(ValidationError::MalformedUpload(
                        "more than one audio file in form".to_string(),
                    ));
                }
                let mime_type = field.content_type().map(|m| m.essence_str().to_string());
                let bytes = read_capped(&mut field, max_file_bytes).await?;
                debug!(
                    file_name = ?file_name,
                    mime_type = ?mime_type,
                    size_bytes = bytes.len(),
                    "Audio part received"
                );
                file = Some(IngressInput::Binary {
                    bytes,
                    mime_type,
                    file_name,
                });
            }
            Some(AUDIO_DATA_FIELD) => {
                let bytes = read_capped(&mut field, max_text_bytes).await?;
                let value = String::from_utf8(bytes).map_err(|_| ValidationError::BadEncoding)?;
                text = Some(value);
            }
            _ => drain(&mut field).await?,
        }
    }

    Ok(file.or_else(|| text.filter(|t| !t.is_empty()).map(IngressInput::Encoded)))
}

async fn read_capped(field: &mut Field, max_bytes: usize) -> Result<Vec<u8>, ValidationError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| ValidationError::MalformedUpload(e.to_string()))?;
        let size_bytes = bytes.len() + chunk.len();
        if size_bytes > max_bytes {
            return Err(ValidationError::TooLarge {
                size_bytes,
                max_bytes,
            });
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

async fn drain(field: &mut Field) -> Result<(), ValidationError> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(|e| ValidationError::MalformedUpload(e.to_string()))?;
    }
    Ok(())
}
