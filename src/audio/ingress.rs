//! # Ingress Validation
//!
//! Normalizes an inbound payload into an [`AudioSubmission`].
//!
//! ## Accepted Forms (exactly one per request):
//! - **Binary**: raw bytes from a multipart upload, with the part's MIME type
//! - **Encoded**: a data URL such as `data:audio/webm;base64,GkXf...`; the
//!   prefix is stripped before decoding and its MIME type becomes the declared type
//!
//! ## Check Order:
//! 1. Payload present (an empty string counts as absent)
//! 2. Base64 decodes
//! 3. Decoded buffer is non-empty
//! 4. Size within the configured maximum
//! 5. Declared MIME type on the allow-list
//!
//! Size is checked before the type so an oversized payload is always
//! reported as too large, whatever it claims to be.

use crate::audio::submission::AudioSubmission;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use std::fmt;

/// MIME types accepted on upload.
pub const ALLOWED_MIME_TYPES: [&str; 8] = [
    "audio/wav",
    "audio/mp3",
    "audio/mpeg",
    "audio/webm",
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
];

/// Marker separating a data URL header from its payload.
const BASE64_MARKER: &str = ";base64,";

/// Browsers and Node both accept unpadded base64, so we do too.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Raw request payload before validation.
#[derive(Debug, Clone)]
pub enum IngressInput {
    /// Multipart upload of the `audio` field.
    Binary {
        bytes: Vec<u8>,
        mime_type: Option<String>,
        file_name: Option<String>,
    },
    /// `audioData` string from a JSON body.
    Encoded(String),
}

/// Reasons a payload is refused before it reaches the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Neither an upload nor a data string was supplied.
    EmptyPayload,
    /// The data string is not valid base64.
    BadEncoding,
    /// The payload decoded to zero bytes.
    EmptyAudio,
    /// The declared MIME type is not on the allow-list.
    TypeNotAllowed { mime_type: String },
    /// The payload exceeds the configured maximum.
    TooLarge { size_bytes: usize, max_bytes: usize },
    /// The request body could not be parsed at all (broken multipart, bad JSON).
    MalformedUpload(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyPayload => write!(f, "no audio payload supplied"),
            ValidationError::BadEncoding => write!(f, "audio data is not valid base64"),
            ValidationError::EmptyAudio => write!(f, "audio payload is empty"),
            ValidationError::TypeNotAllowed { mime_type } => {
                write!(f, "file type {} not allowed", mime_type)
            }
            ValidationError::TooLarge { size_bytes, max_bytes } => {
                write!(f, "payload of {} bytes exceeds limit of {} bytes", size_bytes, max_bytes)
            }
            ValidationError::MalformedUpload(detail) => write!(f, "malformed upload: {}", detail),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Decodes and validates inbound payloads against a size limit.
#[derive(Debug, Clone)]
pub struct IngressValidator {
    max_bytes: usize,
}

impl IngressValidator {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Validate one request's payload.
    ///
    /// ## Returns:
    /// - **Ok(AudioSubmission)**: non-empty, within limits, allowed type
    /// - **Err(ValidationError)**: the first check that failed, in the order
    ///   listed in the module docs
    pub fn decode(&self, input: Option<IngressInput>) -> Result<AudioSubmission, ValidationError> {
        let (bytes, mime_type, file_name) = match input {
            None => return Err(ValidationError::EmptyPayload),
            Some(IngressInput::Binary {
                bytes,
                mime_type,
                file_name,
            }) => (bytes, mime_type, file_name),
            Some(IngressInput::Encoded(text)) => {
                if text.trim().is_empty() {
                    return Err(ValidationError::EmptyPayload);
                }
                let (mime_type, bytes) = self.decode_data_url(&text)?;
                (bytes, mime_type, None)
            }
        };

        if bytes.is_empty() {
            return Err(ValidationError::EmptyAudio);
        }

        self.check_size(bytes.len())?;

        let mime_type = mime_type.map(|m| normalize_mime(&m)).filter(|m| !m.is_empty());
        if let Some(mime) = &mime_type {
            if !is_allowed_mime(mime) {
                return Err(ValidationError::TypeNotAllowed {
                    mime_type: mime.clone(),
                });
            }
        }

        Ok(AudioSubmission::new(bytes, mime_type, file_name))
    }

    fn check_size(&self, size_bytes: usize) -> Result<(), ValidationError> {
        if size_bytes > self.max_bytes {
            return Err(ValidationError::TooLarge {
                size_bytes,
                max_bytes: self.max_bytes,
            });
        }
        Ok(())
    }

    /// Strip the data URL header (if any) and base64-decode the rest.
    fn decode_data_url(&self, text: &str) -> Result<(Option<String>, Vec<u8>), ValidationError> {
        let (mime_type, data) = split_data_url(text);
        let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();

        // Every 4 base64 chars yield at most 3 bytes; skip decoding obviously oversized input.
        let estimated = compact.len() / 4 * 3;
        if estimated > self.max_bytes.saturating_add(3) {
            return Err(ValidationError::TooLarge {
                size_bytes: estimated,
                max_bytes: self.max_bytes,
            });
        }

        let bytes = LENIENT_BASE64
            .decode(compact.as_bytes())
            .map_err(|_| ValidationError::BadEncoding)?;
        Ok((mime_type, bytes))
    }
}

/// Split `data:<mime>[;params];base64,<payload>` into the MIME type and payload.
/// Text without the marker is treated as bare base64 with no declared type.
fn split_data_url(text: &str) -> (Option<String>, &str) {
    let text = text.trim();
    match text.find(BASE64_MARKER) {
        Some(index) => {
            let header = &text[..index];
            let payload = &text[index + BASE64_MARKER.len()..];
            let mime = header
                .strip_prefix("data:")
                .unwrap_or(header)
                .split(';')
                .next()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string);
            (mime, payload)
        }
        None => (None, text),
    }
}

/// Lowercase the type and drop parameters such as `;codecs=opus`.
fn normalize_mime(mime: &str) -> String {
    mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase()
}

pub fn is_allowed_mime(mime: &str) -> bool {
    ALLOWED_MIME_TYPES.contains(&normalize_mime(mime).as_str())
}
