//! # Translation Results
//!
//! Composes the outward-facing result of a successful translation and its
//! JSON wire form.

use crate::catalog::ResponseVariant;
use crate::classification::{Label, RandomSource};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Lowest confidence ever reported.
pub const MIN_CONFIDENCE_PERCENT: u8 = 82;
/// Highest confidence ever reported.
pub const MAX_CONFIDENCE_PERCENT: u8 = 99;

/// Everything the client learns about one successful translation.
/// Built once per request and never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationResult {
    pub variant: ResponseVariant,
    pub detected_label: Label,
    pub confidence_percent: u8,
    pub processing_time_ms: u64,
    pub audio_size_bytes: usize,
    pub timestamp: DateTime<Utc>,
}

/// Builds [`TranslationResult`]s, drawing the confidence from an injected source.
pub struct ResultAssembler {
    random: Arc<dyn RandomSource>,
}

impl ResultAssembler {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }

    pub fn assemble(
        &self,
        variant: &ResponseVariant,
        detected_label: Label,
        audio_size_bytes: usize,
        elapsed: Duration,
    ) -> TranslationResult {
        let confidence = self.random.range_inclusive(
            MIN_CONFIDENCE_PERCENT as u64,
            MAX_CONFIDENCE_PERCENT as u64,
        ) as u8;

        TranslationResult {
            variant: variant.clone(),
            detected_label,
            confidence_percent: confidence,
            processing_time_ms: elapsed.as_millis() as u64,
            audio_size_bytes,
            timestamp: Utc::now(),
        }
    }
}

/// JSON body of `200 POST /api/translate`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationResponse<'a> {
    pub success: bool,
    pub animal_type: &'a str,
    pub dialog: &'a str,
    #[serde(rename = "memeImageURL")]
    pub meme_image_url: &'a str,
    #[serde(rename = "audioURL")]
    pub audio_url: &'a str,
    pub mood: &'static str,
    pub metadata: TranslationMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationMetadata {
    pub confidence: u8,
    pub processing_time: u64,
    pub audio_size: usize,
    pub timestamp: String,
    pub detected_animal: Label,
}

impl TranslationResult {
    pub fn to_response(&self) -> TranslationResponse<'_> {
        TranslationResponse {
            success: true,
            animal_type: &self.variant.display_name,
            dialog: &self.variant.dialog_text,
            meme_image_url: &self.variant.image_ref,
            audio_url: &self.variant.audio_ref,
            mood: self.variant.mood.as_str(),
            metadata: TranslationMetadata {
                confidence: self.confidence_percent,
                processing_time: self.processing_time_ms,
                audio_size: self.audio_size_bytes,
                timestamp: self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
                detected_animal: self.detected_label,
            },
        }
    }
}
