//! # Translation Pipeline
//!
//! Sequences one translation request:
//!
//! ```text
//! admit → decode/validate → simulated processing delay → classify → select variant → assemble
//! ```
//!
//! Any stage failing aborts the rest and the error travels to the caller
//! unchanged; no partial result is ever produced.
//!
//! ## Why admission is separate:
//! The HTTP handler calls [`TranslationPipeline::admit`] before reading the
//! request body, so a throttled caller's upload is never buffered, and only
//! then hands the payload to [`TranslationPipeline::translate`].

use crate::audio::{IngressInput, IngressValidator};
use crate::catalog::ResponseCatalog;
use crate::classification::{Classifier, RandomSource};
use crate::config::ProcessingConfig;
use crate::error::{AppError, AppResult};
use crate::rate_limit::{Decision, RateLimiter};
use crate::translation::result::{ResultAssembler, TranslationResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Placeholder for real inference latency, drawn uniformly from `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingDelay {
    pub min: Duration,
    pub max: Duration,
}

impl ProcessingDelay {
    /// No delay at all.
    #[cfg(test)]
    pub fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn draw(&self, random: &dyn RandomSource) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(random.range_inclusive(min, max))
    }
}

impl From<&ProcessingConfig> for ProcessingDelay {
    fn from(config: &ProcessingConfig) -> Self {
        Self {
            min: Duration::from_millis(config.min_delay_ms),
            max: Duration::from_millis(config.max_delay_ms),
        }
    }
}

/// Coordinates the translation stages. Shared across requests behind `Arc`.
pub struct TranslationPipeline {
    limiter: Arc<RateLimiter>,
    validator: IngressValidator,
    classifier: Arc<dyn Classifier>,
    catalog: Arc<ResponseCatalog>,
    assembler: ResultAssembler,
    delay: ProcessingDelay,
    random: Arc<dyn RandomSource>,
}

impl TranslationPipeline {
    pub fn new(
        limiter: Arc<RateLimiter>,
        validator: IngressValidator,
        classifier: Arc<dyn Classifier>,
        catalog: Arc<ResponseCatalog>,
        delay: ProcessingDelay,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            limiter,
            validator,
            classifier,
            catalog,
            assembler: ResultAssembler::new(Arc::clone(&random)),
            delay,
            random,
        }
    }

    pub fn validator(&self) -> &IngressValidator {
        &self.validator
    }

    /// Stage 1: count this attempt against the translation limit.
    ///
    /// A failing counter store is logged and the request let through.
    pub async fn admit(&self, identity: &str) -> AppResult<()> {
        match self.limiter.admit(identity, Instant::now()).await {
            Ok(Decision::Allowed { remaining, .. }) => {
                debug!(identity = %identity, remaining, "Translation request admitted");
                Ok(())
            }
            Ok(Decision::Throttled { retry_after_seconds }) => {
                Err(AppError::RateLimited { retry_after_seconds })
            }
            Err(e) => {
                warn!(identity = %identity, error = %e, "Rate limit store failed, admitting request");
                Ok(())
            }
        }
    }

    /// Stages 2 to 6 for an already admitted request.
    pub async fn translate(&self, input: Option<IngressInput>) -> AppResult<TranslationResult> {
        let started = Instant::now();

        let submission = self.validator.decode(input)?;
        info!(
            size_bytes = submission.size_bytes,
            mime_type = ?submission.declared_mime_type,
            file_name = ?submission.original_name,
            "Processing audio translation request"
        );

        let delay = self.delay.draw(self.random.as_ref());
        if !delay.is_zero() {
            debug!(delay_ms = delay.as_millis() as u64, "Simulating processing");
            tokio::time::sleep(delay).await;
        }

        let label = self.classifier.classify(&submission);
        info!(label = %label, classifier = self.classifier.name(), "Detected");

        let variant = self
            .catalog
            .select(label, self.random.as_ref())
            .ok_or_else(|| AppError::Classification(format!("no responses available for {}", label)))?;

        let result = self
            .assembler
            .assemble(variant, label, submission.size_bytes, started.elapsed());
        info!(
            animal_type = %result.variant.display_name,
            confidence = result.confidence_percent,
            processing_time_ms = result.processing_time_ms,
            "Translation complete"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ValidationError;
    use crate::catalog::variant::Mood;
    use crate::classification::{HeuristicClassifier, Label, ScriptedRandom, SeededRandom};
    use crate::rate_limit::RateLimitPolicy;
    use crate::translation::result::{MAX_CONFIDENCE_PERCENT, MIN_CONFIDENCE_PERCENT};
    use std::collections::BTreeMap;

    /// Always answers with the same label.
    struct FixedClassifier(Label);

    impl Classifier for FixedClassifier {
        fn classify(&self, _submission: &crate::audio::AudioSubmission) -> Label {
            self.0
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn pipeline_with(
        classifier: Arc<dyn Classifier>,
        random: Arc<dyn RandomSource>,
        max_requests: u32,
    ) -> TranslationPipeline {
        let limiter = Arc::new(RateLimiter::in_memory(
            "translation",
            RateLimitPolicy {
                window: Duration::from_secs(300),
                max_requests,
            },
        ));
        TranslationPipeline::new(
            limiter,
            IngressValidator::new(10 * 1024 * 1024),
            classifier,
            Arc::new(ResponseCatalog::builtin().unwrap()),
            ProcessingDelay::none(),
            random,
        )
    }

    /// Admit, then translate, as the handler does.
    async fn run(
        pipeline: &TranslationPipeline,
        identity: &str,
        input: Option<IngressInput>,
    ) -> AppResult<TranslationResult> {
        pipeline.admit(identity).await?;
        pipeline.translate(input).await
    }

    fn wav(size: usize, name: &str) -> Option<IngressInput> {
        Some(IngressInput::Binary {
            bytes: vec![1u8; size],
            mime_type: Some("audio/wav".to_string()),
            file_name: Some(name.to_string()),
        })
    }

    #[tokio::test]
    async fn test_successful_translation() {
        let random: Arc<dyn RandomSource> = Arc::new(SeededRandom::new(3));
        let classifier = Arc::new(HeuristicClassifier::new(Arc::clone(&random)));
        let pipeline = pipeline_with(classifier, random, 20);

        let result = run(&pipeline, "1.1.1.1", wav(5000, "recording.wav")).await.unwrap();
        assert!(Label::ALL.contains(&result.detected_label));
        assert_eq!(result.audio_size_bytes, 5000);
        assert!((MIN_CONFIDENCE_PERCENT..=MAX_CONFIDENCE_PERCENT).contains(&result.confidence_percent));
    }

    #[tokio::test]
    async fn test_variant_matches_detected_label() {
        let random: Arc<dyn RandomSource> = Arc::new(ScriptedRandom::new(vec![0.5]));
        let pipeline = pipeline_with(Arc::new(FixedClassifier(Label::Human)), random, 20);

        let result = pipeline.translate(wav(10, "clip.wav")).await.unwrap();
        assert_eq!(result.detected_label, Label::Human);
        assert_eq!(result.variant.mood, Mood::Busted);
    }

    #[tokio::test]
    async fn test_validation_failure_short_circuits() {
        let random: Arc<dyn RandomSource> = Arc::new(ScriptedRandom::new(vec![0.5]));
        let pipeline = pipeline_with(Arc::new(FixedClassifier(Label::Dog)), random, 20);

        let err = run(&pipeline, "ip", None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::EmptyPayload)));

        let err = run(&pipeline, "ip", wav(0, "empty.wav")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ValidationError::EmptyAudio)));
    }

    #[tokio::test]
    async fn test_throttled_before_validation() {
        let random: Arc<dyn RandomSource> = Arc::new(ScriptedRandom::new(vec![0.5]));
        let pipeline = pipeline_with(Arc::new(FixedClassifier(Label::Cat)), random, 2);

        run(&pipeline, "ip", wav(10, "a.wav")).await.unwrap();
        run(&pipeline, "ip", None).await.unwrap_err();

        // third attempt is throttled even though its payload is invalid too
        let err = run(&pipeline, "ip", None).await.unwrap_err();
        match err {
            AppError::RateLimited { retry_after_seconds } => assert!(retry_after_seconds > 0),
            other => panic!("expected rate limit, got {}", other),
        }

        // other callers are unaffected
        assert!(run(&pipeline, "other", wav(10, "b.wav")).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_variant_is_classification_error() {
        // the load-time check makes this unreachable in practice
        let random: Arc<dyn RandomSource> = Arc::new(ScriptedRandom::new(vec![0.5]));
        let limiter = Arc::new(RateLimiter::in_memory("translation", RateLimitPolicy::translation()));
        let pipeline = TranslationPipeline {
            limiter,
            validator: IngressValidator::new(1024),
            classifier: Arc::new(FixedClassifier(Label::Dog)),
            catalog: Arc::new(ResponseCatalog::unchecked(BTreeMap::new())),
            assembler: ResultAssembler::new(Arc::clone(&random)),
            delay: ProcessingDelay::none(),
            random,
        };

        let err = pipeline.translate(wav(10, "a.wav")).await.unwrap_err();
        assert!(matches!(err, AppError::Classification(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_does_not_block_other_requests() {
        let random: Arc<dyn RandomSource> = Arc::new(ScriptedRandom::new(vec![0.5]));
        let mut pipeline = pipeline_with(Arc::new(FixedClassifier(Label::Bird)), random, 20);
        pipeline.delay = ProcessingDelay {
            min: Duration::from_millis(1200),
            max: Duration::from_millis(3000),
        };
        let pipeline = Arc::new(pipeline);

        let started = tokio::time::Instant::now();
        let a = tokio::spawn({
            let pipeline = Arc::clone(&pipeline);
            async move { pipeline.translate(wav(10, "a.wav")).await }
        });
        let b = tokio::spawn({
            let pipeline = Arc::clone(&pipeline);
            async move { pipeline.translate(wav(10, "b.wav")).await }
        });

        assert!(a.await.unwrap().is_ok());
        assert!(b.await.unwrap().is_ok());
        // both waits overlapped instead of running back to back
        assert!(started.elapsed() < Duration::from_millis(4000));
    }

    #[test]
    fn test_delay_draw_within_bounds() {
        let delay = ProcessingDelay {
            min: Duration::from_millis(1200),
            max: Duration::from_millis(3000),
        };
        let random = SeededRandom::new(11);
        for _ in 0..500 {
            let d = delay.draw(&random);
            assert!(d >= delay.min && d <= delay.max);
        }
        assert_eq!(ProcessingDelay::none().draw(&random), Duration::ZERO);
    }
}
