//! # Application State Management
//!
//! This module wires the translation components together once at startup and
//! shares them with every HTTP request handler.
//!
//! ## Key Rust Concepts:
//!
//! ### Arc (Atomically Reference Counted)
//! - **Purpose**: Allows multiple parts of the program to safely share ownership of data
//! - **Why needed**: Every actix worker thread holds its own clone of `AppState`;
//!   cloning only bumps reference counts, the components themselves are built once
//!
//! ### Immutable sharing
//! - Configuration, catalog and classifier never change after startup, so they
//!   are shared through plain `Arc<T>` with no lock at all
//! - The only mutable state, the rate limit counters, lives inside the limiters'
//!   window stores, which do their own per-identity locking
//!
//! ### Trait objects for seams
//! - `Arc<dyn RandomSource>` and `Arc<dyn Classifier>` let tests swap in a
//!   seeded generator or a fixed classifier without touching the handlers

use crate::audio::IngressValidator;
use crate::catalog::ResponseCatalog;
use crate::classification::{Classifier, HeuristicClassifier, RandomSource, ThreadRandom};
use crate::config::AppConfig;
use crate::rate_limit::{RateLimitPolicy, RateLimiter};
use crate::translation::{ProcessingDelay, TranslationPipeline};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The main application state that's shared across all HTTP request handlers.
///
/// ## Rust Concepts:
/// - **#[derive(Clone)]**: Cheap to clone (all fields are `Arc` or `Copy`)
/// - **Instant**: A point in time (for measuring uptime)
#[derive(Clone)]
pub struct AppState {
    /// Application configuration, read once at startup
    pub config: Arc<AppConfig>,

    /// Response variants per label, validated at load time
    pub catalog: Arc<ResponseCatalog>,

    /// The submission-to-result pipeline, including the strict translation limiter
    pub pipeline: Arc<TranslationPipeline>,

    /// Lenient limiter wrapped around every `/api` route
    pub general_limiter: Arc<RateLimiter>,

    /// Translation limiter, kept here too so the purge task can reach it
    pub translation_limiter: Arc<RateLimiter>,

    /// When the server started (never changes, so no Arc needed)
    pub start_time: Instant,
}

impl AppState {
    /// Build the production state: catalog from configuration (or the built-in
    /// one), thread-local randomness and the heuristic classifier.
    ///
    /// ## Errors:
    /// Fails if the catalog cannot be read or is missing a label. Callers treat
    /// this as fatal, so the server never starts with an incomplete catalog.
    pub fn new(config: AppConfig) -> Result<Self> {
        let catalog = ResponseCatalog::load(config.catalog.path.as_deref().map(Path::new))?;
        Ok(Self::with_components(config, catalog, Arc::new(ThreadRandom)))
    }

    /// Build state around an explicit catalog and random source.
    ///
    /// ## Usage:
    /// Tests pass a `ScriptedRandom` or `SeededRandom` here to pin every draw
    /// (classification, variant choice, confidence and delay).
    pub fn with_components(
        config: AppConfig,
        catalog: ResponseCatalog,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        let classifier: Arc<dyn Classifier> = Arc::new(HeuristicClassifier::new(Arc::clone(&random)));

        let general_limiter = Arc::new(RateLimiter::in_memory(
            "general",
            RateLimitPolicy::from(&config.rate_limit.general),
        ));
        let translation_limiter = Arc::new(RateLimiter::in_memory(
            "translation",
            RateLimitPolicy::from(&config.rate_limit.translation),
        ));

        let catalog = Arc::new(catalog);
        let pipeline = TranslationPipeline::new(
            Arc::clone(&translation_limiter),
            IngressValidator::new(config.upload.max_file_size_bytes),
            classifier,
            Arc::clone(&catalog),
            ProcessingDelay::from(&config.processing),
            random,
        );

        Self {
            config: Arc::new(config),
            catalog,
            pipeline: Arc::new(pipeline),
            general_limiter,
            translation_limiter,
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds.
    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// How often stale windows are dropped: once per the shorter limiter
    /// window, and never more than once a second.
    pub fn purge_interval(&self) -> Duration {
        let shortest = self
            .general_limiter
            .policy()
            .window
            .min(self.translation_limiter.policy().window);
        shortest.max(Duration::from_secs(1))
    }

    /// Drop elapsed rate limit windows from both limiters.
    /// Returns the number of identities forgotten.
    pub async fn purge_rate_limits(&self) -> Result<usize> {
        let now = Instant::now();
        let general = self.general_limiter.purge_expired(now).await?;
        let translation = self.translation_limiter.purge_expired(now).await?;
        Ok(general + translation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::SeededRandom;

    #[test]
    fn test_state_uses_configured_policies() {
        let mut config = AppConfig::default();
        config.rate_limit.translation.max_requests = 7;
        let state = AppState::with_components(
            config,
            ResponseCatalog::builtin().unwrap(),
            Arc::new(SeededRandom::new(1)),
        );

        assert_eq!(state.translation_limiter.policy().max_requests, 7);
        assert_eq!(state.general_limiter.policy(), RateLimitPolicy::general());
        assert_eq!(state.pipeline.validator().max_bytes(), 10 * 1024 * 1024);
    }

    #[test]
    fn test_purge_interval_follows_shortest_window() {
        let state = AppState::with_components(
            AppConfig::default(),
            ResponseCatalog::builtin().unwrap(),
            Arc::new(SeededRandom::new(1)),
        );
        assert_eq!(state.purge_interval(), RateLimitPolicy::translation().window);

        let mut config = AppConfig::default();
        config.rate_limit.general.window_ms = 10;
        let state = AppState::with_components(
            config,
            ResponseCatalog::builtin().unwrap(),
            Arc::new(SeededRandom::new(1)),
        );
        assert_eq!(state.purge_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_missing_catalog_file_is_fatal() {
        let mut config = AppConfig::default();
        config.catalog.path = Some("/definitely/not/here/responses.toml".to_string());
        assert!(AppState::new(config).is_err());
    }

    #[tokio::test]
    async fn test_purge_on_fresh_state() {
        let state = AppState::with_components(
            AppConfig::default(),
            ResponseCatalog::builtin().unwrap(),
            Arc::new(SeededRandom::new(1)),
        );
        assert_eq!(state.purge_rate_limits().await.unwrap(), 0);
    }
}
