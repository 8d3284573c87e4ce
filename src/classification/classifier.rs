//! # Audio Classifier
//!
//! Maps an [`AudioSubmission`] to a [`Label`]. The shipped implementation is a
//! heuristic stand-in: it never looks at the audio signal, only at the upload
//! name and size, and leans on an injected [`RandomSource`] for the rest.
//!
//! ## Heuristic, in priority order:
//! 1. **Filename hint**: a name containing `human`, `voice` or `speech` is a human
//! 2. **Human prior**: 15% of remaining submissions are flagged as human
//! 3. **Pseudo-features**: a random pseudo-frequency in `[0, 1000)` and a
//!    pseudo-intensity of `size_bytes / 1000` pick the animal bucket

use crate::audio::AudioSubmission;
use crate::classification::label::Label;
use crate::classification::random::RandomSource;
use std::sync::Arc;
use tracing::debug;

/// Name fragments that mark an upload as a human recording.
pub const HUMAN_NAME_HINTS: [&str; 3] = ["human", "voice", "speech"];

/// Probability of reporting a human regardless of content.
pub const HUMAN_PRIOR: f64 = 0.15;

/// Seam for swapping the heuristic out for a real model.
pub trait Classifier: Send + Sync {
    fn classify(&self, submission: &AudioSubmission) -> Label;

    /// Short identifier used in logs.
    fn name(&self) -> &'static str;
}

/// Frequency/intensity heuristic driven by an injected random source.
pub struct HeuristicClassifier {
    random: Arc<dyn RandomSource>,
}

impl HeuristicClassifier {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }

    fn has_human_hint(name: Option<&str>) -> bool {
        name.map(|n| n.to_lowercase())
            .map(|n| HUMAN_NAME_HINTS.iter().any(|hint| n.contains(hint)))
            .unwrap_or(false)
    }

    /// Bucket the pseudo-features. Returns `None` for the uncovered corner
    /// (low frequency, low intensity).
    fn bucket(frequency: f64, intensity: f64) -> Option<Label> {
        if frequency < 200.0 {
            (intensity > 5.0).then_some(Label::Dog)
        } else if frequency < 400.0 {
            Some(Label::Cat)
        } else if frequency < 700.0 {
            Some(Label::Bird)
        } else {
            Some(Label::Mosquito)
        }
    }
}

impl Classifier for HeuristicClassifier {
    fn classify(&self, submission: &AudioSubmission) -> Label {
        if Self::has_human_hint(submission.original_name.as_deref()) {
            debug!(name = ?submission.original_name, "Filename hints at a human recording");
            return Label::Human;
        }

        if self.random.next_unit() < HUMAN_PRIOR {
            return Label::Human;
        }

        let frequency = self.random.next_unit() * 1000.0;
        let intensity = submission.size_bytes as f64 / 1000.0;

        match Self::bucket(frequency, intensity) {
            Some(label) => {
                debug!(frequency, intensity, label = %label, "Pseudo-features bucketed");
                label
            }
            None => {
                let label = Label::ANIMALS[self.random.pick_index(Label::ANIMALS.len())];
                debug!(frequency, intensity, label = %label, "No bucket matched, picked at random");
                label
            }
        }
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::random::{ScriptedRandom, SeededRandom};

    fn submission(size: usize, name: Option<&str>) -> AudioSubmission {
        AudioSubmission::new(vec![7u8; size], Some("audio/wav".to_string()), name.map(String::from))
    }

    fn classify_with(values: Vec<f64>, size: usize, name: Option<&str>) -> Label {
        let classifier = HeuristicClassifier::new(Arc::new(ScriptedRandom::new(values)));
        classifier.classify(&submission(size, name))
    }

    #[test]
    fn test_filename_hint_short_circuits() {
        // 0.99 would otherwise lead to mosquito
        assert_eq!(classify_with(vec![0.99], 5000, Some("My_VOICE_memo.wav")), Label::Human);
        assert_eq!(classify_with(vec![0.99], 5000, Some("speech.mp3")), Label::Human);
        assert_eq!(classify_with(vec![0.99], 5000, Some("human-test.webm")), Label::Human);
    }

    #[test]
    fn test_human_prior() {
        assert_eq!(classify_with(vec![0.14, 0.9], 5000, None), Label::Human);
        assert_ne!(classify_with(vec![0.15, 0.9], 5000, None), Label::Human);
    }

    #[test]
    fn test_frequency_buckets() {
        // second draw * 1000 is the pseudo-frequency
        assert_eq!(classify_with(vec![0.5, 0.10], 6000, None), Label::Dog);
        assert_eq!(classify_with(vec![0.5, 0.25], 6000, None), Label::Cat);
        assert_eq!(classify_with(vec![0.5, 0.35], 6000, None), Label::Cat);
        assert_eq!(classify_with(vec![0.5, 0.45], 6000, None), Label::Bird);
        assert_eq!(classify_with(vec![0.5, 0.65], 6000, None), Label::Bird);
        assert_eq!(classify_with(vec![0.5, 0.75], 6000, None), Label::Mosquito);
        assert_eq!(classify_with(vec![0.5, 0.999], 100, None), Label::Mosquito);
    }

    #[test]
    fn test_quiet_low_frequency_falls_back_to_random_animal() {
        // intensity 5.0 is not > 5, so the third draw picks among the animals
        assert_eq!(classify_with(vec![0.5, 0.1, 0.0], 5000, None), Label::Dog);
        assert_eq!(classify_with(vec![0.5, 0.1, 0.30], 5000, None), Label::Cat);
        assert_eq!(classify_with(vec![0.5, 0.1, 0.60], 5000, None), Label::Bird);
        assert_eq!(classify_with(vec![0.5, 0.1, 0.80], 5000, None), Label::Mosquito);
    }

    #[test]
    fn test_seeded_classification_is_reproducible() {
        let a = HeuristicClassifier::new(Arc::new(SeededRandom::new(7)));
        let b = HeuristicClassifier::new(Arc::new(SeededRandom::new(7)));
        for size in [1usize, 900, 4_999, 5_001, 80_000] {
            let s = submission(size, Some("recording.wav"));
            assert_eq!(a.classify(&s), b.classify(&s));
        }
    }

    #[test]
    fn test_output_stays_in_vocabulary() {
        let classifier = HeuristicClassifier::new(Arc::new(SeededRandom::new(1234)));
        for size in 1..500usize {
            let label = classifier.classify(&submission(size * 37, None));
            assert!(Label::ALL.contains(&label));
        }
    }
}
