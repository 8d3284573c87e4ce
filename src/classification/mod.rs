//! # Classification Module
//!
//! Turns a validated audio submission into one of five labels.
//!
//! ## Key Components:
//! - **Label**: The closed outcome vocabulary
//! - **Classifier**: Trait seam plus the heuristic stand-in implementation
//! - **RandomSource**: Injected randomness so tests can pin every draw

pub mod classifier;
pub mod label;
pub mod random;

pub use classifier::{Classifier, HeuristicClassifier};
pub use label::Label;
pub use random::{RandomSource, ThreadRandom};
#[cfg(test)]
pub use random::{ScriptedRandom, SeededRandom};
