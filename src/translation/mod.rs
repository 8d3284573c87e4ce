//! # Translation Module
//!
//! The submission-to-result pipeline and the result it produces.
//!
//! ## Key Components:
//! - **TranslationPipeline**: Admission, validation, classification, variant selection
//! - **ResultAssembler**: Confidence draw, timestamps, and the JSON wire form

pub mod pipeline;
pub mod result;

pub use pipeline::{ProcessingDelay, TranslationPipeline};
