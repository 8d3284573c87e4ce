//! # Audio Ingress Module
//!
//! Turns whatever the client sent (a multipart upload or a base64 data URL)
//! into a canonical [`AudioSubmission`] the classifier can work with.
//!
//! ## Key Components:
//! - **Submission**: The validated byte buffer plus its declared type and name
//! - **Ingress Validator**: Decoding, size limit and MIME allow-list checks
//! - **Upload Reader**: Streams the `audio` multipart field with an early size cutoff
//!
//! ## Accepted Types:
//! Audio: wav, mp3, mpeg, webm. Image types (jpeg, png, gif, webp) pass the
//! allow-list for future attachment flows but are not otherwise interpreted.

pub mod ingress;
pub mod submission;
pub mod upload;

pub use ingress::{IngressInput, IngressValidator, ValidationError};
pub use submission::AudioSubmission;
pub use upload::read_audio_field;
