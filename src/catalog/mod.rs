//! # Response Catalog Module
//!
//! Static, pre-authored "translations" for each label.
//!
//! ## Key Components:
//! - **ResponseVariant / Mood**: One text + media bundle and its mood tag
//! - **ResponseCatalog**: Label-keyed variant lists, validated at load time

pub mod repository;
pub mod variant;

pub use repository::ResponseCatalog;
pub use variant::ResponseVariant;
