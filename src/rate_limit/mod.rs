//! # Rate Limiting Module
//!
//! Per-identity admission control over fixed time windows.
//!
//! ## Key Components:
//! - **RateLimiter**: Admission decision for one named policy
//! - **WindowStore**: Pluggable counter storage (in-memory by default)
//! - **client_identity**: Derives the caller key from a request
//!
//! ## Policies:
//! - **general**: 100 requests / 15 minutes on every `/api` route
//! - **translation**: 20 requests / 5 minutes on `POST /api/translate`

pub mod identity;
pub mod limiter;
pub mod store;

pub use identity::client_identity;
pub use limiter::{Decision, RateLimitPolicy, RateLimiter};
