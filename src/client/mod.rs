//! Client Module
//!
//! Upstream HTTP client and forwarded credential resolution.

pub mod credential;
pub mod upstream;

pub use credential::{bearer, resolve_authorization};
pub use upstream::UpstreamClient;
