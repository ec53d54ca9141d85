//! Caching subsystem.
//!
//! [`response::ResponseCache`] holds finished completion texts keyed on the
//! request fingerprint. See the [`response`] module docs for expiry rules.

pub mod response;

pub use response::{CacheConfig, ResponseCache};
