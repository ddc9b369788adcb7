//! Data models for registry payloads.
//!
//! These types map one-to-one onto the JSON the registry agent accepts and
//! returns, with a typed layer (`Registration`, `HealthCheck`,
//! `DiscoveredInstance`) on top for callers.

mod discovered;
mod duration;
mod health;
mod registration;

pub use discovered::*;
pub use duration::*;
pub use health::*;
pub use registration::*;
