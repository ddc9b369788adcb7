//! Registry operations on `RegistryClient`.
//!
//! Each submodule contains `impl RegistryClient` blocks for one concern. The
//! struct definition remains in `lib.rs`.

mod builder;
mod discovery;
mod heartbeat;
mod registration;
mod request;

pub use builder::RegistryClientBuilder;
pub use discovery::DiscoveryQuery;
pub use heartbeat::Heartbeat;

/// Percent-encode one path segment.
pub(crate) fn segment(value: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(value)
}
