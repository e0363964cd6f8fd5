//! Concrete provider adapter implementations.

pub(crate) mod common;

#[cfg(feature = "cloudflare")]
mod cloudflare;
#[cfg(feature = "digitalocean")]
mod digitalocean;

#[cfg(feature = "cloudflare")]
pub use cloudflare::CloudflareAdapter;
#[cfg(feature = "digitalocean")]
pub use digitalocean::DigitaloceanAdapter;
