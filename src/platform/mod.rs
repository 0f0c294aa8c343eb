//! Platform glue
//!
//! The core (filesystem, archive, stages, pipeline) is platform-agnostic and
//! tested natively. Only this layer knows it is running in a browser:
//!
//! - `web`: JS WASI host, line-input stdin, page config (wasm32 only)
//!
//! Timers and fetchers have their own browser implementations next to their
//! traits ([`crate::stage::BrowserTimer`], [`crate::fetch::HttpFetcher`]).

#[cfg(target_arch = "wasm32")]
pub mod web;
