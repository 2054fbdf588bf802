//! Capabilities the pipelines depend on but do not implement.
//!
//! Production implementations live in `browser`, `ai` and `notion::api`;
//! test doubles live in `testing`.

pub mod browser;
pub mod extractor;
pub mod notion;
