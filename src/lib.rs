//! Discussion Harvester library.
//!
//! Crawls a forum category rendered in a real browser, expands every
//! discussion's collapsed content, and turns the noisy rendered text into
//! clean structured records for export.

// Allow raw string hashes for safety - they're harmless and prevent issues if content changes
#![allow(clippy::needless_raw_string_hashes)]

pub mod config;
pub mod constants;
pub mod export;
pub mod harvester;
pub mod models;
pub mod normalize;
pub mod reconcile;
pub mod session;
