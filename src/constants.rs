//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so it's always available,
//! parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  pub history_capacity: usize,
  pub untitled_title: String,

  // Persistence keys
  pub history_key: String,
  pub api_key_key: String,

  // TMDB
  pub tmdb_api_base: String,
  pub tmdb_image_base: String,

  // Title normalization
  pub video_extensions: Vec<String>,
  pub release_tags: Vec<String>,

  // Player
  pub playback_rates: Vec<f64>,
  pub error_dismiss_secs: u64,
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed every test fails loudly.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}
