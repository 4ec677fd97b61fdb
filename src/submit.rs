use anyhow::{Result, bail};
use tracing::{debug, info};

use crate::record::MediaRecord;
use crate::title::TitleNormalizer;
use crate::tmdb::{MovieMeta, TmdbClient};

/// Inline message shown for an empty submission.
pub const EMPTY_URL_MESSAGE: &str = "Please paste a valid video URL";

/// Trimmed URL, or the inline validation error.
pub fn validate_url(input: &str) -> Result<&str> {
  let url = input.trim();
  if url.is_empty() {
    bail!(EMPTY_URL_MESSAGE);
  }
  Ok(url)
}

/// Overlay whatever enrichment found onto the fallback record.
pub fn apply_meta(fallback: MediaRecord, meta: Option<MovieMeta>) -> MediaRecord {
  let Some(meta) = meta else { return fallback };
  let title = if meta.title.trim().is_empty() { fallback.title } else { meta.title };
  let overview = meta.overview.filter(|o| !o.is_empty()).unwrap_or(fallback.overview);
  MediaRecord { title, poster: meta.poster, overview, ..fallback }
}

/// Build the record for a validated URL. Always produces a usable record.
pub async fn resolve_submission(
  url: &str,
  normalizer: &TitleNormalizer,
  tmdb: &TmdbClient,
  api_key: Option<&str>,
) -> MediaRecord {
  let guessed = normalizer.normalize(url);
  let fallback = MediaRecord::new(url, guessed.as_str());
  let meta = tmdb.lookup(&guessed, api_key).await;
  if let Some(m) = &meta {
    debug!(tmdb_id = ?m.tmdb_id, release_date = ?m.release_date, "submit: tmdb match");
  }
  let enriched = meta.is_some();
  let record = apply_meta(fallback, meta);
  info!(url = %record.url, title = %record.title, enriched, "submit: record ready");
  record
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::history::HistoryStore;
  use crate::storage::MemoryStore;
  use std::sync::Arc;

  fn meta(title: &str, poster: Option<&str>, overview: Option<&str>) -> MovieMeta {
    MovieMeta {
      title: title.to_string(),
      poster: poster.map(str::to_string),
      tmdb_id: Some(1),
      release_date: None,
      overview: overview.map(str::to_string),
    }
  }

  #[test]
  fn blank_input_rejected() {
    assert_eq!(validate_url("").unwrap_err().to_string(), EMPTY_URL_MESSAGE);
    assert_eq!(validate_url(" \t\n").unwrap_err().to_string(), EMPTY_URL_MESSAGE);
  }

  #[test]
  fn input_trimmed() {
    assert_eq!(validate_url("  https://x/a.mp4 ").unwrap(), "https://x/a.mp4");
  }

  #[test]
  fn no_meta_keeps_fallback() {
    let fallback = MediaRecord::new("u", "Guess");
    assert_eq!(apply_meta(fallback.clone(), None), fallback);
  }

  #[test]
  fn meta_overrides_title_poster_overview() {
    let fallback = MediaRecord::new("u", "Guess");
    let added_at = fallback.added_at;
    let record = apply_meta(fallback, Some(meta("Real", Some("https://img/p.jpg"), Some("Plot"))));
    assert_eq!(record.url, "u");
    assert_eq!(record.title, "Real");
    assert_eq!(record.poster.as_deref(), Some("https://img/p.jpg"));
    assert_eq!(record.overview, "Plot");
    assert_eq!(record.added_at, added_at);
  }

  #[test]
  fn blank_meta_fields_do_not_erase_fallback() {
    let record = apply_meta(MediaRecord::new("u", "Guess"), Some(meta(" ", None, Some(""))));
    assert_eq!(record.title, "Guess");
    assert_eq!(record.poster, None);
    assert_eq!(record.overview, "");
  }

  #[tokio::test]
  async fn submission_without_key_becomes_newest_history_entry() {
    let normalizer = TitleNormalizer::with_extra_tags(&[]).unwrap();
    let tmdb = TmdbClient::with_endpoints(reqwest::Client::new(), "http://127.0.0.1:9", "http://127.0.0.1:9");
    let history = HistoryStore::new(Arc::new(MemoryStore::new()));
    let existing = history.add(&[], MediaRecord::new("https://example.com/files/Other.mkv", "Other"));
    history.save(&existing);

    let url = validate_url("https://example.com/files/Inception_2010_720p.mp4").unwrap();
    let record = resolve_submission(url, &normalizer, &tmdb, None).await;
    assert_eq!(record.title, "Inception 2010");
    assert_eq!(record.poster, None);
    assert_eq!(record.overview, "");

    let items = history.add(&history.load(), record.clone());
    history.save(&items);

    let reloaded = history.load();
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded[0], record);
  }
}
