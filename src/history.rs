//! Recently played links: newest first, unique by URL, capped.

use std::collections::HashSet;
use tracing::debug;

use crate::constants::constants;
use crate::record::MediaRecord;
use crate::storage::{SharedStore, load_stored, save_stored};

/// Put `movie` at the front of `items`, dropping any entry with the same URL
/// and anything beyond the capacity. `items` is left untouched.
pub fn add(items: &[MediaRecord], movie: MediaRecord) -> Vec<MediaRecord> {
  add_with_capacity(items, movie, constants().history_capacity)
}

pub fn add_with_capacity(items: &[MediaRecord], movie: MediaRecord, capacity: usize) -> Vec<MediaRecord> {
  let mut next = Vec::with_capacity(capacity.min(items.len() + 1));
  let url = movie.url.clone();
  next.push(movie);
  next.extend(items.iter().filter(|m| m.url != url).cloned());
  next.truncate(capacity);
  next
}

/// Restore the history invariants on data that came from disk.
fn sanitize(items: Vec<MediaRecord>, capacity: usize) -> Vec<MediaRecord> {
  let mut seen = HashSet::new();
  items.into_iter().filter(MediaRecord::is_valid).filter(|m| seen.insert(m.url.clone())).take(capacity).collect()
}

pub struct HistoryStore {
  store: SharedStore,
  key: String,
  capacity: usize,
}

impl HistoryStore {
  pub fn new(store: SharedStore) -> Self {
    let c = constants();
    Self { store, key: c.history_key.clone(), capacity: c.history_capacity }
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Persisted history, or empty if it is absent, corrupt or unreadable.
  pub fn load(&self) -> Vec<MediaRecord> {
    let items: Vec<MediaRecord> = load_stored(self.store.as_ref(), &self.key, Vec::new());
    let loaded = items.len();
    let items = sanitize(items, self.capacity);
    debug!(loaded, kept = items.len(), "history: loaded");
    items
  }

  /// Best effort; failures are logged and dropped.
  pub fn save(&self, items: &[MediaRecord]) {
    save_stored(self.store.as_ref(), &self.key, items);
  }

  pub fn add(&self, items: &[MediaRecord], movie: MediaRecord) -> Vec<MediaRecord> {
    add_with_capacity(items, movie, self.capacity)
  }

  pub fn clear(&self) -> Vec<MediaRecord> {
    Vec::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::storage::{KeyValueStore, MemoryStore, UnavailableStore};
  use std::sync::Arc;

  fn record(url: &str, added_at: i64) -> MediaRecord {
    MediaRecord {
      url: url.to_string(),
      title: format!("Title {}", added_at),
      poster: None,
      overview: String::new(),
      added_at,
    }
  }

  fn urls(items: &[MediaRecord]) -> Vec<&str> {
    items.iter().map(|m| m.url.as_str()).collect()
  }

  // --- add ---

  #[test]
  fn add_to_empty() {
    let items = add(&[], record("a", 1));
    assert_eq!(urls(&items), vec!["a"]);
  }

  #[test]
  fn add_same_url_twice_keeps_one() {
    let m = record("a", 1);
    let items = add(&add(&[], m.clone()), m);
    assert_eq!(items.len(), 1);
  }

  #[test]
  fn add_duplicate_moves_to_front_with_new_record() {
    let items = add(&add(&add(&[], record("a", 1)), record("b", 2)), record("a", 3));
    assert_eq!(urls(&items), vec!["a", "b"]);
    assert_eq!(items[0].added_at, 3);
  }

  #[test]
  fn add_replaces_entry_from_the_middle() {
    let items = vec![record("a", 1), record("b", 2), record("c", 3)];
    let next = add(&items, record("b", 4));
    assert_eq!(urls(&next), vec!["b", "a", "c"]);
    assert_eq!(next[0].added_at, 4);
  }

  #[test]
  fn add_does_not_mutate_input() {
    let items = vec![record("a", 1), record("b", 2)];
    let before = items.clone();
    let next = add(&items, record("c", 3));
    assert_eq!(items, before);
    assert_eq!(urls(&next), vec!["c", "a", "b"]);
  }

  #[test]
  fn add_twenty_five_keeps_newest_twenty_four() {
    let mut items = Vec::new();
    for i in 0..25 {
      items = add(&items, record(&format!("url-{}", i), i));
    }
    assert_eq!(items.len(), 24);
    assert_eq!(items[0].url, "url-24");
    assert_eq!(items[23].url, "url-1");
    assert!(items.iter().all(|m| m.url != "url-0"));
  }

  #[test]
  fn add_with_zero_capacity_is_empty() {
    assert!(add_with_capacity(&[record("a", 1)], record("b", 2), 0).is_empty());
  }

  // --- persistence ---

  #[test]
  fn save_then_load_preserves_order() {
    let history = HistoryStore::new(Arc::new(MemoryStore::new()));
    let items = history.add(&history.add(&[], record("a", 1)), record("b", 2));
    history.save(&items);
    assert_eq!(urls(&history.load()), vec!["b", "a"]);
  }

  #[test]
  fn clear_then_save_then_load_is_empty() {
    let history = HistoryStore::new(Arc::new(MemoryStore::new()));
    history.save(&[record("a", 1)]);
    let cleared = history.clear();
    history.save(&cleared);
    assert!(history.load().is_empty());
  }

  #[test]
  fn load_missing_is_empty() {
    let history = HistoryStore::new(Arc::new(MemoryStore::new()));
    assert!(history.load().is_empty());
  }

  #[test]
  fn load_unparseable_is_empty() {
    let store = Arc::new(MemoryStore::new());
    store.save("recent_movies", "definitely not json").unwrap();
    let history = HistoryStore::new(store);
    assert!(history.load().is_empty());
  }

  #[test]
  fn load_from_unavailable_storage_is_empty() {
    let history = HistoryStore::new(Arc::new(UnavailableStore));
    assert!(history.load().is_empty());
    history.save(&[record("a", 1)]);
  }

  #[test]
  fn load_reads_original_layout() {
    let store = Arc::new(MemoryStore::new());
    store
      .save(
        "recent_movies",
        r#"[{"url":"https://x/a.mp4","title":"A","poster":"https://image.tmdb.org/t/p/w500/a.jpg","overview":"o","addedAt":5}]"#,
      )
      .unwrap();
    let items = HistoryStore::new(store).load();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].poster.as_deref(), Some("https://image.tmdb.org/t/p/w500/a.jpg"));
    assert_eq!(items[0].added_at, 5);
  }

  #[test]
  fn load_restores_invariants() {
    let store = Arc::new(MemoryStore::new());
    let mut stored = vec![record("a", 1), record("a", 2), record(" ", 3)];
    stored.extend((0..30).map(|i| record(&format!("u{}", i), i)));
    store.save("recent_movies", &serde_json::to_string(&stored).unwrap()).unwrap();

    let items = HistoryStore::new(store).load();
    assert_eq!(items.len(), 24);
    assert_eq!(items[0].added_at, 1);
    assert_eq!(items.iter().filter(|m| m.url == "a").count(), 1);
    assert!(items.iter().all(MediaRecord::is_valid));
  }
}
