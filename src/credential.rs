use crate::constants::constants;
use crate::storage::{SharedStore, load_stored, save_stored};

/// Holder for the optional TMDB API key, persisted under `tmdb_api_key`.
pub struct CredentialStore {
  store: SharedStore,
  key: String,
}

impl CredentialStore {
  pub fn new(store: SharedStore) -> Self {
    Self { store, key: constants().api_key_key.clone() }
  }

  /// Stored key, or an empty string when none is saved or storage fails.
  pub fn load(&self) -> String {
    load_stored(self.store.as_ref(), &self.key, String::new())
  }

  pub fn save(&self, api_key: &str) {
    save_stored(self.store.as_ref(), &self.key, api_key);
  }
}

/// Blank keys count as "not configured".
pub fn configured(api_key: &str) -> Option<&str> {
  let trimmed = api_key.trim();
  (!trimmed.is_empty()).then_some(trimmed)
}
