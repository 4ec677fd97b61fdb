use serde::{Deserialize, Serialize};

/// A user-added playable item, as stored under `recent_movies`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
  pub url: String,
  pub title: String,
  #[serde(default)]
  pub poster: Option<String>,
  #[serde(default)]
  pub overview: String,
  /// Milliseconds since the Unix epoch at submission.
  #[serde(default)]
  pub added_at: i64,
}

impl MediaRecord {
  /// Record with no artwork or overview, stamped with the current time.
  pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
    Self {
      url: url.into(),
      title: title.into(),
      poster: None,
      overview: String::new(),
      added_at: chrono::Utc::now().timestamp_millis(),
    }
  }

  /// Both `url` and `title` must be non-blank for a record to enter history.
  pub fn is_valid(&self) -> bool {
    !self.url.trim().is_empty() && !self.title.trim().is_empty()
  }

  /// Container label guessed from the URL, for display only.
  pub fn media_type_hint(&self) -> Option<&'static str> {
    let url = self.url.to_lowercase();
    if url.contains(".mp4") {
      Some("video/mp4")
    } else if url.contains(".webm") {
      Some("video/webm")
    } else if url.contains(".ogg") || url.contains(".ogv") {
      Some("video/ogg")
    } else if url.contains(".mkv") {
      Some("video/x-matroska")
    } else if url.contains(".avi") {
      Some("video/x-msvideo")
    } else {
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn serializes_with_original_field_names() {
    let record = MediaRecord {
      url: "https://example.com/a.mp4".to_string(),
      title: "A".to_string(),
      poster: None,
      overview: String::new(),
      added_at: 1_700_000_000_000,
    };
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(
      json,
      serde_json::json!({
        "url": "https://example.com/a.mp4",
        "title": "A",
        "poster": null,
        "overview": "",
        "addedAt": 1_700_000_000_000i64,
      })
    );
  }

  #[test]
  fn missing_optional_fields_default() {
    let record: MediaRecord = serde_json::from_str(r#"{"url":"u","title":"t"}"#).unwrap();
    assert_eq!(record.poster, None);
    assert_eq!(record.overview, "");
    assert_eq!(record.added_at, 0);
  }

  #[test]
  fn new_stamps_current_time() {
    let before = chrono::Utc::now().timestamp_millis();
    let record = MediaRecord::new("u", "t");
    assert!(record.added_at >= before);
    assert!(record.poster.is_none());
  }

  #[test]
  fn validity_requires_url_and_title() {
    assert!(MediaRecord::new("u", "t").is_valid());
    assert!(!MediaRecord::new("  ", "t").is_valid());
    assert!(!MediaRecord::new("u", " ").is_valid());
  }

  #[test]
  fn media_type_hint_from_url() {
    assert_eq!(MediaRecord::new("https://x/a.MP4?dl=1", "a").media_type_hint(), Some("video/mp4"));
    assert_eq!(MediaRecord::new("https://x/a.mkv", "a").media_type_hint(), Some("video/x-matroska"));
    assert_eq!(MediaRecord::new("https://x/a.ogv", "a").media_type_hint(), Some("video/ogg"));
    assert_eq!(MediaRecord::new("https://x/stream", "a").media_type_hint(), None);
  }
}
