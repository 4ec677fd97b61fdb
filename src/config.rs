use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

const APP_NAME: &str = "cloudreel";

#[derive(Serialize, Deserialize, Default, Debug, PartialEq)]
pub struct Config {
  pub theme_name: Option<String>,
  pub display_mode: Option<String>,
  /// Extra release tags stripped from guessed titles, matched literally.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub extra_release_tags: Vec<String>,
}

impl Config {
  pub fn load() -> Self {
    if let Some(proj_dirs) = ProjectDirs::from("", "", APP_NAME) {
      let config_file = proj_dirs.config_dir().join("prefs.toml");
      if let Ok(content) = std::fs::read_to_string(&config_file) {
        match toml::from_str(&content) {
          Ok(config) => return config,
          Err(e) => warn!(path = %config_file.display(), err = %e, "config: invalid prefs.toml, using defaults"),
        }
      }
    }
    Self::default()
  }

  pub fn save(&self) {
    if let Some(proj_dirs) = ProjectDirs::from("", "", APP_NAME) {
      let config_dir = proj_dirs.config_dir();
      if std::fs::create_dir_all(config_dir).is_ok() {
        let config_file = config_dir.join("prefs.toml");
        if let Ok(content) = toml::to_string(self) {
          let _ = std::fs::write(config_file, content);
        }
      }
    }
  }
}

/// Per-user data directory (history store, logs).
pub fn data_dir() -> Option<PathBuf> {
  ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_full_prefs() {
    let config: Config = toml::from_str(
      r#"
        theme_name = "slate"
        display_mode = "ascii"
        extra_release_tags = ["remux", "proper"]
      "#,
    )
    .unwrap();
    assert_eq!(config.theme_name.as_deref(), Some("slate"));
    assert_eq!(config.display_mode.as_deref(), Some("ascii"));
    assert_eq!(config.extra_release_tags, vec!["remux", "proper"]);
  }

  #[test]
  fn empty_prefs_are_default() {
    let config: Config = toml::from_str("").unwrap();
    assert_eq!(config, Config::default());
  }

  #[test]
  fn serialized_prefs_omit_empty_tags() {
    let config = Config { theme_name: Some("violet".to_string()), ..Config::default() };
    let text = toml::to_string(&config).unwrap();
    assert!(text.contains("theme_name = \"violet\""));
    assert!(!text.contains("extra_release_tags"));
  }
}
