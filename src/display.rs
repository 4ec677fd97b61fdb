use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliDisplayMode {
  Auto,
  Direct,
  Ascii,
  Off,
}

/// How posters are drawn in the Now Playing panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
  Ascii,
  Direct,
  Off,
}

impl DisplayMode {
  pub fn label(self) -> &'static str {
    match self {
      DisplayMode::Ascii => "ASCII",
      DisplayMode::Direct => "Half-block",
      DisplayMode::Off => "Off",
    }
  }
}

/// Detect the best poster mode the terminal supports.
///
/// - Direct: `COLORTERM` is `truecolor` or `24bit`
/// - Ascii: fallback
pub fn detect_display_mode() -> DisplayMode {
  let colorterm = std::env::var("COLORTERM").unwrap_or_default().to_lowercase();
  if colorterm == "truecolor" || colorterm == "24bit" {
    return DisplayMode::Direct;
  }
  DisplayMode::Ascii
}

pub fn resolve_display_mode(cli: CliDisplayMode) -> DisplayMode {
  match cli {
    CliDisplayMode::Auto => detect_display_mode(),
    CliDisplayMode::Direct => DisplayMode::Direct,
    CliDisplayMode::Ascii => DisplayMode::Ascii,
    CliDisplayMode::Off => DisplayMode::Off,
  }
}

/// Parse a `display_mode` value from prefs.toml; unknown values mean auto.
pub fn from_config(s: &str) -> CliDisplayMode {
  CliDisplayMode::from_str(s, true).unwrap_or(CliDisplayMode::Auto)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn explicit_modes_resolve_directly() {
    assert_eq!(resolve_display_mode(CliDisplayMode::Direct), DisplayMode::Direct);
    assert_eq!(resolve_display_mode(CliDisplayMode::Ascii), DisplayMode::Ascii);
    assert_eq!(resolve_display_mode(CliDisplayMode::Off), DisplayMode::Off);
  }

  #[test]
  fn config_values_parse_case_insensitively() {
    assert_eq!(from_config("direct"), CliDisplayMode::Direct);
    assert_eq!(from_config("ASCII"), CliDisplayMode::Ascii);
    assert_eq!(from_config("off"), CliDisplayMode::Off);
    assert_eq!(from_config("kitty"), CliDisplayMode::Auto);
  }
}
