use ratatui::style::Color;

pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub muted: Color,
  pub accent: Color,
  pub border: Color,
  pub status: Color,
  pub error: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  pub key_fg: Color,
  pub key_bg: Color,
  pub placeholder: Color,
}

pub static THEMES: [Theme; 3] = [
  Theme {
    name: "violet",
    bg: Color::Rgb(9, 9, 11),
    fg: Color::Rgb(244, 244, 245),
    muted: Color::Rgb(140, 140, 150),
    accent: Color::Rgb(168, 85, 247),
    border: Color::Rgb(63, 63, 70),
    status: Color::Rgb(192, 132, 252),
    error: Color::Rgb(248, 113, 113),
    highlight_fg: Color::Rgb(255, 255, 255),
    highlight_bg: Color::Rgb(88, 28, 135),
    stripe_bg: Color::Rgb(24, 24, 27),
    key_fg: Color::Rgb(9, 9, 11),
    key_bg: Color::Rgb(192, 132, 252),
    placeholder: Color::Rgb(112, 26, 117),
  },
  Theme {
    name: "slate",
    bg: Color::Rgb(15, 23, 42),
    fg: Color::Rgb(226, 232, 240),
    muted: Color::Rgb(100, 116, 139),
    accent: Color::Rgb(56, 189, 248),
    border: Color::Rgb(51, 65, 85),
    status: Color::Rgb(125, 211, 252),
    error: Color::Rgb(251, 113, 133),
    highlight_fg: Color::Rgb(15, 23, 42),
    highlight_bg: Color::Rgb(56, 189, 248),
    stripe_bg: Color::Rgb(30, 41, 59),
    key_fg: Color::Rgb(15, 23, 42),
    key_bg: Color::Rgb(148, 163, 184),
    placeholder: Color::Rgb(30, 64, 175),
  },
  Theme {
    name: "terminal",
    bg: Color::Reset,
    fg: Color::Reset,
    muted: Color::DarkGray,
    accent: Color::Magenta,
    border: Color::DarkGray,
    status: Color::Cyan,
    error: Color::Red,
    highlight_fg: Color::Black,
    highlight_bg: Color::Magenta,
    stripe_bg: Color::Reset,
    key_fg: Color::Black,
    key_bg: Color::Gray,
    placeholder: Color::DarkGray,
  },
];

/// Index of the theme called `name`, or the first theme.
pub fn index_of(name: Option<&str>) -> usize {
  name.and_then(|name| THEMES.iter().position(|t| t.name == name)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn theme_names_unique() {
    for (i, a) in THEMES.iter().enumerate() {
      assert!(THEMES.iter().skip(i + 1).all(|b| b.name != a.name));
    }
  }

  #[test]
  fn index_of_known_and_unknown() {
    assert_eq!(index_of(Some("slate")), 1);
    assert_eq!(index_of(Some("missing")), 0);
    assert_eq!(index_of(None), 0);
  }
}
