use image::imageops::FilterType;
use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, BorderType, List, ListItem, Padding, Paragraph, Wrap},
};

use crate::app::{App, AppMode};
use crate::display::DisplayMode;
use crate::graphics::{PosterWidget, poster_size};
use crate::input::TextField;
use crate::player::rate_label;
use crate::theme::Theme;

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

/// `n` items, pluralized.
fn movie_count(n: usize) -> String {
  if n == 1 { "1 movie".to_string() } else { format!("{} movies", n) }
}

fn rounded(theme: &Theme) -> Block<'static> {
  Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(theme.border))
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, main_area, status_area, input_area, detected_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(6),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, theme, header_area);

  let [player_area, recent_area] =
    Layout::horizontal([Constraint::Percentage(62), Constraint::Percentage(38)]).areas(main_area);
  render_now_playing(frame, app, player_area);
  render_recent(frame, app, recent_area);

  render_status(frame, app, status_area);
  render_input(frame, app, input_area);
  render_detected(frame, app, detected_area);
  render_footer(frame, app, footer_area);
}

fn render_header(frame: &mut Frame, theme: &Theme, area: Rect) {
  let left = Line::from(Span::styled(" ▶ cloudreel ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)));
  frame.render_widget(left, area);

  let version = format!("v{} ", env!("CARGO_PKG_VERSION"));
  let right = Line::from(Span::styled(&version, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(version.len() as u16), width: version.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

fn render_now_playing(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let title = Line::from(vec![
    Span::styled(" Now Playing ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
    Span::styled(format!("[{}] ", app.display_mode.label().to_lowercase()), Style::default().fg(theme.muted)),
  ]);
  let block = rounded(theme).title(title).padding(Padding::horizontal(1));
  let inner = block.inner(area);
  frame.render_widget(block, area);

  let Some(current) = app.current.clone() else {
    render_welcome(frame, theme, inner);
    return;
  };

  let poster_w = if app.display_mode == DisplayMode::Off { 0 } else { (inner.height * 4 / 3).min(inner.width / 2) };
  let gap = if poster_w > 0 { 1 } else { 0 };
  let [poster_area, _, info_area] =
    Layout::horizontal([Constraint::Length(poster_w), Constraint::Length(gap), Constraint::Min(10)]).areas(inner);

  if poster_w > 0 {
    render_poster(frame, app, poster_area);
  }

  let inner_w = info_area.width as usize;
  let mut lines = vec![
    Line::from(Span::styled(
      truncate_str(&current.title, inner_w),
      Style::default().fg(theme.fg).add_modifier(Modifier::BOLD),
    )),
    Line::from(""),
  ];

  let state = if !app.player.is_playing() {
    "stopped"
  } else if app.player.paused {
    "paused"
  } else {
    "playing"
  };
  let mut meta = vec![
    Span::styled("State  ", Style::default().fg(theme.muted)),
    Span::styled(state, Style::default().fg(theme.fg)),
    Span::styled("   Speed  ", Style::default().fg(theme.muted)),
    Span::styled(rate_label(app.playback.rate), Style::default().fg(theme.fg)),
  ];
  if app.playback.fullscreen {
    meta.push(Span::styled("   fullscreen", Style::default().fg(theme.muted)));
  }
  lines.push(Line::from(meta));

  if let Some(hint) = current.media_type_hint() {
    lines.push(Line::from(vec![
      Span::styled("Type   ", Style::default().fg(theme.muted)),
      Span::styled(hint, Style::default().fg(theme.fg)),
    ]));
  }
  if let Some(sub) = &app.playback.subtitle_url {
    lines.push(Line::from(vec![
      Span::styled("Subs   ", Style::default().fg(theme.muted)),
      Span::styled(truncate_str(sub, inner_w.saturating_sub(7)), Style::default().fg(theme.fg)),
    ]));
  }
  lines.push(Line::from(""));
  if !current.overview.is_empty() {
    lines.push(Line::from(Span::styled(current.overview.clone(), Style::default().fg(theme.fg))));
    lines.push(Line::from(""));
  }
  lines.push(Line::from(Span::styled(
    truncate_str(&current.url, inner_w),
    Style::default().fg(theme.accent).add_modifier(Modifier::UNDERLINED),
  )));

  frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), info_area);
}

fn render_welcome(frame: &mut Frame, theme: &Theme, area: Rect) {
  let text = vec![
    Line::from(""),
    Line::from(Span::styled("▶  Welcome to cloudreel", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))),
    Line::from(""),
    Line::from(Span::styled("Paste a direct video link. Watch it in mpv.", Style::default().fg(theme.fg))),
    Line::from(""),
    Line::from(Span::styled("Press ^k to add a TMDB key for posters.", Style::default().fg(theme.muted))),
  ];
  frame.render_widget(Paragraph::new(text).alignment(Alignment::Center), area);
}

/// Draw the cached poster, resizing only when the area or the image changed.
fn render_poster(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let Some((ref url, ref image)) = app.poster.image else {
    let placeholder = Block::default().style(Style::default().bg(theme.placeholder));
    let label = Paragraph::new("\n🎬").alignment(Alignment::Center).block(placeholder);
    frame.render_widget(label, area);
    return;
  };

  let needs_resize = match &app.poster.resized {
    Some((cached_url, w, h, _)) => cached_url != url || *w != area.width || *h != area.height,
    None => true,
  };
  if needs_resize {
    let (w, h) = poster_size(area, app.display_mode);
    let resized = image.resize_to_fill(w, h, FilterType::Lanczos3);
    app.poster.resized = Some((url.clone(), area.width, area.height, resized));
  }

  if let Some((_, _, _, ref resized)) = app.poster.resized {
    frame.render_widget(PosterWidget { image: resized, display_mode: app.display_mode }, area);
  }
}

fn render_recent(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let focused = app.mode == AppMode::Recent;
  let border_color = if focused { theme.accent } else { theme.border };
  let title = format!(" Recent · {} of {} ", movie_count(app.recent.len()), app.history_capacity());
  let block = rounded(theme)
    .title(title)
    .title_style(Style::default().fg(border_color).add_modifier(Modifier::BOLD))
    .border_style(Style::default().fg(border_color));

  if app.recent.is_empty() {
    let empty = Paragraph::new("\nNo movies yet.").alignment(Alignment::Center).fg(theme.muted).block(block);
    frame.render_widget(empty, area);
    return;
  }

  // Inner width: area minus 2 borders minus 2 chars for highlight symbol ("▶ ")
  let inner_w = area.width.saturating_sub(4) as usize;
  let playing_url = app.current.as_ref().map(|c| c.url.as_str());

  let items: Vec<ListItem> = app
    .recent
    .iter()
    .enumerate()
    .map(|(i, record)| {
      let bg = if i % 2 == 1 { theme.stripe_bg } else { theme.bg };
      let marker = if Some(record.url.as_str()) == playing_url { "♪ " } else { "" };
      let title = truncate_str(&format!("{}{}", marker, record.title), inner_w);
      ListItem::new(Line::from(Span::styled(title, Style::default().fg(theme.fg)))).bg(bg)
    })
    .collect();

  let mut list = List::new(items).block(block).highlight_symbol("▶ ");
  if focused {
    list =
      list.highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));
  }

  frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let (text, style) = if let Some(msg) = &app.status_message {
    (format!(" ⏳ {}", msg), Style::default().fg(theme.status))
  } else if let Some(err) = &app.last_error {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if let Some(status) = app.player.get_last_mpv_status() {
    (format!(" ♪ {}", status), Style::default().fg(theme.status))
  } else if let Some(info) = &app.info_message {
    (format!(" {}", info), Style::default().fg(theme.muted))
  } else {
    (" Ready".to_string(), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_input(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let editing = matches!(app.mode, AppMode::Input | AppMode::ApiKey | AppMode::Subtitle);
  let border_color = if editing { theme.accent } else { theme.border };
  let (title, masked, field) = match app.mode {
    AppMode::ApiKey => (" TMDB API key ", true, &mut app.key_field),
    AppMode::Subtitle => (" Subtitle URL (.vtt) ", false, &mut app.subtitle_field),
    AppMode::Input | AppMode::Recent => (" Cloud video link ", false, &mut app.url_field),
  };
  let input_block = Block::bordered()
    .title(title)
    .title_style(Style::default().fg(border_color))
    .border_type(BorderType::Rounded)
    .border_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let (visible, cursor_offset) = visible_text(field, inner_w, masked);

  let paragraph = Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(input_block);
  frame.render_widget(paragraph, area);

  if editing {
    frame.set_cursor_position((area.x + 2 + cursor_offset as u16, area.y + 1));
  }
}

/// Scroll `field` so the cursor is visible and return the visible slice plus the
/// cursor column within it. Masked fields render as bullets.
fn visible_text(field: &mut TextField, width: usize, masked: bool) -> (String, usize) {
  let shown: String = if masked { "•".repeat(field.value.chars().count()) } else { field.value.clone() };
  let cursor_col = display_width(&shown, field.cursor);

  if cursor_col < field.scroll {
    field.scroll = cursor_col;
  } else if cursor_col >= field.scroll + width {
    field.scroll = cursor_col.saturating_sub(width) + 1;
  }

  let scroll = field.scroll;
  let visible = shown
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= scroll)
    .take_while(|(start, _, _)| *start < scroll + width)
    .map(|(_, _, c)| c)
    .collect();
  (visible, cursor_col - scroll)
}

fn render_detected(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let line = match (app.mode, app.detected_title()) {
    (AppMode::Input, Some(title)) => Line::from(vec![
      Span::styled(" Detected title: ", Style::default().fg(theme.muted)),
      Span::styled(title, Style::default().fg(theme.fg).add_modifier(Modifier::ITALIC)),
    ]),
    _ => Line::from(""),
  };
  frame.render_widget(line, area);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let has_recent = !app.recent.is_empty();
  let is_playing = app.player.is_playing();
  let keys: Vec<(&str, &str)> = match app.mode {
    AppMode::Input => {
      let mut k = vec![("Enter", "Add & play"), ("^k", "TMDB key"), ("^u", "Subs")];
      if is_playing {
        k.push(("^s", "Stop"));
        k.push(("^f", "Fullscreen"));
      }
      if has_recent {
        k.push(("Tab", "Recent"));
      } else {
        k.push(("Esc", "Quit"));
      }
      k
    }
    AppMode::Recent => {
      let mut k = vec![("Enter", "Play"), ("j/k", "Navigate")];
      if is_playing {
        let pause_label = if app.player.paused { "Resume" } else { "Pause" };
        k.push(("Space", pause_label));
        k.push(("[ ]", "Speed"));
        k.push(("^s", "Stop"));
      }
      k.push(("x", "Clear"));
      k.push(("Esc", "Back"));
      k
    }
    AppMode::ApiKey | AppMode::Subtitle => vec![("Enter", "Save"), ("Esc", "Cancel")],
  };

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw("  "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let theme_label = format!("^t {} ", theme.name);
  let right = Line::from(Span::styled(&theme_label, Style::default().fg(theme.muted)));
  let label_w = theme_label.chars().count() as u16;
  let right_area = Rect { x: area.x + area.width.saturating_sub(label_w), width: label_w.min(area.width), ..area };
  frame.render_widget(right, right_area);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_width_counts_wide_chars() {
    assert_eq!(display_width("abc", 2), 2);
    assert_eq!(display_width("日本", 2), 4);
  }

  #[test]
  fn truncate_appends_ellipsis() {
    assert_eq!(truncate_str("short", 10), "short");
    assert_eq!(truncate_str("a longer title", 6), "a lon…");
  }

  #[test]
  fn movie_count_pluralizes() {
    assert_eq!(movie_count(0), "0 movies");
    assert_eq!(movie_count(1), "1 movie");
    assert_eq!(movie_count(24), "24 movies");
  }

  #[test]
  fn visible_text_scrolls_to_cursor() {
    let mut field = TextField::default();
    field.set("abcdefghij");
    let (visible, cursor) = visible_text(&mut field, 4, false);
    assert_eq!(visible, "hij");
    assert_eq!(cursor, 3);
    assert_eq!(field.scroll, 7);
  }

  #[test]
  fn masked_text_hides_key() {
    let mut field = TextField::default();
    field.set("secret");
    let (visible, _) = visible_text(&mut field, 20, true);
    assert_eq!(visible, "••••••");
  }
}
