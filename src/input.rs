use anyhow::{Context, Result};
use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};

use crate::app::{App, AppMode};

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

/// Single-line editable text with a char-indexed cursor.
#[derive(Debug, Default, Clone)]
pub struct TextField {
  pub value: String,
  /// Cursor position (char index).
  pub cursor: usize,
  /// Horizontal scroll offset in display columns, maintained by the renderer.
  pub scroll: usize,
}

impl TextField {
  /// Replace the contents and put the cursor at the end.
  pub fn set(&mut self, value: &str) {
    self.value = value.to_string();
    self.cursor = self.value.chars().count();
    self.scroll = 0;
  }

  pub fn clear(&mut self) {
    self.value.clear();
    self.cursor = 0;
    self.scroll = 0;
  }

  pub fn is_blank(&self) -> bool {
    self.value.trim().is_empty()
  }

  /// Apply an editing key. Returns `false` for keys that aren't editing keys.
  pub fn handle_key(&mut self, code: KeyCode) -> bool {
    match code {
      KeyCode::Char(c) => {
        let byte_idx = char_to_byte_index(&self.value, self.cursor);
        self.value.insert(byte_idx, c);
        self.cursor += 1;
      }
      KeyCode::Backspace => {
        if self.cursor > 0 {
          self.cursor -= 1;
          let byte_idx = char_to_byte_index(&self.value, self.cursor);
          self.value.remove(byte_idx);
        }
      }
      KeyCode::Delete => {
        if self.cursor < self.value.chars().count() {
          let byte_idx = char_to_byte_index(&self.value, self.cursor);
          self.value.remove(byte_idx);
        }
      }
      KeyCode::Left => {
        self.cursor = self.cursor.saturating_sub(1);
      }
      KeyCode::Right => {
        if self.cursor < self.value.chars().count() {
          self.cursor += 1;
        }
      }
      KeyCode::Home => {
        self.cursor = 0;
      }
      KeyCode::End => {
        self.cursor = self.value.chars().count();
      }
      _ => return false,
    }
    true
  }
}

// --- Event Handling ---

pub async fn handle_key_event(app: &mut App, key: event::KeyEvent) -> Result<()> {
  if key.modifiers.contains(KeyModifiers::CONTROL) {
    match key.code {
      KeyCode::Char('c') => {
        app.should_quit = true;
        return Ok(());
      }
      KeyCode::Char('t') => {
        app.next_theme();
        return Ok(());
      }
      KeyCode::Char('s') => {
        app.stop().await.context("Failed to stop playback")?;
        return Ok(());
      }
      KeyCode::Char('k') => {
        app.begin_edit_api_key();
        return Ok(());
      }
      KeyCode::Char('u') => {
        app.begin_edit_subtitle();
        return Ok(());
      }
      KeyCode::Char('f') => {
        app.toggle_fullscreen().await;
        return Ok(());
      }
      KeyCode::Char('o') => {
        open_current_in_browser(app);
        return Ok(());
      }
      // Unbound chords never reach the text fields or list keys.
      KeyCode::Char(_) => return Ok(()),
      _ => {}
    }
  }

  match app.mode {
    AppMode::Input => handle_input_key(app, key),
    AppMode::Recent => handle_recent_key(app, key).await.context("Failed to handle recent list key event")?,
    AppMode::ApiKey => handle_api_key_key(app, key),
    AppMode::Subtitle => handle_subtitle_key(app, key).await,
  }
  Ok(())
}

fn open_current_in_browser(app: &mut App) {
  let Some(ref record) = app.current else { return };
  let url = record.url.clone();
  // Use platform-appropriate command to open URL in default browser.
  #[cfg(target_os = "macos")]
  let cmd = "open";
  #[cfg(not(target_os = "macos"))]
  let cmd = "xdg-open";
  match std::process::Command::new(cmd)
    .arg(&url)
    .stdin(std::process::Stdio::null())
    .stdout(std::process::Stdio::null())
    .stderr(std::process::Stdio::null())
    .spawn()
  {
    Ok(mut child) => {
      // Reap the child in a background thread to avoid zombie processes.
      std::thread::spawn(move || {
        let _ = child.wait();
      });
    }
    Err(e) => {
      app.set_error(format!("Failed to open browser: {}", e));
    }
  }
}

fn handle_input_key(app: &mut App, key: event::KeyEvent) {
  app.clear_error();
  match key.code {
    KeyCode::Enter => {
      app.trigger_submit();
    }
    KeyCode::Tab | KeyCode::Down => {
      if !app.recent.is_empty() {
        app.focus_recent();
      }
    }
    KeyCode::Esc => {
      if !app.url_field.value.is_empty() {
        app.url_field.clear();
      } else if !app.recent.is_empty() {
        app.focus_recent();
      } else {
        app.should_quit = true;
      }
    }
    code => {
      app.url_field.handle_key(code);
    }
  }
}

async fn handle_recent_key(app: &mut App, key: event::KeyEvent) -> Result<()> {
  match key.code {
    KeyCode::Enter => {
      app.select_recent().await;
    }
    KeyCode::Char(' ') => {
      app.toggle_pause().await;
    }
    KeyCode::Char(']') | KeyCode::Char('>') => {
      app.faster().await;
    }
    KeyCode::Char('[') | KeyCode::Char('<') => {
      app.slower().await;
    }
    KeyCode::Char('x') => {
      app.clear_recent();
    }
    KeyCode::Down | KeyCode::Char('j') => {
      let count = app.recent.len();
      if count > 0 {
        let i = app.list_state.selected().map_or(0, |i| (i + 1) % count);
        app.list_state.select(Some(i));
      }
    }
    KeyCode::Up | KeyCode::Char('k') => {
      let count = app.recent.len();
      if count > 0 {
        let i =
          app.list_state.selected().map_or(0, |i| if i == 0 { count.saturating_sub(1) } else { i.saturating_sub(1) });
        app.list_state.select(Some(i));
      }
    }
    KeyCode::Esc | KeyCode::Tab => {
      app.mode = AppMode::Input;
    }
    _ => {}
  }
  Ok(())
}

fn handle_api_key_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter => app.save_api_key(),
    KeyCode::Esc => app.mode = AppMode::Input,
    code => {
      app.key_field.handle_key(code);
    }
  }
}

async fn handle_subtitle_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter => app.apply_subtitle().await,
    KeyCode::Esc => app.mode = AppMode::Input,
    code => {
      app.subtitle_field.handle_key(code);
    }
  }
}
