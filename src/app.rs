use anyhow::Result;
use image::DynamicImage;
use ratatui::widgets::ListState;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::config::Config;
use crate::constants::constants;
use crate::credential::{self, CredentialStore};
use crate::display::DisplayMode;
use crate::history::HistoryStore;
use crate::input::TextField;
use crate::player::{PlaybackOptions, VideoPlayer, next_rate, previous_rate, rate_label};
use crate::record::MediaRecord;
use crate::storage::SharedStore;
use crate::submit::{resolve_submission, validate_url};
use crate::theme::{self, THEMES, Theme};
use crate::title::TitleNormalizer;
use crate::tmdb::{TmdbClient, fetch_poster};

// --- Types ---

pub type PosterResult = (String, DynamicImage);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  /// Editing the video URL.
  Input,
  /// Navigating the recent list; player controls live here.
  Recent,
  ApiKey,
  Subtitle,
}

/// Poster for the current record, plus a copy resized for the last-drawn area.
#[derive(Default)]
pub struct PosterCache {
  pub image: Option<PosterResult>,
  pub resized: Option<(String, u16, u16, DynamicImage)>,
}

/// In-flight async task receivers.
#[derive(Default)]
pub(crate) struct AsyncTasks {
  pub(crate) submit_rx: Option<oneshot::Receiver<MediaRecord>>,
  pub(crate) poster_rx: Option<oneshot::Receiver<Result<PosterResult>>>,
}

pub struct App {
  pub url_field: TextField,
  pub key_field: TextField,
  pub subtitle_field: TextField,
  pub mode: AppMode,
  pub theme_index: usize,
  pub display_mode: DisplayMode,
  pub recent: Vec<MediaRecord>,
  pub list_state: ListState,
  /// The selected record; stays visible after playback stops.
  pub current: Option<MediaRecord>,
  pub player: VideoPlayer,
  pub playback: PlaybackOptions,
  pub poster: PosterCache,
  pub api_key: String,
  pub last_error: Option<String>,
  pub status_message: Option<String>,
  /// Informational message, lower priority than status/error.
  pub info_message: Option<String>,
  pub should_quit: bool,
  history: HistoryStore,
  credentials: CredentialStore,
  normalizer: Arc<TitleNormalizer>,
  tmdb: Arc<TmdbClient>,
  config: Config,
  pub(crate) tasks: AsyncTasks,
  /// When the last error was set; used for auto-dismiss.
  error_time: Option<Instant>,
}

impl App {
  pub fn new(display_mode: DisplayMode, store: SharedStore, config: Config, http: Client) -> Result<Self> {
    let history = HistoryStore::new(Arc::clone(&store));
    let credentials = CredentialStore::new(store);
    let normalizer = TitleNormalizer::with_extra_tags(&config.extra_release_tags)?;
    let recent = history.load();
    let api_key = credentials.load();
    info!(recent = recent.len(), has_key = credential::configured(&api_key).is_some(), "app: state restored");

    Ok(Self {
      url_field: TextField::default(),
      key_field: TextField::default(),
      subtitle_field: TextField::default(),
      mode: AppMode::Input,
      theme_index: theme::index_of(config.theme_name.as_deref()),
      display_mode,
      recent,
      list_state: ListState::default(),
      current: None,
      player: VideoPlayer::new(),
      playback: PlaybackOptions::default(),
      poster: PosterCache::default(),
      api_key,
      last_error: None,
      status_message: None,
      info_message: None,
      should_quit: false,
      history,
      credentials,
      normalizer: Arc::new(normalizer),
      tmdb: Arc::new(TmdbClient::new(http)),
      config,
      tasks: AsyncTasks::default(),
      error_time: None,
    })
  }

  pub fn theme(&self) -> &'static Theme {
    &THEMES[self.theme_index]
  }

  pub fn next_theme(&mut self) {
    self.theme_index = (self.theme_index + 1) % THEMES.len();
    self.config.theme_name = Some(self.theme().name.to_string());
    self.config.save();
  }

  pub fn history_capacity(&self) -> usize {
    self.history.capacity()
  }

  /// Set an error message with auto-dismiss tracking.
  pub fn set_error(&mut self, msg: String) {
    self.last_error = Some(msg);
    self.error_time = Some(Instant::now());
  }

  pub fn clear_error(&mut self) {
    self.last_error = None;
    self.error_time = None;
  }

  /// Clear stale error messages.
  pub fn expire_error(&mut self) {
    if let Some(t) = self.error_time
      && t.elapsed() >= Duration::from_secs(constants().error_dismiss_secs)
    {
      self.last_error = None;
      self.error_time = None;
    }
  }

  /// Live preview of the title the current input would get.
  pub fn detected_title(&self) -> Option<String> {
    if self.url_field.is_blank() {
      return None;
    }
    Some(self.normalizer.normalize(self.url_field.value.trim()))
  }

  // --- History ---

  /// Replace the recent list, persisting only when it actually changed.
  fn set_recent(&mut self, items: Vec<MediaRecord>) {
    if items == self.recent {
      return;
    }
    self.recent = items;
    self.history.save(&self.recent);
    if self.recent.is_empty() {
      self.list_state.select(None);
    } else if self.list_state.selected().is_some_and(|i| i >= self.recent.len()) {
      self.list_state.select(Some(self.recent.len() - 1));
    }
  }

  /// Fold a submitted record into history as the newest entry.
  pub fn remember(&mut self, record: MediaRecord) {
    let next = self.history.add(&self.recent, record);
    self.set_recent(next);
  }

  pub fn clear_recent(&mut self) {
    info!(dropped = self.recent.len(), "history: cleared");
    self.recent = self.history.clear();
    self.history.save(&self.recent);
    self.list_state.select(None);
    self.mode = AppMode::Input;
  }

  pub fn focus_recent(&mut self) {
    if self.list_state.selected().is_none() {
      self.list_state.select(Some(0));
    }
    self.mode = AppMode::Recent;
  }

  // --- Submission ---

  /// Validate the URL input and start building its record in the background.
  ///
  /// A newer submission replaces the pending receiver, so a slower earlier
  /// lookup can never overwrite the latest selection.
  pub fn trigger_submit(&mut self) {
    let url = match validate_url(&self.url_field.value) {
      Ok(url) => url.to_string(),
      Err(e) => {
        self.set_error(e.to_string());
        return;
      }
    };
    info!(url = %url, "submit triggered");
    self.clear_error();
    self.info_message = None;
    self.status_message = Some("Adding…".to_string());

    let normalizer = Arc::clone(&self.normalizer);
    let tmdb = Arc::clone(&self.tmdb);
    let api_key = credential::configured(&self.api_key).map(str::to_string);
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let record = resolve_submission(&url, &normalizer, &tmdb, api_key.as_deref()).await;
      let _ = tx.send(record);
    });
    self.tasks.submit_rx = Some(rx);
  }

  pub async fn check_pending(&mut self) -> Result<()> {
    if let Some(mut rx) = self.tasks.submit_rx.take() {
      match rx.try_recv() {
        Ok(record) => {
          self.status_message = None;
          self.url_field.clear();
          self.remember(record.clone());
          self.play_record(record).await;
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.submit_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          self.status_message = None;
          self.set_error("Add task failed.".to_string());
        }
      }
    }

    if let Some(mut rx) = self.tasks.poster_rx.take() {
      match rx.try_recv() {
        Ok(Ok((url, image))) => {
          if self.current.as_ref().and_then(|c| c.poster.as_deref()) == Some(url.as_str()) {
            self.poster.image = Some((url, image));
            self.poster.resized = None;
          }
        }
        Ok(Err(e)) => {
          // Poster fetch failed silently; the placeholder stays.
          debug!(err = %format!("{:#}", e), "poster: fetch failed");
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.tasks.poster_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {}
      }
    }

    self.player.check_mpv_status();
    if self.player.reap_if_exited().await {
      self.info_message = Some("Playback ended.".to_string());
    }

    Ok(())
  }

  // --- Playback ---

  /// Make `record` current. A different video drops the subtitle track; the rate carries over.
  fn select_current(&mut self, record: &MediaRecord) {
    let same_video = self.current.as_ref().is_some_and(|c| c.url == record.url);
    if !same_video {
      self.playback.subtitle_url = None;
      self.subtitle_field.clear();
    }
    let poster_changed = self.poster.image.as_ref().map(|(url, _)| url.as_str()) != record.poster.as_deref();
    if poster_changed {
      self.poster = PosterCache::default();
      self.trigger_poster(record);
    }
    self.current = Some(record.clone());
  }

  /// Make `record` current and start playing it.
  pub async fn play_record(&mut self, record: MediaRecord) {
    self.select_current(&record);
    if let Err(e) = self.player.play(&record, &self.playback).await {
      self.set_error(format!("Playback error: {:#}", e));
      let _ = self.player.stop().await;
    }
  }

  fn trigger_poster(&mut self, record: &MediaRecord) {
    self.tasks.poster_rx = None;
    if self.display_mode == DisplayMode::Off {
      return;
    }
    let Some(url) = record.poster.clone() else { return };
    let client = self.tmdb.http().clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let result = fetch_poster(&client, &url).await.map(|image| (url, image));
      let _ = tx.send(result);
    });
    self.tasks.poster_rx = Some(rx);
  }

  /// Play the highlighted recent entry without reordering history.
  pub async fn select_recent(&mut self) {
    let Some(selected) = self.list_state.selected() else { return };
    let Some(record) = self.recent.get(selected).cloned() else { return };
    info!(url = %record.url, "recent selected");
    self.clear_error();
    self.play_record(record).await;
  }

  pub async fn stop(&mut self) -> Result<()> {
    if self.player.is_playing() {
      self.player.stop().await?;
      self.info_message = Some("Stopped.".to_string());
    }
    Ok(())
  }

  pub async fn toggle_pause(&mut self) {
    if let Err(e) = self.player.toggle_pause().await {
      self.set_error(format!("Pause error: {}", e));
    }
  }

  pub async fn faster(&mut self) {
    self.change_rate(next_rate(self.playback.rate)).await;
  }

  pub async fn slower(&mut self) {
    self.change_rate(previous_rate(self.playback.rate)).await;
  }

  async fn change_rate(&mut self, rate: f64) {
    self.playback.rate = rate;
    self.info_message = Some(format!("Speed {}", rate_label(rate)));
    if self.player.is_playing()
      && let Err(e) = self.player.set_speed(rate).await
    {
      self.set_error(format!("Speed error: {}", e));
    }
  }

  pub async fn toggle_fullscreen(&mut self) {
    self.playback.fullscreen = !self.playback.fullscreen;
    if self.player.is_playing()
      && let Err(e) = self.player.toggle_fullscreen().await
    {
      self.set_error(format!("Fullscreen error: {}", e));
    }
  }

  // --- Settings ---

  pub fn begin_edit_api_key(&mut self) {
    self.key_field.set(&self.api_key);
    self.mode = AppMode::ApiKey;
  }

  pub fn save_api_key(&mut self) {
    self.api_key = self.key_field.value.trim().to_string();
    self.credentials.save(&self.api_key);
    let configured = credential::configured(&self.api_key).is_some();
    info!(configured, "tmdb key updated");
    self.info_message = Some(if configured { "TMDB key saved." } else { "TMDB key cleared." }.to_string());
    self.mode = AppMode::Input;
  }

  pub fn begin_edit_subtitle(&mut self) {
    let current = self.playback.subtitle_url.clone().unwrap_or_default();
    self.subtitle_field.set(&current);
    self.mode = AppMode::Subtitle;
  }

  /// Attach the subtitle URL to the running player and remember it for restarts.
  pub async fn apply_subtitle(&mut self) {
    let url = self.subtitle_field.value.trim().to_string();
    self.mode = AppMode::Input;
    if url.is_empty() {
      self.playback.subtitle_url = None;
      return;
    }
    self.playback.subtitle_url = Some(url.clone());
    if self.player.is_playing()
      && let Err(e) = self.player.add_subtitle(&url).await
    {
      self.set_error(format!("Subtitle error: {}", e));
      return;
    }
    self.info_message = Some("Subtitles attached.".to_string());
  }
}
