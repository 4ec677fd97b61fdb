use anyhow::{Context, Result, anyhow};
use serde_json::{Value, json};
use std::process::Stdio;
use tokio::{
  io::BufReader as TokioBufReader,
  io::{AsyncBufReadExt, AsyncWriteExt},
  process::{Child as TokioChild, Command},
  sync::mpsc,
  task::JoinHandle,
};
use tracing::{debug, info};

use crate::constants::constants;
use crate::record::MediaRecord;

// --- Playback rates ---

pub const NORMAL_RATE: f64 = 1.0;

/// Next faster rate from the fixed set; stays at the top.
pub fn next_rate(current: f64) -> f64 {
  let rates = &constants().playback_rates;
  let top = rates.last().copied().unwrap_or(current);
  rates.iter().copied().find(|r| *r > current + f64::EPSILON).unwrap_or(top)
}

/// Next slower rate from the fixed set; stays at the bottom.
pub fn previous_rate(current: f64) -> f64 {
  let rates = &constants().playback_rates;
  let bottom = rates.first().copied().unwrap_or(current);
  rates.iter().rev().copied().find(|r| *r < current - f64::EPSILON).unwrap_or(bottom)
}

/// `1.25` → `1.25x`, `2.0` → `2x`.
pub fn rate_label(rate: f64) -> String {
  format!("{}x", rate)
}

// --- Player ---

/// Per-playback settings applied when mpv starts.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackOptions {
  pub rate: f64,
  pub subtitle_url: Option<String>,
  pub fullscreen: bool,
}

impl Default for PlaybackOptions {
  fn default() -> Self {
    Self { rate: NORMAL_RATE, subtitle_url: None, fullscreen: false }
  }
}

/// mpv command line for `record`; the URL goes last, after `--`.
pub fn mpv_args(record: &MediaRecord, options: &PlaybackOptions, ipc_socket: &str) -> Vec<String> {
  let mut args = vec![
    "--force-window=immediate".to_string(),
    "--term-status-msg=Time: ${time-pos/full} / ${duration/full} | ${pause} ${percent-pos}%".to_string(),
    format!("--input-ipc-server={}", ipc_socket),
    format!("--force-media-title={}", record.title),
    format!("--speed={}", options.rate),
  ];
  if let Some(sub) = &options.subtitle_url {
    args.push(format!("--sub-file={}", sub));
  }
  if options.fullscreen {
    args.push("--fs".to_string());
  }
  args.push("--".to_string());
  args.push(record.url.clone());
  args
}

pub struct VideoPlayer {
  pub(crate) current_process: Option<TokioChild>,
  mpv_monitor_handle: Option<JoinHandle<()>>,
  mpv_status_rx: Option<mpsc::Receiver<String>>,
  last_mpv_status: Option<String>,
  ipc_socket_path: Option<String>,
  pub paused: bool,
}

impl VideoPlayer {
  pub fn new() -> Self {
    Self {
      current_process: None,
      mpv_monitor_handle: None,
      mpv_status_rx: None,
      last_mpv_status: None,
      ipc_socket_path: None,
      paused: false,
    }
  }

  pub fn is_playing(&self) -> bool {
    self.current_process.is_some()
  }

  pub fn check_mpv_status(&mut self) {
    if let Some(rx) = &mut self.mpv_status_rx {
      while let Ok(status) = rx.try_recv() {
        self.last_mpv_status = Some(status);
      }
    }
  }

  pub fn get_last_mpv_status(&self) -> Option<String> {
    self.last_mpv_status.clone()
  }

  /// Returns `true` if mpv exited on its own (window closed, end of file, unplayable source).
  pub async fn reap_if_exited(&mut self) -> bool {
    let exited = match self.current_process.as_mut().map(|child| child.try_wait()) {
      Some(Ok(Some(status))) => {
        info!(status = %status, "player: mpv exited");
        true
      }
      Some(Err(e)) => {
        debug!(err = %e, "player: failed to poll mpv");
        false
      }
      _ => false,
    };
    if exited {
      self.current_process = None;
      let _ = self.stop().await;
    }
    exited
  }

  pub async fn play(&mut self, record: &MediaRecord, options: &PlaybackOptions) -> Result<()> {
    self.stop().await.context("Failed to stop previous playback")?;
    self.paused = false;

    let socket_path = std::env::temp_dir().join(format!("cloudreel-mpv-{}.sock", std::process::id()));
    let socket_path_str = socket_path.to_str().context("Temp dir path is not valid UTF-8")?.to_string();
    // Remove stale socket if it exists from a previous crash.
    let _ = std::fs::remove_file(&socket_path);

    let mut cmd = Command::new("mpv");
    cmd.args(mpv_args(record, options, &socket_path_str));
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    // Send stderr to null; if piped but never drained, the pipe buffer
    // fills and mpv blocks.
    cmd.stderr(Stdio::null());

    let mut child = cmd.spawn().map_err(|e| {
      if e.kind() == std::io::ErrorKind::NotFound {
        anyhow!("mpv not found. Install it with: brew install mpv (macOS) or apt install mpv (Linux)")
      } else {
        anyhow!(e).context("Failed to spawn mpv process")
      }
    })?;

    let stdout = child.stdout.take().context("Failed to get mpv stdout")?;
    let (tx, rx) = mpsc::channel::<String>(10);
    self.mpv_status_rx = Some(rx);

    let monitor_handle = tokio::spawn(async move {
      let reader = TokioBufReader::new(stdout);
      let mut lines = reader.lines();
      while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).await.is_err() {
          break;
        }
      }
    });

    info!(url = %record.url, rate = options.rate, fullscreen = options.fullscreen, "player: mpv started");
    self.current_process = Some(child);
    self.mpv_monitor_handle = Some(monitor_handle);
    self.ipc_socket_path = Some(socket_path_str);
    Ok(())
  }

  /// Send one JSON IPC command. No-op when nothing is playing.
  async fn send_command(&self, command: Value) -> Result<()> {
    let Some(ref socket_path) = self.ipc_socket_path else {
      return Ok(());
    };
    let mut stream =
      tokio::net::UnixStream::connect(socket_path).await.context("Failed to connect to mpv IPC socket")?;
    let mut payload = serde_json::to_vec(&json!({ "command": command })).context("Failed to encode mpv command")?;
    payload.push(b'\n');
    stream.write_all(&payload).await.context("Failed to send command to mpv")?;
    debug!(command = %command, "player: ipc command sent");
    Ok(())
  }

  pub async fn toggle_pause(&mut self) -> Result<()> {
    if !self.is_playing() {
      return Ok(());
    }
    self.send_command(json!(["cycle", "pause"])).await?;
    self.paused = !self.paused;
    Ok(())
  }

  pub async fn set_speed(&self, rate: f64) -> Result<()> {
    self.send_command(json!(["set_property", "speed", rate])).await
  }

  pub async fn toggle_fullscreen(&self) -> Result<()> {
    self.send_command(json!(["cycle", "fullscreen"])).await
  }

  /// Attach and select an external subtitle track on the running player.
  pub async fn add_subtitle(&self, url: &str) -> Result<()> {
    self.send_command(json!(["sub-add", url, "select"])).await
  }

  pub async fn stop(&mut self) -> Result<()> {
    if let Some(handle) = self.mpv_monitor_handle.take() {
      handle.abort();
      let _ = handle.await;
    }
    self.mpv_status_rx = None;
    self.last_mpv_status = None;

    if let Some(mut child) = self.current_process.take() {
      child.kill().await.context("Failed to kill mpv process")?;
      let _ = child.wait().await;
    }

    self.paused = false;

    if let Some(path) = self.ipc_socket_path.take() {
      let _ = std::fs::remove_file(&path);
    }
    Ok(())
  }
}
