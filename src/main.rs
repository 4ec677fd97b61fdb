mod app;
mod config;
mod constants;
mod credential;
mod display;
mod graphics;
mod history;
mod input;
mod player;
mod record;
mod storage;
mod submit;
mod theme;
mod title;
mod tmdb;
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use app::App;
use config::Config;
use credential::CredentialStore;
use display::CliDisplayMode;
use history::HistoryStore;
use storage::{FileStore, SharedStore};
use title::{TitleNormalizer, normalize_title};

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Video URL to add and play right away
  url: Option<String>,

  /// Poster display mode: 'auto', 'direct', 'ascii', or 'off' (default: prefs.toml, then auto-detect)
  #[arg(short, long)]
  display_mode: Option<CliDisplayMode>,

  /// Store a TMDB API key before starting
  #[arg(long, value_name = "KEY")]
  tmdb_key: Option<String>,

  /// Directory for history, credentials and logs
  #[arg(long, value_name = "DIR")]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print the title guessed from each URL
  Title {
    #[arg(required = true)]
    urls: Vec<String>,
  },
  /// List recently added movies, newest first
  Recent {
    /// Print the stored records as JSON
    #[arg(long)]
    json: bool,
    /// Forget all recent movies
    #[arg(long, conflicts_with = "json")]
    clear: bool,
  },
}

// --- Setup ---

fn resolve_data_dir(arg: Option<PathBuf>) -> Result<PathBuf> {
  match arg {
    Some(dir) => Ok(dir),
    None => config::data_dir().context("Could not determine a data directory; pass --data-dir"),
  }
}

/// Route `tracing` output to `<data_dir>/cloudreel.log`; the terminal belongs to the TUI.
fn init_logging(data_dir: &Path) -> Result<WorkerGuard> {
  std::fs::create_dir_all(data_dir).with_context(|| format!("Failed to create {}", data_dir.display()))?;
  let appender = tracing_appender::rolling::never(data_dir, "cloudreel.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(writer).with_ansi(false)).init();
  Ok(guard)
}

// --- Subcommands ---

fn print_titles(config: &Config, urls: &[String]) -> Result<()> {
  if config.extra_release_tags.is_empty() {
    urls.iter().for_each(|url| println!("{}", normalize_title(url.trim())));
    return Ok(());
  }
  let normalizer = TitleNormalizer::with_extra_tags(&config.extra_release_tags)?;
  urls.iter().for_each(|url| println!("{}", normalizer.normalize(url.trim())));
  Ok(())
}

fn recent_command(store: SharedStore, json: bool, clear: bool) -> Result<()> {
  let history = HistoryStore::new(store);
  if clear {
    history.save(&history.clear());
    println!("Recent movies cleared.");
    return Ok(());
  }

  let items = history.load();
  if json {
    println!("{}", serde_json::to_string_pretty(&items).context("Failed to encode history")?);
    return Ok(());
  }
  if items.is_empty() {
    println!("No movies yet.");
  }
  for (i, record) in items.iter().enumerate() {
    println!("{:>2}. {}\n    {}", i + 1, record.title, record.url);
  }
  Ok(())
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  let data_dir = resolve_data_dir(args.data_dir.clone())?;
  let _log_guard = init_logging(&data_dir)?;
  let config = Config::load();
  let file_store = FileStore::new(data_dir.join("store"));
  info!(store = %file_store.dir().display(), "cloudreel starting");
  let store: SharedStore = Arc::new(file_store);

  if let Some(key) = &args.tmdb_key {
    CredentialStore::new(Arc::clone(&store)).save(key.trim());
  }

  match args.command {
    Some(Command::Title { ref urls }) => return print_titles(&config, urls),
    Some(Command::Recent { json, clear }) => return recent_command(store, json, clear),
    None => {}
  }

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  let result = run(&mut terminal, args, config, store).await;
  ratatui::restore();
  result
}

async fn run(terminal: &mut DefaultTerminal, args: Args, config: Config, store: SharedStore) -> Result<()> {
  let cli_mode = args
    .display_mode
    .unwrap_or_else(|| config.display_mode.as_deref().map_or(CliDisplayMode::Auto, display::from_config));
  let display_mode = display::resolve_display_mode(cli_mode);
  let http = reqwest::Client::builder()
    .user_agent(concat!("cloudreel/", env!("CARGO_PKG_VERSION")))
    .build()
    .context("Failed to build HTTP client")?;
  let mut app = App::new(display_mode, store, config, http)?;

  if let Some(url) = &args.url {
    app.url_field.set(url);
    app.trigger_submit();
  }

  loop {
    app.check_pending().await?;
    app.expire_error();

    terminal.draw(|frame| ui::ui(frame, &mut app))?;

    if event::poll(Duration::from_millis(100))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
          input::handle_key_event(&mut app, key).await?;
        }
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  app.player.stop().await?;
  info!("cloudreel exiting");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::record::MediaRecord;
  use crate::storage::MemoryStore;

  #[test]
  fn parses_tui_invocation() {
    let args =
      Args::try_parse_from(["cloudreel", "https://x/a.mp4", "--display-mode", "off", "--tmdb-key", "k"]).unwrap();
    assert_eq!(args.url.as_deref(), Some("https://x/a.mp4"));
    assert_eq!(args.display_mode, Some(CliDisplayMode::Off));
    assert_eq!(args.tmdb_key.as_deref(), Some("k"));
    assert!(args.command.is_none());
  }

  #[test]
  fn parses_subcommands() {
    let args = Args::try_parse_from(["cloudreel", "title", "a.mp4", "b.mkv"]).unwrap();
    assert!(matches!(args.command, Some(Command::Title { ref urls }) if urls.len() == 2));

    let args = Args::try_parse_from(["cloudreel", "recent", "--json"]).unwrap();
    assert!(matches!(args.command, Some(Command::Recent { json: true, clear: false })));

    assert!(Args::try_parse_from(["cloudreel", "recent", "--json", "--clear"]).is_err());
    assert!(Args::try_parse_from(["cloudreel", "title"]).is_err());
  }

  #[test]
  fn recent_clear_empties_store() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let history = HistoryStore::new(Arc::clone(&store));
    history.save(&[MediaRecord::new("u", "t")]);
    recent_command(Arc::clone(&store), false, true).unwrap();
    assert!(history.load().is_empty());
  }
}
