//! Best-effort movie metadata from TMDB.
//!
//! Nothing here is allowed to block adding a video: every failure path
//! (no key, transport error, non-2xx, malformed body, no match) ends in `None`.

use anyhow::{Context, Result, anyhow};
use image::DynamicImage;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::constants::constants;

/// Metadata for the first search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieMeta {
  pub title: String,
  /// Absolute image URL.
  pub poster: Option<String>,
  pub tmdb_id: Option<u64>,
  pub release_date: Option<String>,
  pub overview: Option<String>,
}

/// Results stay untyped so a malformed later hit can't sink the first one.
#[derive(Debug, Deserialize)]
struct SearchResponse {
  #[serde(default)]
  results: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
  #[serde(default)]
  id: Option<u64>,
  title: Option<String>,
  poster_path: Option<String>,
  release_date: Option<String>,
  overview: Option<String>,
}

fn non_blank(s: Option<String>) -> Option<String> {
  s.filter(|s| !s.trim().is_empty())
}

pub struct TmdbClient {
  http: Client,
  api_base: String,
  image_base: String,
}

impl TmdbClient {
  pub fn new(http: Client) -> Self {
    let c = constants();
    Self::with_endpoints(http, &c.tmdb_api_base, &c.tmdb_image_base)
  }

  pub fn with_endpoints(http: Client, api_base: &str, image_base: &str) -> Self {
    Self {
      http,
      api_base: api_base.trim_end_matches('/').to_string(),
      image_base: image_base.trim_end_matches('/').to_string(),
    }
  }

  pub fn http(&self) -> &Client {
    &self.http
  }

  /// Look up `title`. Returns `None` without touching the network when no key is configured.
  pub async fn lookup(&self, title: &str, api_key: Option<&str>) -> Option<MovieMeta> {
    let api_key = api_key.map(str::trim).filter(|k| !k.is_empty())?;
    if title.trim().is_empty() {
      return None;
    }
    match self.search(title, api_key).await {
      Ok(meta) => meta,
      Err(e) => {
        warn!(title, err = %format!("{:#}", e), "tmdb: lookup failed");
        None
      }
    }
  }

  async fn search(&self, title: &str, api_key: &str) -> Result<Option<MovieMeta>> {
    let url = self.search_url(title, api_key);
    // `without_url` keeps the API key out of error messages and logs.
    let response = self.http.get(&url).send().await.map_err(|e| e.without_url()).context("TMDB request failed")?;

    let status = response.status();
    if !status.is_success() {
      debug!(title, status = %status, "tmdb: non-success status");
      return Ok(None);
    }

    let body: SearchResponse =
      response.json().await.map_err(|e| e.without_url()).context("Malformed TMDB search response")?;
    let meta = self.first_match(body, title);
    debug!(title, matched = meta.is_some(), "tmdb: search done");
    Ok(meta)
  }

  fn search_url(&self, title: &str, api_key: &str) -> String {
    format!(
      "{}/search/movie?api_key={}&query={}",
      self.api_base,
      urlencoding::encode(api_key),
      urlencoding::encode(title)
    )
  }

  fn first_match(&self, body: SearchResponse, query: &str) -> Option<MovieMeta> {
    let first = body.results.into_iter().next()?;
    let first: SearchItem = match serde_json::from_value(first) {
      Ok(item) => item,
      Err(e) => {
        debug!(err = %e, "tmdb: first result is malformed");
        return None;
      }
    };
    Some(MovieMeta {
      title: non_blank(first.title).unwrap_or_else(|| query.to_string()),
      poster: non_blank(first.poster_path).map(|path| format!("{}{}", self.image_base, path)),
      tmdb_id: first.id,
      release_date: non_blank(first.release_date),
      overview: first.overview,
    })
  }
}

/// Download and decode a poster image.
pub async fn fetch_poster(client: &Client, url: &str) -> Result<DynamicImage> {
  let response = client.get(url).send().await.with_context(|| format!("Failed to fetch poster {}", url))?;
  if !response.status().is_success() {
    return Err(anyhow!("Poster request returned {} for {}", response.status(), url));
  }
  let bytes = response.bytes().await.with_context(|| format!("Failed to read poster bytes from {}", url))?;
  image::load_from_memory(&bytes).with_context(|| format!("Failed to decode poster image (URL: {})", url))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tokio::io::{AsyncReadExt, AsyncWriteExt};
  use tokio::net::TcpListener;
  use tokio::sync::oneshot;

  fn test_http() -> Client {
    Client::builder().no_proxy().build().unwrap()
  }

  fn client_for(base: &str) -> TmdbClient {
    TmdbClient::with_endpoints(test_http(), base, "https://image.tmdb.org/t/p/w500")
  }

  /// Serve exactly one canned HTTP response; yields the request head.
  async fn serve_once(status: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      if let Ok((mut socket, _)) = listener.accept().await {
        let mut buf = vec![0u8; 8192];
        let n = socket.read(&mut buf).await.unwrap_or(0);
        let _ = tx.send(String::from_utf8_lossy(&buf[..n]).into_owned());
        let response = format!(
          "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
          status,
          body.len(),
          body
        );
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
      }
    });
    (format!("http://{}", addr), rx)
  }

  fn parse(body: &str) -> SearchResponse {
    serde_json::from_str(body).unwrap()
  }

  // --- response mapping ---

  #[test]
  fn first_result_only() {
    let client = client_for("http://unused");
    let body = parse(
      r#"{"results":[
        {"id":27205,"title":"Inception","poster_path":"/p.jpg","release_date":"2010-07-15","overview":"Dreams."},
        {"id":1,"title":"Other"}
      ]}"#,
    );
    let meta = client.first_match(body, "Inception 2010").unwrap();
    assert_eq!(meta.title, "Inception");
    assert_eq!(meta.poster.as_deref(), Some("https://image.tmdb.org/t/p/w500/p.jpg"));
    assert_eq!(meta.tmdb_id, Some(27205));
    assert_eq!(meta.release_date.as_deref(), Some("2010-07-15"));
    assert_eq!(meta.overview.as_deref(), Some("Dreams."));
  }

  #[test]
  fn missing_title_and_poster_fall_back() {
    let client = client_for("http://unused");
    let meta = client.first_match(parse(r#"{"results":[{"id":3,"title":"","poster_path":null}]}"#), "Query").unwrap();
    assert_eq!(meta.title, "Query");
    assert_eq!(meta.poster, None);
  }

  #[test]
  fn malformed_later_results_are_ignored() {
    let client = client_for("http://unused");
    let body = parse(r#"{"results":[{"id":1,"title":"Good","poster_path":"/g.jpg"},{"title":"no id"},{"id":null}]}"#);
    let meta = client.first_match(body, "q").unwrap();
    assert_eq!(meta.title, "Good");
    assert_eq!(meta.tmdb_id, Some(1));
    assert_eq!(meta.poster.as_deref(), Some("https://image.tmdb.org/t/p/w500/g.jpg"));
  }

  #[test]
  fn first_result_without_id_still_matches() {
    let client = client_for("http://unused");
    let meta = client.first_match(parse(r#"{"results":[{"title":"Heat"}]}"#), "q").unwrap();
    assert_eq!(meta.title, "Heat");
    assert_eq!(meta.tmdb_id, None);
  }

  #[test]
  fn malformed_first_result_is_none() {
    let client = client_for("http://unused");
    assert!(client.first_match(parse(r#"{"results":[{"id":"x","title":5}]}"#), "q").is_none());
  }

  #[test]
  fn empty_or_absent_results_is_none() {
    let client = client_for("http://unused");
    assert!(client.first_match(parse(r#"{"results":[]}"#), "q").is_none());
    assert!(client.first_match(parse(r#"{"page":1}"#), "q").is_none());
  }

  #[test]
  fn search_url_encodes_query() {
    let client = client_for("https://api.themoviedb.org/3/");
    assert_eq!(
      client.search_url("Amélie & Co", "k"),
      "https://api.themoviedb.org/3/search/movie?api_key=k&query=Am%C3%A9lie%20%26%20Co"
    );
  }

  // --- lookup ---

  #[tokio::test]
  async fn no_key_means_no_request() {
    // Port 9 (discard) is never contacted; the key check comes first.
    let client = client_for("http://127.0.0.1:9");
    assert_eq!(client.lookup("Inception", None).await, None);
    assert_eq!(client.lookup("Inception", Some("  ")).await, None);
  }

  #[tokio::test]
  async fn blank_title_is_none() {
    let client = client_for("http://127.0.0.1:9");
    assert_eq!(client.lookup("  ", Some("key")).await, None);
  }

  #[tokio::test]
  async fn successful_lookup() {
    let body = r#"{"results":[{"id":603,"title":"The Matrix","poster_path":"/m.jpg"}]}"#;
    let (base, request) = serve_once("200 OK", body).await;
    let client = client_for(&base);
    let meta = client.lookup("The Matrix 1999", Some("secret")).await.unwrap();
    assert_eq!(meta.title, "The Matrix");
    assert_eq!(meta.tmdb_id, Some(603));
    assert_eq!(meta.poster.as_deref(), Some("https://image.tmdb.org/t/p/w500/m.jpg"));

    let head = request.await.unwrap();
    assert!(head.starts_with("GET /search/movie?api_key=secret&query=The%20Matrix%201999 "), "{}", head);
  }

  #[tokio::test]
  async fn lookup_survives_malformed_second_result() {
    let body = r#"{"results":[{"id":1,"title":"Good","poster_path":"/g.jpg"},{"title":"no id"}]}"#;
    let (base, _request) = serve_once("200 OK", body).await;
    let meta = client_for(&base).lookup("Good", Some("key")).await.unwrap();
    assert_eq!(meta.title, "Good");
    assert_eq!(meta.poster.as_deref(), Some("https://image.tmdb.org/t/p/w500/g.jpg"));
  }

  #[tokio::test]
  async fn non_success_status_is_none() {
    let (base, _request) = serve_once("401 Unauthorized", r#"{"status_message":"Invalid API key"}"#).await;
    assert_eq!(client_for(&base).lookup("Inception", Some("bad")).await, None);
  }

  #[tokio::test]
  async fn malformed_body_is_none() {
    let (base, _request) = serve_once("200 OK", "<html>oops</html>").await;
    assert_eq!(client_for(&base).lookup("Inception", Some("key")).await, None);
  }

  #[tokio::test]
  async fn unreachable_host_is_none() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    assert_eq!(client_for(&format!("http://{}", addr)).lookup("Inception", Some("key")).await, None);
  }
}
