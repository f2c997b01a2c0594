//! Capability traits for everything the pipeline borrows from its host:
//! HTTP transport, the note file store, clipboard text, user prompts, and
//! the notice/log side channel. Core code only sees these traits; the
//! concrete implementations here are the process defaults wired up in main.

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// URL after redirect following.
    pub final_url: String,
    pub body: String,
    pub last_modified: Option<String>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Uniform transport surface. A non-2xx response is returned as `Ok` so
/// callers can classify it; `Err` means the request never completed.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, HttpError>;
    async fn head(&self, url: &str, timeout: Duration) -> Result<HttpResponse, HttpError>;
}

pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    fn map_err(e: reqwest::Error) -> HttpError {
        if e.is_timeout() {
            HttpError::Timeout
        } else {
            HttpError::Transport(e.to_string())
        }
    }

    fn last_modified(response: &reqwest::Response) -> Option<String> {
        response
            .headers()
            .get(reqwest::header::LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, HttpError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(Self::map_err)?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let last_modified = Self::last_modified(&response);
        let body = response.text().await.map_err(Self::map_err)?;

        Ok(HttpResponse {
            status,
            final_url,
            body,
            last_modified,
        })
    }

    async fn head(&self, url: &str, timeout: Duration) -> Result<HttpResponse, HttpError> {
        let response = self
            .client
            .head(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(Self::map_err)?;

        Ok(HttpResponse {
            status: response.status().as_u16(),
            final_url: response.url().to_string(),
            body: String::new(),
            last_modified: Self::last_modified(&response),
        })
    }
}

/// Hierarchical note storage. All operations are asynchronous and
/// fallible; existence-check-then-create is the only discipline, a race
/// between two writers of the same path is out of scope.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn exists(&self, path: &str) -> bool;
    async fn create_folder(&self, path: &str) -> Result<()>;
    async fn create(&self, path: &str, content: &str) -> Result<()>;
    async fn delete(&self, path: &str) -> Result<()>;
}

/// File store rooted at a directory on the local filesystem.
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn exists(&self, path: &str) -> bool {
        tokio::fs::try_exists(self.full_path(path))
            .await
            .unwrap_or(false)
    }

    async fn create_folder(&self, path: &str) -> Result<()> {
        tokio::fs::create_dir_all(self.full_path(path)).await?;
        Ok(())
    }

    async fn create(&self, path: &str, content: &str) -> Result<()> {
        let full = self.full_path(path);
        if let Some(parent) = full.parent() {
            if !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(full, content).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        tokio::fs::remove_file(self.full_path(path)).await?;
        Ok(())
    }
}

/// Source of the pasted text the URL scan runs over.
#[async_trait]
pub trait ClipboardSource: Send + Sync {
    async fn read_text(&self) -> Result<String>;
}

/// Reads piped text from stdin to end-of-input.
pub struct StdinClipboard;

#[async_trait]
impl ClipboardSource for StdinClipboard {
    async fn read_text(&self) -> Result<String> {
        let mut text = String::new();
        tokio::io::stdin().read_to_string(&mut text).await?;
        Ok(text)
    }
}

/// Fire-and-forget notice/log side channel. Core logic never depends on
/// these succeeding.
pub trait Diagnostics: Send + Sync {
    fn notify(&self, text: &str);
    fn log(&self, text: &str);
}

pub struct ConsoleDiagnostics;

impl Diagnostics for ConsoleDiagnostics {
    fn notify(&self, text: &str) {
        println!("{}", text);
    }

    fn log(&self, text: &str) {
        tracing::info!("{}", text);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateChoice {
    Replace,
    Duplicate,
    Skip,
}

/// Interactive duplicate-resolution prompt. Awaiting it suspends the
/// calling item until the user answers; batch mode never invokes it.
#[async_trait]
pub trait DuplicatePrompt: Send + Sync {
    async fn ask(&self, file_name: &str) -> Result<DuplicateChoice>;
}

/// Multi-URL selection prompt. Must re-prompt on an empty selection
/// rather than proceed with zero items.
#[async_trait]
pub trait UrlPicker: Send + Sync {
    async fn pick(&self, urls: &[String]) -> Result<Vec<String>>;
}

pub trait ProgressSink: Send + Sync {
    fn update(&self, current: usize, total: usize, status: &str);
}

async fn read_line() -> Result<String> {
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(line.trim().to_string())
}

/// Yes/no terminal prompt, defaulting to no.
pub async fn confirm(question: &str) -> Result<bool> {
    println!("{} [y/N]", question);
    let answer = read_line().await?;
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
}

pub struct TerminalPrompt;

#[async_trait]
impl DuplicatePrompt for TerminalPrompt {
    async fn ask(&self, file_name: &str) -> Result<DuplicateChoice> {
        loop {
            println!(
                "A note named \"{}\" already exists. [r]eplace, [d]uplicate, or [s]kip?",
                file_name
            );
            match read_line().await?.to_lowercase().as_str() {
                "r" | "replace" => return Ok(DuplicateChoice::Replace),
                "d" | "duplicate" => return Ok(DuplicateChoice::Duplicate),
                "s" | "skip" => return Ok(DuplicateChoice::Skip),
                _ => continue,
            }
        }
    }
}

pub struct TerminalPicker;

#[async_trait]
impl UrlPicker for TerminalPicker {
    async fn pick(&self, urls: &[String]) -> Result<Vec<String>> {
        loop {
            println!("Found {} TikTok URLs:", urls.len());
            for (i, url) in urls.iter().enumerate() {
                println!("  {}: {}", i + 1, url);
            }
            println!("Select URLs to process (comma-separated numbers, or 'all'):");

            let input = read_line().await?;
            if input.eq_ignore_ascii_case("all") {
                return Ok(urls.to_vec());
            }

            let selected: Vec<String> = input
                .split(',')
                .filter_map(|part| part.trim().parse::<usize>().ok())
                .filter_map(|n| n.checked_sub(1).and_then(|i| urls.get(i)))
                .cloned()
                .collect();

            if !selected.is_empty() {
                return Ok(selected);
            }
            println!("Nothing selected.");
        }
    }
}

pub struct TerminalProgress;

impl ProgressSink for TerminalProgress {
    fn update(&self, current: usize, total: usize, status: &str) {
        println!("[{}/{}] {}", current, total, status);
    }
}
