//! In-process fakes for the fetcher and rendering engine, so the
//! orchestrators can be driven without network or browser.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sunoloader::extractor::Identifier;
use sunoloader::fetcher::PageFetcher;
use sunoloader::render::{EnginePage, EngineSession, NavigationStrategy, RenderEngine};
use sunoloader::utils::error::{Result, SunoloaderError};
use sunoloader::utils::ExtractorSettings;

pub const PLAYLIST_ID: &str = "11111111-2222-4333-8444-555555555555";

/// Deterministic identifier for test item `n`
pub fn song_id(n: usize) -> Identifier {
    Identifier::parse(&format!("{:08x}-0000-4000-8000-{:012x}", n, n)).expect("valid test id")
}

/// Settings with short waits so tests do not sit in scroll or readiness loops
pub fn test_settings() -> Arc<ExtractorSettings> {
    let mut settings = ExtractorSettings::default();
    settings.scroll_ceiling_ms = 200;
    settings.scroll_step_delay_ms = 1;
    settings.readiness_timeout_ms = 50;
    settings.navigation_timeout_ms = 2_000;
    settings.fetch_timeout_ms = 500;
    settings.max_concurrent = 4;
    settings.stream_buffer = 4;
    Arc::new(settings)
}

/// A song page both tiers can read
pub fn song_page(title: &str, artist: &str) -> String {
    format!(
        r#"<html><head>
        <meta property="og:title" content="{title} | Suno">
        <meta property="og:description" content="A song by @{artist}">
        <meta property="og:image" content="https://cdn2.suno.ai/image_large_{artist}.jpeg">
        </head><body>
        <h1>{title}</h1>
        <a href="/@{artist}">@{artist}</a>
        </body></html>"#
    )
}

// ------------------------------------------------------------
// Fetcher
// ------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Canned {
    Html(String),
    Status(u16),
    Timeout,
}

#[derive(Default)]
pub struct FakeFetcher {
    responses: HashMap<String, Canned>,
    pub calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, response: Canned) -> Self {
        self.responses.insert(url.into(), response);
        self
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.get(url) {
            Some(Canned::Html(html)) => Ok(html.clone()),
            Some(Canned::Status(status)) => Err(SunoloaderError::HttpError {
                status: *status,
                url: url.to_string(),
            }),
            Some(Canned::Timeout) => Err(SunoloaderError::FetchTimeout {
                url: url.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
            None => Err(SunoloaderError::HttpError {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

// ------------------------------------------------------------
// Rendering engine
// ------------------------------------------------------------

/// Resource counters shared by every session and page of a `FakeEngine`
#[derive(Default)]
pub struct Counters {
    pub launches: AtomicUsize,
    pub sessions_closed: AtomicUsize,
    pub pages_opened: AtomicUsize,
    pub pages_closed: AtomicUsize,
    pub navigations: AtomicUsize,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct Behaviour {
    pages: HashMap<String, String>,
    failing: HashSet<String>,
    crash_on: Option<String>,
    crash_after_load: Option<String>,
    hang_on: Option<String>,
    launch_fails: bool,
}

pub struct FakeEngine {
    behaviour: Arc<Behaviour>,
    pub counters: Arc<Counters>,
}

impl FakeEngine {
    pub fn builder() -> FakeEngineBuilder {
        FakeEngineBuilder::default()
    }
}

#[derive(Default)]
pub struct FakeEngineBuilder {
    behaviour: Behaviour,
}

impl FakeEngineBuilder {
    /// Serve `html` when `url` is navigated to
    pub fn page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.behaviour.pages.insert(url.into(), html.into());
        self
    }

    /// Navigation to `url` fails with a page-level error
    pub fn failing(mut self, url: impl Into<String>) -> Self {
        self.behaviour.failing.insert(url.into());
        self
    }

    /// Navigation to `url` kills the whole session
    pub fn crash_on(mut self, url: impl Into<String>) -> Self {
        self.behaviour.crash_on = Some(url.into());
        self
    }

    /// Navigation to `url` succeeds, then the browser dies before the DOM
    /// is read
    pub fn crash_after_load(mut self, url: impl Into<String>) -> Self {
        self.behaviour.crash_after_load = Some(url.into());
        self
    }

    /// Navigation to `url` never finishes
    pub fn hang_on(mut self, url: impl Into<String>) -> Self {
        self.behaviour.hang_on = Some(url.into());
        self
    }

    pub fn launch_fails(mut self) -> Self {
        self.behaviour.launch_fails = true;
        self
    }

    pub fn build(self) -> FakeEngine {
        FakeEngine {
            behaviour: Arc::new(self.behaviour),
            counters: Arc::new(Counters::default()),
        }
    }
}

#[async_trait]
impl RenderEngine for FakeEngine {
    fn id(&self) -> &'static str {
        "fake"
    }

    async fn launch(&self) -> Result<Box<dyn EngineSession>> {
        if self.behaviour.launch_fails {
            return Err(SunoloaderError::BrowserLaunch("no display".into()));
        }
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            behaviour: Arc::clone(&self.behaviour),
            counters: Arc::clone(&self.counters),
            crashed: Arc::new(AtomicBool::new(false)),
            closed: false,
        }))
    }
}

struct FakeSession {
    behaviour: Arc<Behaviour>,
    counters: Arc<Counters>,
    crashed: Arc<AtomicBool>,
    closed: bool,
}

#[async_trait]
impl EngineSession for FakeSession {
    async fn new_page(&self) -> Result<Box<dyn EnginePage>> {
        if self.crashed.load(Ordering::SeqCst) {
            return Err(SunoloaderError::SessionLost("browser crashed".into()));
        }
        self.counters.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            behaviour: Arc::clone(&self.behaviour),
            counters: Arc::clone(&self.counters),
            crashed: Arc::clone(&self.crashed),
            url: Mutex::new(None),
            closed: false,
        }))
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.counters.sessions_closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

struct FakePage {
    behaviour: Arc<Behaviour>,
    counters: Arc<Counters>,
    crashed: Arc<AtomicBool>,
    url: Mutex<Option<String>>,
    closed: bool,
}

impl FakePage {
    fn current_url(&self) -> Option<String> {
        self.url.lock().ok().and_then(|u| u.clone())
    }

    /// Every page op fails once the browser is gone, as with a real
    /// dropped DevTools connection
    fn ensure_alive(&self) -> Result<()> {
        if self.crashed.load(Ordering::SeqCst) {
            return Err(SunoloaderError::SessionLost("browser connection closed".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl EnginePage for FakePage {
    async fn set_user_agent(&self, _user_agent: &str) -> Result<()> {
        Ok(())
    }

    async fn navigate(&self, url: &str, _strategy: NavigationStrategy, _budget: Duration) -> Result<()> {
        self.counters.navigations.fetch_add(1, Ordering::SeqCst);
        if self.behaviour.crash_on.as_deref() == Some(url) {
            self.crashed.store(true, Ordering::SeqCst);
            return Err(SunoloaderError::SessionLost("browser crashed".into()));
        }
        self.ensure_alive()?;
        if self.behaviour.hang_on.as_deref() == Some(url) {
            std::future::pending::<()>().await;
        }
        if self.behaviour.failing.contains(url) {
            return Err(SunoloaderError::Render(format!("net::ERR_FAILED at {}", url)));
        }
        if let Ok(mut current) = self.url.lock() {
            *current = Some(url.to_string());
        }
        if self.behaviour.crash_after_load.as_deref() == Some(url) {
            self.crashed.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn evaluate(&self, _script: &str) -> Result<Value> {
        self.ensure_alive()?;
        // only the playlist scroll loop evaluates; report a fully scrolled page
        Ok(json!({ "position": 1000, "extent": 1000 }))
    }

    async fn wait_for_selector(&self, _selector: &str, _timeout: Duration) -> Result<bool> {
        Ok(true)
    }

    async fn content(&self) -> Result<String> {
        self.ensure_alive()?;
        Ok(self
            .current_url()
            .and_then(|url| self.behaviour.pages.get(&url).cloned())
            .unwrap_or_else(|| "<html><body></body></html>".to_string()))
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.counters.pages_closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
