//! Chromium engine over the DevTools protocol (chromiumoxide)

use crate::render::{EnginePage, EngineSession, NavigationStrategy, RenderEngine};
use crate::utils::config::ExtractorSettings;
use crate::utils::error::{Result, SunoloaderError};
use crate::utils::platform;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Launches a local Chromium per session
pub struct ChromiumEngine {
    settings: Arc<ExtractorSettings>,
}

impl ChromiumEngine {
    pub fn new(settings: Arc<ExtractorSettings>) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl RenderEngine for ChromiumEngine {
    fn id(&self) -> &'static str {
        "chromium"
    }

    async fn launch(&self) -> Result<Box<dyn EngineSession>> {
        let executable = platform::find_browser(self.settings.browser_executable.as_deref())
            .ok_or(SunoloaderError::BrowserNotFound)?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(executable)
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-dev-shm-usage")
            .arg("--mute-audio");
        if !self.settings.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(SunoloaderError::BrowserLaunch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SunoloaderError::BrowserLaunch(e.to_string()))?;

        let closed = Arc::new(AtomicBool::new(false));
        let closed_flag = Arc::clone(&closed);
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("chromium handler event error: {}", e);
                }
            }
            closed_flag.store(true, Ordering::SeqCst);
            debug!("chromium handler loop ended");
        });

        info!("Chromium session started");
        Ok(Box::new(ChromiumSession {
            browser: Some(browser),
            handler_task,
            closed,
        }))
    }
}

struct ChromiumSession {
    browser: Option<Browser>,
    handler_task: JoinHandle<()>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl EngineSession for ChromiumSession {
    async fn new_page(&self) -> Result<Box<dyn EnginePage>> {
        let browser = match &self.browser {
            Some(b) if !self.closed.load(Ordering::SeqCst) => b,
            _ => return Err(SunoloaderError::SessionLost("browser connection closed".into())),
        };
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| SunoloaderError::SessionLost(e.to_string()))?;
        Ok(Box::new(ChromiumPage {
            page: Some(page),
            closed: Arc::clone(&self.closed),
        }))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!("Browser close failed: {}", e);
            }
            if let Err(e) = browser.wait().await {
                warn!("Waiting for browser exit failed: {}", e);
            }
        }
        self.handler_task.abort();
        Ok(())
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        // Browser's own Drop kills the child process
        self.handler_task.abort();
    }
}

struct ChromiumPage {
    page: Option<Page>,
    closed: Arc<AtomicBool>,
}

impl ChromiumPage {
    fn page(&self) -> Result<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| SunoloaderError::Render("page already closed".into()))
    }

    fn cdp_err(&self, e: CdpError) -> SunoloaderError {
        classify_cdp_error(e, self.closed.load(Ordering::SeqCst))
    }
}

/// Map a protocol error onto the crate's taxonomy.
///
/// Transport failures and a stopped handler loop mean the browser is gone
/// and surface as `SessionLost`; anything else is a per-page `Render` failure.
fn classify_cdp_error(e: CdpError, connection_closed: bool) -> SunoloaderError {
    let lost = connection_closed
        || matches!(
            e,
            CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse
        );
    if lost {
        SunoloaderError::SessionLost(e.to_string())
    } else {
        SunoloaderError::Render(e.to_string())
    }
}

#[async_trait]
impl EnginePage for ChromiumPage {
    async fn set_user_agent(&self, user_agent: &str) -> Result<()> {
        self.page()?
            .execute(SetUserAgentOverrideParams::new(user_agent))
            .await
            .map_err(|e| self.cdp_err(e))?;
        Ok(())
    }

    async fn navigate(&self, url: &str, strategy: NavigationStrategy, budget: Duration) -> Result<()> {
        let page = self.page()?;
        page.goto(url).await.map_err(|e| self.cdp_err(e))?;
        if strategy == NavigationStrategy::NetworkIdle {
            wait_for_network_idle(page, budget).await;
        }
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value> {
        let result = self.page()?.evaluate(script).await.map_err(|e| self.cdp_err(e))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool> {
        let page = self.page()?;
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if page.find_element(selector).await.is_ok() {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn content(&self) -> Result<String> {
        self.page()?.content().await.map_err(|e| self.cdp_err(e))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(page) = self.page.take() {
            page.close().await.map_err(|e| self.cdp_err(e))?;
        }
        Ok(())
    }
}

impl Drop for ChromiumPage {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    let _ = page.close().await;
                });
            }
        }
    }
}

/// Poll the resource timeline until it stops growing for a second
async fn wait_for_network_idle(page: &Page, budget: Duration) {
    let timeout_ms = budget.as_millis().min(u128::from(u64::MAX)) as u64;
    let js = format!(
        r#"(async () => {{
            const timeoutMs = {timeout_ms};
            const idleMs = 1000;
            const interval = 250;
            const start = Date.now();
            let lastCount = performance.getEntriesByType('resource').length;
            let stableMs = 0;
            while (Date.now() - start < timeoutMs) {{
                await new Promise(r => setTimeout(r, interval));
                const count = performance.getEntriesByType('resource').length;
                if (document.readyState === 'complete' && count === lastCount) {{
                    stableMs += interval;
                    if (stableMs >= idleMs) return {{ ok: true, waitedMs: Date.now() - start }};
                }} else {{
                    stableMs = 0;
                }}
                lastCount = count;
            }}
            return {{ ok: false, waitedMs: Date.now() - start }};
        }})()"#
    );

    match page.evaluate(js).await {
        Ok(result) => {
            let info = result.value().cloned().unwrap_or(Value::Null);
            let ok = info.get("ok").and_then(Value::as_bool).unwrap_or(false);
            let waited = info.get("waitedMs").and_then(Value::as_u64).unwrap_or(0);
            if ok {
                debug!("network idle after {}ms", waited);
            } else {
                warn!("network idle heuristic gave up after {}ms", waited);
            }
        }
        Err(e) => warn!("network idle heuristic failed: {}", e),
    }
}
