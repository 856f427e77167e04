//! Scoped rendering sessions and pages
//!
//! A `RenderedPageSession` owns one engine instance; each `PageHandle` owns
//! one page. Both close idempotently. Dropping either without `close()`
//! logs a warning and leaves teardown to the engine's own `Drop`.

use crate::render::{EnginePage, EngineSession, NavigationStrategy, RenderEngine};
use crate::utils::config::ExtractorSettings;
use crate::utils::error::{Result, SunoloaderError};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Navigation parameters
#[derive(Debug, Clone, Copy)]
pub struct NavigateOptions {
    pub strategy: NavigationStrategy,
    /// Hard deadline for the whole navigation
    pub timeout: Duration,
    /// How long settle heuristics may wait before giving up quietly.
    /// Always shorter than `timeout`.
    pub settle_budget: Duration,
}

impl NavigateOptions {
    pub fn dom_ready(timeout: Duration) -> Self {
        Self {
            strategy: NavigationStrategy::DomReady,
            timeout,
            settle_budget: Duration::ZERO,
        }
    }

    /// Wait for network activity to settle for at most `settle_budget`,
    /// capped at half the deadline so the load itself keeps headroom.
    pub fn network_idle(timeout: Duration, settle_budget: Duration) -> Self {
        Self {
            strategy: NavigationStrategy::NetworkIdle,
            timeout,
            settle_budget: settle_budget.min(timeout / 2),
        }
    }
}

/// One engine instance, reused across pages
pub struct RenderedPageSession {
    session: Option<Box<dyn EngineSession>>,
    engine_id: &'static str,
    settings: Arc<ExtractorSettings>,
}

impl RenderedPageSession {
    /// Launch an engine instance
    pub async fn open(engine: &dyn RenderEngine, settings: Arc<ExtractorSettings>) -> Result<Self> {
        info!("Launching {} session", engine.id());
        let session = engine.launch().await?;
        Ok(Self {
            session: Some(session),
            engine_id: engine.id(),
            settings,
        })
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Open a page with the configured user agent applied
    pub async fn new_page(&self) -> Result<PageHandle> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| SunoloaderError::SessionLost("session already closed".into()))?;

        let mut page = session.new_page().await?;
        if let Err(e) = page.set_user_agent(&self.settings.user_agent).await {
            // don't leak the page we just opened
            if let Err(close_err) = page.close().await {
                warn!("Failed to close page after user-agent error: {}", close_err);
            }
            return Err(e);
        }
        Ok(PageHandle { page: Some(page) })
    }

    /// Tear the engine down. Safe to call repeatedly.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut session) = self.session.take() {
            info!("Closing {} session", self.engine_id);
            session.close().await?;
        }
        Ok(())
    }
}

impl Drop for RenderedPageSession {
    fn drop(&mut self) {
        if self.session.is_some() {
            // the engine session's own Drop terminates the process
            warn!("{} session dropped without close()", self.engine_id);
        }
    }
}

/// One page inside a session
pub struct PageHandle {
    page: Option<Box<dyn EnginePage>>,
}

impl Drop for PageHandle {
    fn drop(&mut self) {
        if self.page.is_some() {
            warn!("page dropped without close()");
        }
    }
}

impl PageHandle {
    fn page(&self) -> Result<&dyn EnginePage> {
        self.page
            .as_deref()
            .ok_or_else(|| SunoloaderError::Render("page already closed".into()))
    }

    /// Navigate, failing with `NavigationTimeout` once the deadline passes
    pub async fn navigate(&self, url: &str, options: NavigateOptions) -> Result<()> {
        let page = self.page()?;
        debug!("Navigating to {} ({:?})", url, options.strategy);
        match tokio::time::timeout(
            options.timeout,
            page.navigate(url, options.strategy, options.settle_budget),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(SunoloaderError::NavigationTimeout {
                url: url.to_string(),
                timeout_ms: options.timeout.as_millis() as u64,
            }),
        }
    }

    /// Evaluate a script and deserialize its result
    pub async fn evaluate<T: DeserializeOwned>(&self, script: &str) -> Result<T> {
        let value = self.page()?.evaluate(script).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Wait for a selector; a timeout or engine error is reported as `false`
    pub async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> bool {
        let Ok(page) = self.page() else {
            return false;
        };
        match page.wait_for_selector(selector, timeout).await {
            Ok(found) => found,
            Err(e) => {
                debug!("wait_for_selector({}) failed: {}", selector, e);
                false
            }
        }
    }

    pub async fn content(&self) -> Result<String> {
        self.page()?.content().await
    }

    /// Close the page. Safe to call repeatedly.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut page) = self.page.take() {
            page.close().await?;
        }
        Ok(())
    }
}
