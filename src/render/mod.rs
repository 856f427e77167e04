//! Rendering-engine capability and the session wrapper built on it
//!
//! The engine traits describe what the extractors need from a browser:
//! launch, open a page, navigate, evaluate a script, wait for a selector,
//! snapshot the DOM, close. `session` layers timeouts, user agent and
//! idempotent teardown on top; `chromium` is the concrete engine.

pub mod chromium;
pub mod session;

use crate::utils::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use chromium::ChromiumEngine;
pub use session::{NavigateOptions, PageHandle, RenderedPageSession};

/// When navigation counts as finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationStrategy {
    /// DOM parsed and the load event fired
    DomReady,
    /// Load finished and network activity has settled
    NetworkIdle,
}

/// A browser engine that can start sessions
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Short engine name for logs
    fn id(&self) -> &'static str;

    /// Start one engine instance (one browser process)
    async fn launch(&self) -> Result<Box<dyn EngineSession>>;
}

/// One running engine instance
#[async_trait]
pub trait EngineSession: Send + Sync {
    /// Open a fresh page (tab)
    async fn new_page(&self) -> Result<Box<dyn EnginePage>>;

    /// Terminate the engine. Must be safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}

/// A single page inside a session
#[async_trait]
pub trait EnginePage: Send + Sync {
    async fn set_user_agent(&self, user_agent: &str) -> Result<()>;

    /// Load `url`. `budget` bounds any settle heuristics; the caller
    /// enforces the hard deadline.
    async fn navigate(&self, url: &str, strategy: NavigationStrategy, budget: Duration) -> Result<()>;

    /// Evaluate a script against the current DOM and return its JSON value
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Poll for `selector` until it appears or `timeout` elapses
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool>;

    /// Serialized DOM as it currently stands
    async fn content(&self) -> Result<String>;

    /// Close the page. Must be safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}
