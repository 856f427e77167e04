//! Plain HTTP page fetching, no rendering engine involved
//!
//! No retries happen here: callers own retry and fallback policy.

use crate::utils::config::ExtractorSettings;
use crate::utils::error::{Result, SunoloaderError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Fetches raw page HTML
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET `url` and return the body, failing with `HttpError` on non-2xx
    /// or `FetchTimeout` when `timeout` elapses.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String>;
}

/// reqwest-backed fetcher
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(settings: &ExtractorSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.fetch_timeout())
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String> {
        debug!("Fetching {}", url);
        let timeout_ms = timeout.as_millis() as u64;

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, url, timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Fetch of {} returned HTTP {}", url, status.as_u16());
            return Err(SunoloaderError::HttpError {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| classify(e, url, timeout_ms))
    }
}

fn classify(err: reqwest::Error, url: &str, timeout_ms: u64) -> SunoloaderError {
    if err.is_timeout() {
        SunoloaderError::FetchTimeout {
            url: url.to_string(),
            timeout_ms,
        }
    } else {
        SunoloaderError::Network(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a local port
    async fn serve_once(response: &'static str, delay: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                tokio::time::sleep(delay).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{}/song/x", addr)
    }

    #[tokio::test]
    async fn test_fetch_success_returns_body() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
            Duration::ZERO,
        )
        .await;
        let fetcher = HttpFetcher::new(&ExtractorSettings::default()).unwrap();
        let body = fetcher.fetch(&url, Duration::from_secs(5)).await.unwrap();
        assert_eq!(body, "hello");
    }

    #[tokio::test]
    async fn test_fetch_non_2xx_is_http_error() {
        let url = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            Duration::ZERO,
        )
        .await;
        let fetcher = HttpFetcher::new(&ExtractorSettings::default()).unwrap();
        let err = fetcher.fetch(&url, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, SunoloaderError::HttpError { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            Duration::from_secs(3),
        )
        .await;
        let fetcher = HttpFetcher::new(&ExtractorSettings::default()).unwrap();
        let err = fetcher
            .fetch(&url, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, SunoloaderError::FetchTimeout { timeout_ms: 100, .. }));
    }
}
