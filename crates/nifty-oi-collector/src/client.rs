//! Upstream NSE option-chain client.
//!
//! One HTTP GET per poll against the public option-chain endpoint. The site
//! requires a primed cookie session: the first request (and any request
//! after a rejection) visits the option-chain page with browser-like
//! headers before hitting the JSON API.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use thiserror::Error;

use nifty_oi_chain::{ChainError, RawOptionChain};

use crate::config::SourceConfig;
use crate::sink::SinkError;

pub const NSE_BASE_URL: &str = "https://www.nseindia.com";

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0 Safari/537.36";

/// Collector error taxonomy. None of these terminate the polling loop; the
/// only path that exits it is an explicit stop signal.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Fetch failed or timed out. Recoverable: triggers last-good-value
    /// fallback and a visible warning.
    #[error("fetch failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Schema violation in the fetched JSON. Recoverable the same way.
    #[error(transparent)]
    Malformed(#[from] ChainError),

    /// Persistence failed. Logged and retried on the next persist tick.
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Seam between the poller and the network, so the polling loop is testable
/// without an upstream.
#[async_trait]
pub trait ChainSource: Send + Sync {
    async fn fetch(&self) -> Result<RawOptionChain, CollectorError>;
}

/// Live client against the NSE option-chain API.
pub struct NseClient {
    http: reqwest::Client,
    base_url: String,
    symbol: String,
    /// Whether the cookie session is believed valid. Cleared on rejection
    /// so the next fetch re-primes.
    primed: AtomicBool,
}

impl NseClient {
    pub fn new(source: &SourceConfig) -> Result<Self, CollectorError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .timeout(Duration::from_secs(source.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: source.base_url.clone(),
            symbol: source.symbol.clone(),
            primed: AtomicBool::new(false),
        })
    }

    /// Visit the option-chain page so the server sets session cookies.
    async fn prime(&self) -> Result<(), CollectorError> {
        let url = format!("{}/option-chain", self.base_url);
        tracing::debug!(url = %url, "priming NSE session");
        self.http.get(&url).send().await?.error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl ChainSource for NseClient {
    async fn fetch(&self) -> Result<RawOptionChain, CollectorError> {
        if !self.primed.load(Ordering::Relaxed) {
            self.prime().await?;
            self.primed.store(true, Ordering::Relaxed);
        }

        let url = format!(
            "{}/api/option-chain-indices?symbol={}",
            self.base_url, self.symbol
        );
        let response = self
            .http
            .get(&url)
            .header(REFERER, format!("{}/option-chain", self.base_url))
            .send()
            .await?;

        let response = match response.error_for_status() {
            Ok(r) => r,
            Err(e) => {
                // Session likely expired; re-prime on the next attempt.
                self.primed.store(false, Ordering::Relaxed);
                return Err(CollectorError::Network(e));
            }
        };

        let body = response.text().await?;
        Ok(RawOptionChain::from_json(&body)?)
    }
}
