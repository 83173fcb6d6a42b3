use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::warn;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceQuote {
    pub symbol: String,
    pub price_cents: i64,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PriceError {
    #[error("price request failed: {0}")]
    Request(String),
    #[error("price endpoint returned status {status}")]
    Status { status: u16 },
    #[error("price payload could not be decoded: {0}")]
    Decode(String),
    #[error("unknown asset symbol `{0}`")]
    UnknownSymbol(String),
}

impl PriceError {
    /// Transport faults and server-side errors are worth another attempt;
    /// bad symbols and malformed payloads are not.
    fn is_retryable(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::Status { status } => *status >= 500,
            Self::Decode(_) | Self::UnknownSymbol(_) => false,
        }
    }
}

/// Seam between the router/notifier and the HTTP client so both can be
/// tested against a stub.
#[async_trait]
pub trait PriceLookup: Send + Sync {
    async fn fetch_price(&self, symbol: &str) -> Result<PriceQuote, PriceError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

pub struct HttpPriceClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HttpPriceClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout_secs: u64,
        retry: RetryPolicy,
    ) -> Result<Self, PriceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|error| PriceError::Request(error.to_string()))?;

        Ok(Self { http, base_url: base_url.into(), retry })
    }

    async fn fetch_once(&self, symbol: &str) -> Result<PriceQuote, PriceError> {
        let asset_id = asset_id_for_symbol(symbol).ok_or_else(|| {
            PriceError::UnknownSymbol(symbol.to_owned())
        })?;
        let url = format!(
            "{}/simple/price?ids={asset_id}&vs_currencies=usd",
            self.base_url.trim_end_matches('/')
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|error| PriceError::Request(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PriceError::Status { status: status.as_u16() });
        }

        let payload: serde_json::Value =
            response.json().await.map_err(|error| PriceError::Decode(error.to_string()))?;
        quote_from_payload(symbol, asset_id, &payload)
    }
}

#[async_trait]
impl PriceLookup for HttpPriceClient {
    async fn fetch_price(&self, symbol: &str) -> Result<PriceQuote, PriceError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(symbol).await {
                Ok(quote) => return Ok(quote),
                Err(error) if error.is_retryable() && attempt < self.retry.max_retries => {
                    warn!(
                        symbol,
                        attempt,
                        max_retries = self.retry.max_retries,
                        error = %error,
                        "price fetch failed; backing off"
                    );
                    tokio::time::sleep(self.retry.backoff(attempt)).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// Maps the user-facing ticker to the upstream asset id.
fn asset_id_for_symbol(symbol: &str) -> Option<&'static str> {
    match symbol.to_ascii_uppercase().as_str() {
        "BTC" => Some("bitcoin"),
        "ETH" => Some("ethereum"),
        "LTC" => Some("litecoin"),
        "SOL" => Some("solana"),
        "DOGE" => Some("dogecoin"),
        "XMR" => Some("monero"),
        _ => None,
    }
}

fn quote_from_payload(
    symbol: &str,
    asset_id: &str,
    payload: &serde_json::Value,
) -> Result<PriceQuote, PriceError> {
    let price_usd = payload
        .get(asset_id)
        .and_then(|entry| entry.get("usd"))
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| {
            PriceError::Decode(format!("missing usd price for asset `{asset_id}`"))
        })?;

    Ok(PriceQuote {
        symbol: symbol.to_ascii_uppercase(),
        price_cents: (price_usd * 100.0).round() as i64,
        fetched_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{asset_id_for_symbol, quote_from_payload, PriceError, RetryPolicy};

    #[test]
    fn backoff_grows_exponentially_and_caps() {
        let policy = RetryPolicy { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 };
        assert_eq!(policy.backoff(0), Duration::from_millis(250));
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_millis(1_000));
        assert_eq!(policy.backoff(10), Duration::from_millis(5_000));
    }

    #[test]
    fn known_symbols_map_to_asset_ids() {
        assert_eq!(asset_id_for_symbol("btc"), Some("bitcoin"));
        assert_eq!(asset_id_for_symbol("ETH"), Some("ethereum"));
        assert_eq!(asset_id_for_symbol("SHOPCOIN"), None);
    }

    #[test]
    fn payload_decodes_to_cents() {
        let payload = serde_json::json!({ "bitcoin": { "usd": 65_123.456 } });
        let quote = quote_from_payload("btc", "bitcoin", &payload).expect("decode");
        assert_eq!(quote.symbol, "BTC");
        assert_eq!(quote.price_cents, 6_512_346);
    }

    #[test]
    fn missing_price_is_a_decode_error() {
        let payload = serde_json::json!({ "bitcoin": {} });
        let error = quote_from_payload("btc", "bitcoin", &payload).expect_err("must fail");
        assert!(matches!(error, PriceError::Decode(_)));
    }

    #[test]
    fn retryability_follows_the_error_class() {
        assert!(PriceError::Request("timeout".to_owned()).is_retryable());
        assert!(PriceError::Status { status: 503 }.is_retryable());
        assert!(!PriceError::Status { status: 404 }.is_retryable());
        assert!(!PriceError::UnknownSymbol("SHOPCOIN".to_owned()).is_retryable());
    }
}
