use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use shopbot_core::domain::session::UserId;
use shopbot_core::pricing::format_amount;
use shopbot_db::repositories::{PriceAlertRepository, RepositoryError};

use crate::client::{PriceError, PriceLookup, PriceQuote};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification send failed: {0}")]
    Send(String),
}

/// Outbound channel for alert notifications. The server adapts the chat
/// transport to this; tests use a recording stub.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, user_id: &UserId, text: &str) -> Result<(), NotifyError>;
}

/// Periodic task watching price-alert subscriptions.
///
/// Runs on its own timer and only touches the `price_alerts` table; it
/// shares no state with the message router, in particular not the scratch
/// cache.
pub struct AlertNotifier {
    alerts: Arc<dyn PriceAlertRepository>,
    prices: Arc<dyn PriceLookup>,
    sink: Arc<dyn NotificationSink>,
    interval: Duration,
}

impl AlertNotifier {
    pub fn new(
        alerts: Arc<dyn PriceAlertRepository>,
        prices: Arc<dyn PriceLookup>,
        sink: Arc<dyn NotificationSink>,
        interval: Duration,
    ) -> Self {
        Self { alerts, prices, sink, interval }
    }

    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.tick().await {
                Ok(fired) if fired > 0 => {
                    info!(fired, "price alerts fired");
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(error = %error, "alert pass failed; will retry next interval");
                }
            }
        }
    }

    /// One evaluation pass. Returns the number of alerts fired.
    pub async fn tick(&self) -> Result<usize, RepositoryError> {
        let active = self.alerts.list_active().await?;
        if active.is_empty() {
            return Ok(0);
        }

        // One fetch per distinct symbol per pass.
        let mut quotes: HashMap<String, Result<PriceQuote, PriceError>> = HashMap::new();
        let mut fired = 0;

        for alert in active {
            if !quotes.contains_key(&alert.symbol) {
                let fetched = self.prices.fetch_price(&alert.symbol).await;
                quotes.insert(alert.symbol.clone(), fetched);
            }

            let quote = match &quotes[&alert.symbol] {
                Ok(quote) => quote.clone(),
                Err(error) => {
                    warn!(
                        symbol = %alert.symbol,
                        alert_id = alert.id,
                        error = %error,
                        "price fetch failed; alert left active"
                    );
                    continue;
                }
            };

            if !alert.direction.crossed(alert.threshold_cents, quote.price_cents) {
                continue;
            }

            let text = format!(
                "{} is {} your alert threshold of {}. Current price: {}.",
                alert.symbol,
                alert.direction.as_str(),
                format_amount(alert.threshold_cents),
                format_amount(quote.price_cents),
            );

            // The alert stays active if the notification cannot be
            // delivered, so the next pass tries again.
            if let Err(error) = self.sink.notify(&alert.user_id, &text).await {
                warn!(
                    user_id = %alert.user_id,
                    alert_id = alert.id,
                    error = %error,
                    "alert notification failed; alert left active"
                );
                continue;
            }

            self.alerts.deactivate(alert.id).await?;
            fired += 1;
        }

        Ok(fired)
    }
}
