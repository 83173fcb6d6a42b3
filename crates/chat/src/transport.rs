use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use shopbot_core::domain::session::UserId;

use crate::router::MessageRouter;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport receive failed: {0}")]
    Receive(String),
    #[error("transport send failed: {0}")]
    Send(String),
}

/// One raw text message delivered by the long-poll transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub user_id: UserId,
    pub text: String,
}

impl InboundMessage {
    pub fn new(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { user_id: UserId(user_id.into()), text: text.into() }
    }
}

/// Reply keyboard: rows of button labels. Buttons send their label back
/// as a plain text message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<String>>,
}

impl Keyboard {
    pub fn new(rows: &[&[&str]]) -> Self {
        Self {
            rows: rows
                .iter()
                .map(|row| row.iter().map(|label| (*label).to_owned()).collect())
                .collect(),
        }
    }
}

/// Long-poll messaging transport seam. `receive_batch` yields `None` when
/// the underlying stream is closed; a `Some` batch preserves delivery order.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn receive_batch(&self) -> Result<Option<Vec<InboundMessage>>, TransportError>;

    async fn send(
        &self,
        user_id: &UserId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopTransport;

#[async_trait]
impl ChatTransport for NoopTransport {
    async fn receive_batch(&self) -> Result<Option<Vec<InboundMessage>>, TransportError> {
        Ok(None)
    }

    async fn send(
        &self,
        _user_id: &UserId,
        _text: &str,
        _keyboard: Option<Keyboard>,
    ) -> Result<(), TransportError> {
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl PollPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Pulls batches off the transport and feeds the router one message at a
/// time. All state reads and writes happen on this single task; that is
/// the invariant that lets the router keep a plain scratch map.
pub struct PollRunner {
    transport: Arc<dyn ChatTransport>,
    policy: PollPolicy,
}

impl PollRunner {
    pub fn new(transport: Arc<dyn ChatTransport>, policy: PollPolicy) -> Self {
        Self { transport, policy }
    }

    pub async fn run(&self, router: &mut MessageRouter) -> Result<()> {
        for attempt in 0..=self.policy.max_retries {
            match self.pump(router).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    warn!(
                        attempt,
                        max_retries = self.policy.max_retries,
                        error = %transport_error,
                        "long-poll receive failed"
                    );

                    if attempt >= self.policy.max_retries {
                        warn!(
                            max_retries = self.policy.max_retries,
                            "long-poll retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn pump(&self, router: &mut MessageRouter) -> Result<(), TransportError> {
        loop {
            let Some(batch) = self.transport.receive_batch().await? else {
                info!("long-poll transport stream closed");
                return Ok(());
            };
            if batch.is_empty() {
                continue;
            }
            router.handle_batch(batch).await;
        }
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use shopbot_core::domain::session::UserId;
    use shopbot_db::repositories::{
        InMemoryOrderRepository, InMemoryPaymentRepository, InMemorySessionRepository,
        SessionRepository,
    };
    use shopbot_prices::{PriceError, PriceLookup, PriceQuote};

    use crate::router::MessageRouter;

    use super::testing::ScriptedTransport;
    use super::{InboundMessage, Keyboard, PollPolicy, PollRunner, TransportError};

    struct NoPrices;

    #[async_trait]
    impl PriceLookup for NoPrices {
        async fn fetch_price(&self, symbol: &str) -> Result<PriceQuote, PriceError> {
            Err(PriceError::UnknownSymbol(symbol.to_owned()))
        }
    }

    #[tokio::test]
    async fn run_retries_after_a_receive_error_and_keeps_processing() {
        let transport = Arc::new(ScriptedTransport::with_batches(vec![
            Err(TransportError::Receive("poll failed".to_owned())),
            Ok(Some(vec![InboundMessage::new("U1", "shop")])),
            Ok(None),
        ]));
        let sessions = Arc::new(InMemorySessionRepository::default());
        let mut router = MessageRouter::new(
            sessions.clone(),
            Arc::new(InMemoryOrderRepository::default()),
            Arc::new(InMemoryPaymentRepository::default()),
            transport.clone(),
            Arc::new(NoPrices),
            UserId("ADMIN".to_owned()),
        );

        let policy = PollPolicy { max_retries: 2, base_delay_ms: 0, max_delay_ms: 0 };
        let runner = PollRunner::new(transport, policy);
        runner.run(&mut router).await.expect("run should finish");

        let session = sessions
            .find(&UserId("U1".to_owned()))
            .await
            .expect("find")
            .expect("session row");
        assert_eq!(session.dialogue_state.as_deref(), Some("selecting_product_category"));
    }

    #[test]
    fn backoff_doubles_until_the_cap() {
        let policy = PollPolicy { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 };
        assert_eq!(policy.backoff(0), Duration::from_millis(250));
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(3), Duration::from_millis(2_000));
        assert_eq!(policy.backoff(12), Duration::from_millis(5_000));
    }

    #[test]
    fn keyboard_builder_preserves_row_shape() {
        let keyboard = Keyboard::new(&[&["Shop", "Orders"], &["Help"]]);
        assert_eq!(keyboard.rows.len(), 2);
        assert_eq!(keyboard.rows[0], vec!["Shop".to_owned(), "Orders".to_owned()]);
        assert_eq!(keyboard.rows[1], vec!["Help".to_owned()]);
    }
}
