mod bootstrap;
mod health;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use shopbot_chat::{ChatTransport, MessageRouter, NoopTransport, PollPolicy, PollRunner};
use shopbot_core::config::{AppConfig, LoadOptions};
use shopbot_core::domain::session::UserId;
use shopbot_db::repositories::{
    SqlOrderRepository, SqlPaymentRepository, SqlPriceAlertRepository, SqlSessionRepository,
};
use shopbot_prices::{AlertNotifier, HttpPriceClient, NotificationSink, NotifyError, RetryPolicy};

fn init_logging(config: &AppConfig) {
    use shopbot_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

/// Lets the alert notifier deliver over the chat transport without the
/// prices crate knowing about it.
struct TransportSink {
    transport: Arc<dyn ChatTransport>,
}

#[async_trait]
impl NotificationSink for TransportSink {
    async fn notify(&self, user_id: &UserId, text: &str) -> Result<(), NotifyError> {
        self.transport
            .send(user_id, text, None)
            .await
            .map_err(|send_error| NotifyError::Send(send_error.to_string()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.db_pool.clone(),
    )
    .await?;

    let sessions = Arc::new(SqlSessionRepository::new(app.db_pool.clone()));
    let orders = Arc::new(SqlOrderRepository::new(app.db_pool.clone()));
    let payments = Arc::new(SqlPaymentRepository::new(app.db_pool.clone()));
    let alerts = Arc::new(SqlPriceAlertRepository::new(app.db_pool.clone()));

    let prices = Arc::new(HttpPriceClient::new(
        app.config.prices.base_url.clone(),
        app.config.prices.timeout_secs,
        RetryPolicy { max_retries: app.config.prices.max_retries, ..RetryPolicy::default() },
    )?);

    // No chat backend is bundled; the transport seam stays a no-op until
    // one is wired in, mirroring how the health endpoint keeps running.
    let transport: Arc<dyn ChatTransport> = Arc::new(NoopTransport);
    tracing::info!(
        event_name = "system.server.chat_transport_mode",
        transport_mode = "noop",
        "chat transport initialized"
    );

    if app.config.alerts.enabled {
        let notifier = AlertNotifier::new(
            alerts,
            prices.clone(),
            Arc::new(TransportSink { transport: transport.clone() }),
            Duration::from_secs(app.config.alerts.interval_secs),
        );
        tokio::spawn(async move { notifier.run().await });
        tracing::info!(
            event_name = "system.server.alerts_enabled",
            interval_secs = app.config.alerts.interval_secs,
            "alert notifier started"
        );
    }

    let mut router = MessageRouter::new(
        sessions,
        orders,
        payments,
        transport.clone(),
        prices,
        UserId(app.config.chat.admin_user_id.clone()),
    );
    let runner = PollRunner::new(transport, PollPolicy::default());

    tracing::info!(event_name = "system.server.started", "shopbot-server started");

    tokio::select! {
        poll_result = runner.run(&mut router) => {
            poll_result?;
            tracing::info!(
                event_name = "system.server.poll_finished",
                "message polling finished"
            );
            wait_for_shutdown().await?;
        }
        shutdown = wait_for_shutdown() => {
            shutdown?;
        }
    }

    tracing::info!(event_name = "system.server.stopping", "shopbot-server stopping");

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
