use async_trait::async_trait;
use thiserror::Error;

use shopbot_core::domain::alert::{NewPriceAlert, PriceAlert};
use shopbot_core::domain::order::{NewOrder, NewPayment, Order, OrderId, Payment};
use shopbot_core::domain::session::{UserId, UserSession};

pub mod alert;
pub mod memory;
pub mod order;
pub mod payment;
pub mod session;

pub use alert::SqlPriceAlertRepository;
pub use memory::{
    InMemoryOrderRepository, InMemoryPaymentRepository, InMemoryPriceAlertRepository,
    InMemorySessionRepository,
};
pub use order::SqlOrderRepository;
pub use payment::SqlPaymentRepository;
pub use session::SqlSessionRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Durable session row store. The message router is the only writer.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn find(&self, user_id: &UserId) -> Result<Option<UserSession>, RepositoryError>;

    /// Inserts or replaces the full session row.
    async fn upsert(&self, session: UserSession) -> Result<(), RepositoryError>;

    /// Writes only the dialogue state label; `None` clears it back to idle.
    async fn set_state(
        &self,
        user_id: &UserId,
        state: Option<&str>,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persists the order and returns its generated sequence id.
    async fn create(&self, order: NewOrder) -> Result<OrderId, RepositoryError>;

    async fn list_recent_for_user(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<Order>, RepositoryError>;
}

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(&self, payment: NewPayment) -> Result<Payment, RepositoryError>;

    async fn find_by_order(&self, order_id: &OrderId) -> Result<Option<Payment>, RepositoryError>;
}

/// Owned by the alert notifier; disjoint from everything the router touches.
#[async_trait]
pub trait PriceAlertRepository: Send + Sync {
    async fn create(&self, alert: NewPriceAlert) -> Result<PriceAlert, RepositoryError>;

    async fn list_active(&self) -> Result<Vec<PriceAlert>, RepositoryError>;

    async fn deactivate(&self, id: i64) -> Result<(), RepositoryError>;
}
