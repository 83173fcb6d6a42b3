use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;

use shopbot_core::domain::alert::{NewPriceAlert, PriceAlert};
use shopbot_core::domain::order::{
    NewOrder, NewPayment, Order, OrderId, Payment, PaymentId, PaymentStatus,
};
use shopbot_core::domain::session::{UserId, UserSession};

use super::{
    OrderRepository, PaymentRepository, PriceAlertRepository, RepositoryError, SessionRepository,
};

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<String, UserSession>>,
}

#[async_trait::async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn find(&self, user_id: &UserId) -> Result<Option<UserSession>, RepositoryError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&user_id.0).cloned())
    }

    async fn upsert(&self, session: UserSession) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.user_id.0.clone(), session);
        Ok(())
    }

    async fn set_state(
        &self,
        user_id: &UserId,
        state: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(&user_id.0) {
            session.dialogue_state = state.map(str::to_owned);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<Vec<Order>>,
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(&self, order: NewOrder) -> Result<OrderId, RepositoryError> {
        let mut orders = self.orders.write().await;
        let id = OrderId(orders.len() as i64 + 1);
        orders.push(Order {
            id,
            user_id: order.user_id,
            details: order.details,
            amount_cents: order.amount_cents,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn list_recent_for_user(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders
            .iter()
            .rev()
            .filter(|order| &order.user_id == user_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryPaymentRepository {
    payments: RwLock<Vec<Payment>>,
}

#[async_trait::async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn create(&self, payment: NewPayment) -> Result<Payment, RepositoryError> {
        let mut payments = self.payments.write().await;
        if payments.iter().any(|existing| existing.reference_code == payment.reference_code) {
            return Err(RepositoryError::Decode(format!(
                "duplicate payment reference `{}`",
                payment.reference_code
            )));
        }
        let created = Payment {
            id: PaymentId(payments.len() as i64 + 1),
            order_id: payment.order_id,
            user_id: payment.user_id,
            amount_cents: payment.amount_cents,
            reference_code: payment.reference_code,
            status: PaymentStatus::Pending,
            created_at: Utc::now(),
        };
        payments.push(created.clone());
        Ok(created)
    }

    async fn find_by_order(&self, order_id: &OrderId) -> Result<Option<Payment>, RepositoryError> {
        let payments = self.payments.read().await;
        Ok(payments.iter().find(|payment| &payment.order_id == order_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryPriceAlertRepository {
    alerts: RwLock<Vec<PriceAlert>>,
}

#[async_trait::async_trait]
impl PriceAlertRepository for InMemoryPriceAlertRepository {
    async fn create(&self, alert: NewPriceAlert) -> Result<PriceAlert, RepositoryError> {
        let mut alerts = self.alerts.write().await;
        let created = PriceAlert {
            id: alerts.len() as i64 + 1,
            user_id: alert.user_id,
            symbol: alert.symbol,
            threshold_cents: alert.threshold_cents,
            direction: alert.direction,
            active: true,
            created_at: Utc::now(),
        };
        alerts.push(created.clone());
        Ok(created)
    }

    async fn list_active(&self) -> Result<Vec<PriceAlert>, RepositoryError> {
        let alerts = self.alerts.read().await;
        Ok(alerts.iter().filter(|alert| alert.active).cloned().collect())
    }

    async fn deactivate(&self, id: i64) -> Result<(), RepositoryError> {
        let mut alerts = self.alerts.write().await;
        if let Some(alert) = alerts.iter_mut().find(|alert| alert.id == id) {
            alert.active = false;
        }
        Ok(())
    }
}
