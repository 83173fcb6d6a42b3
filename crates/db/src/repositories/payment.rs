use chrono::{DateTime, Utc};
use sqlx::Row;

use shopbot_core::domain::order::{NewPayment, OrderId, Payment, PaymentId, PaymentStatus};
use shopbot_core::domain::session::UserId;

use super::{PaymentRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPaymentRepository {
    pool: DbPool,
}

impl SqlPaymentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_payment(row: &sqlx::sqlite::SqliteRow) -> Result<Payment, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let order_id: i64 =
        row.try_get("order_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let user_id: String =
        row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let amount_cents: i64 =
        row.try_get("amount_cents").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let reference_code: String =
        row.try_get("reference_code").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(Payment {
        id: PaymentId(id),
        order_id: OrderId(order_id),
        user_id: UserId(user_id),
        amount_cents,
        reference_code,
        status: PaymentStatus::parse(&status_str),
        created_at,
    })
}

#[async_trait::async_trait]
impl PaymentRepository for SqlPaymentRepository {
    async fn create(&self, payment: NewPayment) -> Result<Payment, RepositoryError> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO payments (order_id, user_id, amount_cents, reference_code, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(payment.order_id.0)
        .bind(&payment.user_id.0)
        .bind(payment.amount_cents)
        .bind(&payment.reference_code)
        .bind(PaymentStatus::Pending.as_str())
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Payment {
            id: PaymentId(result.last_insert_rowid()),
            order_id: payment.order_id,
            user_id: payment.user_id,
            amount_cents: payment.amount_cents,
            reference_code: payment.reference_code,
            status: PaymentStatus::Pending,
            created_at,
        })
    }

    async fn find_by_order(&self, order_id: &OrderId) -> Result<Option<Payment>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, order_id, user_id, amount_cents, reference_code, status, created_at
             FROM payments WHERE order_id = ?",
        )
        .bind(order_id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_payment(r)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use shopbot_core::domain::order::{NewOrder, NewPayment, PaymentStatus};
    use shopbot_core::domain::session::UserId;
    use shopbot_core::reference::payment_reference;

    use crate::connection::connect_in_memory;
    use crate::migrations::run_pending;
    use crate::repositories::{
        OrderRepository, PaymentRepository, SqlOrderRepository, SqlPaymentRepository,
    };

    #[tokio::test]
    async fn payment_is_created_pending_and_found_by_order() {
        let pool = connect_in_memory().await.expect("pool should connect");
        run_pending(&pool).await.expect("migrations should apply");
        let orders = SqlOrderRepository::new(pool.clone());
        let payments = SqlPaymentRepository::new(pool.clone());
        let user = UserId("payment-user".to_owned());

        let order_id = orders
            .create(NewOrder {
                user_id: user.clone(),
                details: "two stickers".to_owned(),
                amount_cents: 690,
            })
            .await
            .expect("create order");

        let created = payments
            .create(NewPayment {
                order_id,
                user_id: user.clone(),
                amount_cents: 690,
                reference_code: payment_reference(order_id),
            })
            .await
            .expect("create payment");
        assert_eq!(created.status, PaymentStatus::Pending);
        assert_eq!(created.reference_code, payment_reference(order_id));

        let found = payments.find_by_order(&order_id).await.expect("find").expect("payment row");
        assert_eq!(found.id, created.id);
        assert_eq!(found.amount_cents, 690);

        pool.close().await;
    }

    #[tokio::test]
    async fn duplicate_reference_codes_are_rejected_by_the_schema() {
        let pool = connect_in_memory().await.expect("pool should connect");
        run_pending(&pool).await.expect("migrations should apply");
        let orders = SqlOrderRepository::new(pool.clone());
        let payments = SqlPaymentRepository::new(pool.clone());
        let user = UserId("dup-ref-user".to_owned());

        let first = orders
            .create(NewOrder { user_id: user.clone(), details: "a".to_owned(), amount_cents: 510 })
            .await
            .expect("create order");
        let second = orders
            .create(NewOrder { user_id: user.clone(), details: "b".to_owned(), amount_cents: 510 })
            .await
            .expect("create order");

        payments
            .create(NewPayment {
                order_id: first,
                user_id: user.clone(),
                amount_cents: 510,
                reference_code: "SB-DUP".to_owned(),
            })
            .await
            .expect("first payment");
        let duplicate = payments
            .create(NewPayment {
                order_id: second,
                user_id: user,
                amount_cents: 510,
                reference_code: "SB-DUP".to_owned(),
            })
            .await;
        assert!(duplicate.is_err(), "unique constraint should reject duplicate references");

        pool.close().await;
    }
}
