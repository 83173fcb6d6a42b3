use chrono::{DateTime, Utc};
use sqlx::Row;

use shopbot_core::domain::order::{NewOrder, Order, OrderId};
use shopbot_core::domain::session::UserId;

use super::{OrderRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_order(row: &sqlx::sqlite::SqliteRow) -> Result<Order, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let user_id: String =
        row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let details: String =
        row.try_get("details").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let amount_cents: i64 =
        row.try_get("amount_cents").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(Order { id: OrderId(id), user_id: UserId(user_id), details, amount_cents, created_at })
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn create(&self, order: NewOrder) -> Result<OrderId, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO orders (user_id, details, amount_cents, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&order.user_id.0)
        .bind(&order.details)
        .bind(order.amount_cents)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(OrderId(result.last_insert_rowid()))
    }

    async fn list_recent_for_user(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, user_id, details, amount_cents, created_at
             FROM orders WHERE user_id = ?
             ORDER BY id DESC LIMIT ?",
        )
        .bind(&user_id.0)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_order).collect()
    }
}

#[cfg(test)]
mod tests {
    use shopbot_core::domain::order::NewOrder;
    use shopbot_core::domain::session::UserId;

    use crate::connection::connect_in_memory;
    use crate::migrations::run_pending;
    use crate::repositories::{OrderRepository, SqlOrderRepository};

    #[tokio::test]
    async fn create_returns_increasing_ids_and_lists_newest_first() {
        let pool = connect_in_memory().await.expect("pool should connect");
        run_pending(&pool).await.expect("migrations should apply");
        let repo = SqlOrderRepository::new(pool.clone());
        let user = UserId("order-user".to_owned());

        let first = repo
            .create(NewOrder {
                user_id: user.clone(),
                details: "first order".to_owned(),
                amount_cents: 620,
            })
            .await
            .expect("create first");
        let second = repo
            .create(NewOrder {
                user_id: user.clone(),
                details: "second order".to_owned(),
                amount_cents: 630,
            })
            .await
            .expect("create second");
        assert!(second.0 > first.0);

        let listed = repo.list_recent_for_user(&user, 10).await.expect("list");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second);
        assert_eq!(listed[0].details, "second order");
        assert_eq!(listed[1].id, first);

        pool.close().await;
    }
}
