use chrono::{DateTime, Utc};
use sqlx::Row;

use shopbot_core::domain::alert::{AlertDirection, NewPriceAlert, PriceAlert};
use shopbot_core::domain::session::UserId;

use super::{PriceAlertRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPriceAlertRepository {
    pool: DbPool,
}

impl SqlPriceAlertRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_alert(row: &sqlx::sqlite::SqliteRow) -> Result<PriceAlert, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let user_id: String =
        row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let symbol: String =
        row.try_get("symbol").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let threshold_cents: i64 =
        row.try_get("threshold_cents").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let direction_str: String =
        row.try_get("direction").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let active: i64 =
        row.try_get("active").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(PriceAlert {
        id,
        user_id: UserId(user_id),
        symbol,
        threshold_cents,
        direction: AlertDirection::parse(&direction_str),
        active: active != 0,
        created_at,
    })
}

#[async_trait::async_trait]
impl PriceAlertRepository for SqlPriceAlertRepository {
    async fn create(&self, alert: NewPriceAlert) -> Result<PriceAlert, RepositoryError> {
        let created_at = Utc::now();
        let result = sqlx::query(
            "INSERT INTO price_alerts (user_id, symbol, threshold_cents, direction, active, created_at)
             VALUES (?, ?, ?, ?, 1, ?)",
        )
        .bind(&alert.user_id.0)
        .bind(&alert.symbol)
        .bind(alert.threshold_cents)
        .bind(alert.direction.as_str())
        .bind(created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(PriceAlert {
            id: result.last_insert_rowid(),
            user_id: alert.user_id,
            symbol: alert.symbol,
            threshold_cents: alert.threshold_cents,
            direction: alert.direction,
            active: true,
            created_at,
        })
    }

    async fn list_active(&self) -> Result<Vec<PriceAlert>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, user_id, symbol, threshold_cents, direction, active, created_at
             FROM price_alerts WHERE active = 1 ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_alert).collect()
    }

    async fn deactivate(&self, id: i64) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE price_alerts SET active = 0 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use shopbot_core::domain::alert::{AlertDirection, NewPriceAlert};
    use shopbot_core::domain::session::UserId;

    use crate::connection::connect_in_memory;
    use crate::migrations::run_pending;
    use crate::repositories::{PriceAlertRepository, SqlPriceAlertRepository};

    #[tokio::test]
    async fn deactivated_alerts_drop_out_of_the_active_list() {
        let pool = connect_in_memory().await.expect("pool should connect");
        run_pending(&pool).await.expect("migrations should apply");
        let repo = SqlPriceAlertRepository::new(pool.clone());

        let alert = repo
            .create(NewPriceAlert {
                user_id: UserId("alert-user".to_owned()),
                symbol: "BTC".to_owned(),
                threshold_cents: 6_500_000_00,
                direction: AlertDirection::Above,
            })
            .await
            .expect("create alert");
        assert!(alert.active);

        let active = repo.list_active().await.expect("list active");
        assert!(active.iter().any(|candidate| candidate.id == alert.id));

        repo.deactivate(alert.id).await.expect("deactivate");
        let active = repo.list_active().await.expect("list active");
        assert!(!active.iter().any(|candidate| candidate.id == alert.id));

        pool.close().await;
    }
}
