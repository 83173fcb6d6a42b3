use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::session::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentId(pub i64);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub details: String,
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// Order data before the store assigns a sequence id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub details: String,
    pub amount_cents: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "confirmed" => Self::Confirmed,
            "cancelled" => Self::Cancelled,
            _ => Self::Pending,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub amount_cents: i64,
    pub reference_code: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPayment {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub amount_cents: i64,
    pub reference_code: String,
}

#[cfg(test)]
mod tests {
    use super::PaymentStatus;

    #[test]
    fn payment_status_round_trips_through_labels() {
        for status in
            [PaymentStatus::Pending, PaymentStatus::Confirmed, PaymentStatus::Cancelled]
        {
            assert_eq!(PaymentStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn unknown_payment_status_defaults_to_pending() {
        assert_eq!(PaymentStatus::parse("refunded"), PaymentStatus::Pending);
    }
}
