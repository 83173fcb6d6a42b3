use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::session::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertDirection {
    Above,
    Below,
}

impl AlertDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Above => "above",
            Self::Below => "below",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "below" => Self::Below,
            _ => Self::Above,
        }
    }

    pub fn crossed(&self, threshold_cents: i64, price_cents: i64) -> bool {
        match self {
            Self::Above => price_cents >= threshold_cents,
            Self::Below => price_cents <= threshold_cents,
        }
    }
}

/// Subscription row owned by the alert notifier. The message router never
/// reads or writes these.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAlert {
    pub id: i64,
    pub user_id: UserId,
    pub symbol: String,
    pub threshold_cents: i64,
    pub direction: AlertDirection,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPriceAlert {
    pub user_id: UserId,
    pub symbol: String,
    pub threshold_cents: i64,
    pub direction: AlertDirection,
}

#[cfg(test)]
mod tests {
    use super::AlertDirection;

    #[test]
    fn above_fires_at_or_over_the_threshold() {
        assert!(AlertDirection::Above.crossed(10_000, 10_000));
        assert!(AlertDirection::Above.crossed(10_000, 12_500));
        assert!(!AlertDirection::Above.crossed(10_000, 9_999));
    }

    #[test]
    fn below_fires_at_or_under_the_threshold() {
        assert!(AlertDirection::Below.crossed(10_000, 10_000));
        assert!(AlertDirection::Below.crossed(10_000, 8_000));
        assert!(!AlertDirection::Below.crossed(10_000, 10_001));
    }
}
