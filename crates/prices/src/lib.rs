pub mod client;
pub mod notifier;

pub use client::{HttpPriceClient, PriceError, PriceLookup, PriceQuote, RetryPolicy};
pub use notifier::{AlertNotifier, NotificationSink, NotifyError};
