use rust_decimal::Decimal;

/// Flat fee charged for every order, in cents.
pub const BASE_AMOUNT_CENTS: i64 = 500;
/// Per-character rate applied to the assembled order detail text, in cents.
pub const PER_CHAR_CENTS: i64 = 10;

/// Placeholder pricing heuristic. Real pricing lives outside this core; the
/// formula only needs to be deterministic for the exact detail text that
/// reached the order trigger.
pub fn order_amount_cents(details: &str) -> i64 {
    BASE_AMOUNT_CENTS + details.chars().count() as i64 * PER_CHAR_CENTS
}

/// Renders a cent amount as a dollar figure for user-facing messages.
pub fn format_amount(amount_cents: i64) -> String {
    format!("${}", Decimal::new(amount_cents, 2))
}

#[cfg(test)]
mod tests {
    use super::{format_amount, order_amount_cents, BASE_AMOUNT_CENTS, PER_CHAR_CENTS};

    #[test]
    fn amount_follows_base_plus_per_char_formula() {
        let details = "Digital – Accounts\nneed 2 licenses";
        let expected = BASE_AMOUNT_CENTS + details.chars().count() as i64 * PER_CHAR_CENTS;
        assert_eq!(order_amount_cents(details), expected);
    }

    #[test]
    fn empty_details_cost_the_base_fee() {
        assert_eq!(order_amount_cents(""), BASE_AMOUNT_CENTS);
    }

    #[test]
    fn amount_counts_characters_not_bytes() {
        // The en dash is three bytes but one character.
        assert_eq!(order_amount_cents("–"), BASE_AMOUNT_CENTS + PER_CHAR_CENTS);
    }

    #[test]
    fn recomputing_for_the_same_details_is_stable() {
        let details = "two custom stickers";
        assert_eq!(order_amount_cents(details), order_amount_cents(details));
    }

    #[test]
    fn formats_cents_as_dollars() {
        assert_eq!(format_amount(690), "$6.90");
        assert_eq!(format_amount(500), "$5.00");
    }
}
