use shopbot_core::dialogue::{ProductCategory, Prompt};
use shopbot_core::domain::order::{Order, Payment};
use shopbot_core::domain::session::{UserId, UserSession};
use shopbot_core::pricing::format_amount;
use shopbot_prices::PriceQuote;

use crate::transport::Keyboard;

/// A rendered outbound message: text plus an optional reply keyboard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl Reply {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self { text: text.into(), keyboard: None }
    }

    fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self { text: text.into(), keyboard: Some(keyboard) }
    }
}

pub fn main_menu_keyboard() -> Keyboard {
    Keyboard::new(&[&["Shop", "Orders"], &["Feedback", "Support"], &["Help"]])
}

pub fn category_keyboard() -> Keyboard {
    Keyboard::new(&[&["Digital", "Physical", "Services"], &["Cancel"]])
}

pub fn item_keyboard(category: ProductCategory) -> Keyboard {
    let items = category.items();
    Keyboard { rows: vec![items.iter().map(|item| (*item).to_owned()).collect(), vec!["Back".to_owned(), "Cancel".to_owned()]] }
}

pub fn rating_keyboard() -> Keyboard {
    Keyboard::new(&[&["⭐", "⭐⭐", "⭐⭐⭐"], &["⭐⭐⭐⭐", "⭐⭐⭐⭐⭐"], &["cancel feedback"]])
}

/// Renders a semantic prompt from the state machine into transport terms.
pub fn render_prompt(prompt: &Prompt) -> Reply {
    match prompt {
        Prompt::Welcome => Reply::with_keyboard(
            "Welcome to the shop! Pick an option below, or type `help` to see what I can do.",
            main_menu_keyboard(),
        ),
        Prompt::MainMenu => {
            Reply::with_keyboard("What would you like to do?", main_menu_keyboard())
        }
        Prompt::Help => Reply::with_keyboard(help_text(), main_menu_keyboard()),
        Prompt::Cancelled => {
            Reply::with_keyboard("Cancelled. Back to the main menu.", main_menu_keyboard())
        }
        Prompt::CategoryMenu => {
            Reply::with_keyboard("Choose a product category:", category_keyboard())
        }
        Prompt::CategoryReprompt => Reply::with_keyboard(
            "Please choose one of the categories below, or Cancel.",
            category_keyboard(),
        ),
        Prompt::ItemMenu(category) => Reply::with_keyboard(
            format!("Pick a {} item:", category.menu_label().to_ascii_lowercase()),
            item_keyboard(*category),
        ),
        Prompt::ItemReprompt(category) => Reply::with_keyboard(
            "Please pick one of the items below, or go Back / Cancel.",
            item_keyboard(*category),
        ),
        Prompt::OrderDetails => Reply::text_only(
            "Great choice. Describe your order in one message (quantity, options, anything we should know).",
        ),
        Prompt::RatingPrompt => Reply::with_keyboard(
            "How did we do? Send 1 to 5 stars.",
            rating_keyboard(),
        ),
        Prompt::RatingReprompt => Reply::with_keyboard(
            "Please rate us with 1 to 5 star symbols only.",
            rating_keyboard(),
        ),
        Prompt::CommentPrompt => Reply::text_only(
            "Thanks! Any comments to add? Send them now, or type `skip`.",
        ),
        Prompt::FeedbackThanks => {
            Reply::with_keyboard("Thank you for your feedback!", main_menu_keyboard())
        }
        Prompt::SupportIntro => Reply::text_only(
            "You are now chatting with support. Everything you send will be forwarded to an admin. Type `leave` to exit.",
        ),
    }
}

fn help_text() -> String {
    [
        "Here is what I understand:",
        "• `shop` / `buy` — browse the catalog and place an order",
        "• `orders` / `status` — your recent orders and payment status",
        "• `!p BTC` or `/price BTC` — current crypto price",
        "• `feedback` — rate us (`cancel feedback` to stop)",
        "• `support` / `contact` — chat with an admin (`leave` to exit)",
        "• `menu` — back to the main menu, `start` — reset everything",
    ]
    .join("\n")
}

pub fn payment_instructions(payment: &Payment) -> Reply {
    Reply::with_keyboard(
        format!(
            "Order received! Total: {}.\nPlease transfer the amount and include reference code `{}` in the memo. We will confirm as soon as the payment arrives.",
            format_amount(payment.amount_cents),
            payment.reference_code,
        ),
        main_menu_keyboard(),
    )
}

pub fn order_failed() -> Reply {
    Reply::with_keyboard(
        "Sorry, something went wrong while creating your order. Please try again later.",
        main_menu_keyboard(),
    )
}

pub fn try_again_later() -> Reply {
    Reply::with_keyboard(
        "Sorry, something went wrong. Please try again later.",
        main_menu_keyboard(),
    )
}

pub fn orders_summary(entries: &[(Order, Option<Payment>)]) -> Reply {
    if entries.is_empty() {
        return Reply::with_keyboard(
            "You have no orders yet. Type `shop` to place one!",
            main_menu_keyboard(),
        );
    }

    let mut lines = vec!["Your recent orders:".to_owned()];
    for (order, payment) in entries {
        let status = match payment {
            Some(payment) => format!("{} ({})", payment.status.as_str(), payment.reference_code),
            None => "awaiting payment setup".to_owned(),
        };
        lines.push(format!(
            "#{} — {} — {}",
            order.id.0,
            format_amount(order.amount_cents),
            status
        ));
    }
    Reply::text_only(lines.join("\n"))
}

pub fn price_quote(quote: &PriceQuote) -> Reply {
    Reply::text_only(format!("{}: {}", quote.symbol, format_amount(quote.price_cents)))
}

pub fn price_unavailable(symbol: &str) -> Reply {
    Reply::text_only(format!(
        "Could not fetch a price for {symbol} right now. Please try again later."
    ))
}

pub fn unknown_symbol(symbol: &str) -> Reply {
    Reply::text_only(format!("I do not know the asset `{symbol}`. Try BTC, ETH, LTC, SOL."))
}

pub fn profile(session: &UserSession) -> Reply {
    let state = session.dialogue_state.as_deref().unwrap_or("idle");
    Reply::text_only(format!(
        "Your id: {}\nDialogue state: {}\nLast seen: {}",
        session.user_id,
        state,
        session.last_seen_at.to_rfc3339(),
    ))
}

pub fn left_admin_chat() -> Reply {
    Reply::with_keyboard("You have left the support chat.", main_menu_keyboard())
}

pub fn reply_delivery_failed(target: &UserId) -> Reply {
    Reply::text_only(format!("Could not deliver your reply to {target}."))
}

pub fn relay_failed() -> Reply {
    Reply::text_only(
        "Sorry, your message could not be delivered to support right now. Please try again.",
    )
}

/// Format used when relaying a user message to the admin identity.
pub fn admin_relay(from: &UserId, text: &str) -> String {
    format!("{from}: {text}")
}

pub fn feedback_relay(from: &UserId, rating: Option<u8>, text: &str) -> String {
    match rating {
        Some(rating) => format!("Feedback from {from} ({rating}/5): {text}"),
        None => format!("Feedback from {from}: {text}"),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use shopbot_core::dialogue::{ProductCategory, Prompt};
    use shopbot_core::domain::order::{OrderId, Payment, PaymentId, PaymentStatus};
    use shopbot_core::domain::session::UserId;

    use super::{admin_relay, item_keyboard, payment_instructions, render_prompt};

    #[test]
    fn item_keyboard_lists_items_plus_navigation() {
        let keyboard = item_keyboard(ProductCategory::Digital);
        assert_eq!(keyboard.rows[0], vec!["Accounts", "Licenses", "Gift Cards"]);
        assert_eq!(keyboard.rows[1], vec!["Back", "Cancel"]);
    }

    #[test]
    fn reprompt_renders_the_same_reply_every_time() {
        let first = render_prompt(&Prompt::CategoryReprompt);
        let second = render_prompt(&Prompt::CategoryReprompt);
        assert_eq!(first, second);
    }

    #[test]
    fn payment_instructions_mention_amount_and_reference() {
        let payment = Payment {
            id: PaymentId(1),
            order_id: OrderId(42),
            user_id: UserId("U1".to_owned()),
            amount_cents: 690,
            reference_code: "SB-000042-KQ".to_owned(),
            status: PaymentStatus::Pending,
            created_at: Utc::now(),
        };
        let reply = payment_instructions(&payment);
        assert!(reply.text.contains("$6.90"));
        assert!(reply.text.contains("SB-000042-KQ"));
    }

    #[test]
    fn admin_relay_uses_the_documented_format() {
        assert_eq!(admin_relay(&UserId("U7".to_owned()), "hello"), "U7: hello");
    }
}
