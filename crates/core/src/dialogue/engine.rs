use crate::dialogue::states::{
    DialogueAction, DialogueState, ProductCategory, Prompt, ScratchSnapshot, StepOutcome,
};

/// Star glyph accepted by the feedback rating state.
pub const RATING_GLYPH: char = '⭐';
pub const MAX_RATING: usize = 5;

/// Pure transition function for the dialogue state machine.
///
/// Entered only after the router's global pre-transition checks have
/// declined the message. Unrecognized input never changes state; it
/// reproduces the same prompt, so re-delivery is harmless.
pub fn step(state: DialogueState, text: &str, scratch: &ScratchSnapshot) -> StepOutcome {
    let input = text.trim();

    match state {
        DialogueState::Idle => StepOutcome::stay(state, vec![Prompt::MainMenu]),

        // Relay to the admin happens in the router before the table runs;
        // reaching here means the relay checks were bypassed, so just hold.
        DialogueState::ContactingAdmin => StepOutcome::stay(state, vec![Prompt::SupportIntro]),

        DialogueState::SelectingProductCategory => {
            if is_cancel(input) {
                return StepOutcome::transition(DialogueState::Idle, vec![Prompt::Cancelled]);
            }
            for category in ProductCategory::ALL {
                if category.matches_input(input) {
                    return StepOutcome::transition(
                        category.selecting_state(),
                        vec![Prompt::ItemMenu(category)],
                    );
                }
            }
            StepOutcome::stay(state, vec![Prompt::CategoryReprompt])
        }

        DialogueState::SelectingDigitalProduct => select_item(ProductCategory::Digital, input),
        DialogueState::SelectingPhysicalProduct => select_item(ProductCategory::Physical, input),
        DialogueState::SelectingService => select_item(ProductCategory::Service, input),

        DialogueState::CreatingOrder => {
            let details = match &scratch.product_type {
                Some(product_type) => format!("{product_type}\n{input}"),
                None => input.to_owned(),
            };
            StepOutcome::transition(DialogueState::Idle, Vec::new())
                .with_action(DialogueAction::CommitOrder { details })
        }

        DialogueState::FeedbackRating => match parse_rating(input) {
            Some(rating) => {
                StepOutcome::transition(DialogueState::FeedbackComment, vec![Prompt::CommentPrompt])
                    .with_action(DialogueAction::RecordRating(rating))
            }
            None => StepOutcome::stay(state, vec![Prompt::RatingReprompt]),
        },

        DialogueState::FeedbackComment => {
            if input.eq_ignore_ascii_case("skip") {
                StepOutcome::transition(DialogueState::Idle, vec![Prompt::FeedbackThanks])
            } else {
                StepOutcome::transition(DialogueState::Idle, vec![Prompt::FeedbackThanks])
                    .with_action(DialogueAction::ForwardFeedback { text: input.to_owned() })
            }
        }
    }
}

fn select_item(category: ProductCategory, input: &str) -> StepOutcome {
    if input.eq_ignore_ascii_case("back") {
        return StepOutcome::transition(
            DialogueState::SelectingProductCategory,
            vec![Prompt::CategoryMenu],
        );
    }
    if is_cancel(input) {
        return StepOutcome::transition(DialogueState::Idle, vec![Prompt::Cancelled]);
    }
    for item in category.items() {
        if input.eq_ignore_ascii_case(item) {
            return StepOutcome::transition(DialogueState::CreatingOrder, vec![Prompt::OrderDetails])
                .with_action(DialogueAction::SetProductType(category.product_type(item)));
        }
    }
    StepOutcome::stay(category.selecting_state(), vec![Prompt::ItemReprompt(category)])
}

fn is_cancel(input: &str) -> bool {
    input.eq_ignore_ascii_case("cancel")
}

/// A valid rating message consists solely of one to five star glyphs.
fn parse_rating(input: &str) -> Option<u8> {
    if input.is_empty() || !input.chars().all(|ch| ch == RATING_GLYPH) {
        return None;
    }
    let count = input.chars().count();
    (count <= MAX_RATING).then_some(count as u8)
}

#[cfg(test)]
mod tests {
    use crate::dialogue::states::{
        DialogueAction, DialogueState, ProductCategory, Prompt, ScratchSnapshot, StepOutcome,
    };

    use super::step;

    fn no_scratch() -> ScratchSnapshot {
        ScratchSnapshot::default()
    }

    #[test]
    fn idle_resends_the_main_menu_without_transition() {
        let outcome = step(DialogueState::Idle, "xyz", &no_scratch());
        assert_eq!(outcome.next, DialogueState::Idle);
        assert_eq!(outcome.prompts, vec![Prompt::MainMenu]);
        assert!(outcome.actions.is_empty());
    }

    #[test]
    fn category_menu_routes_to_each_sub_state() {
        for category in ProductCategory::ALL {
            let outcome =
                step(DialogueState::SelectingProductCategory, category.menu_label(), &no_scratch());
            assert_eq!(outcome.next, category.selecting_state());
            assert_eq!(outcome.prompts, vec![Prompt::ItemMenu(category)]);
        }
    }

    #[test]
    fn unrecognized_category_input_is_an_idempotent_reprompt() {
        for _ in 0..3 {
            let outcome = step(DialogueState::SelectingProductCategory, "xyz", &no_scratch());
            assert_eq!(outcome.next, DialogueState::SelectingProductCategory);
            assert_eq!(outcome.prompts, vec![Prompt::CategoryReprompt]);
            assert!(outcome.actions.is_empty());
        }
    }

    #[test]
    fn category_cancel_returns_to_idle() {
        let outcome = step(DialogueState::SelectingProductCategory, "cancel", &no_scratch());
        assert_eq!(outcome.next, DialogueState::Idle);
        assert_eq!(outcome.prompts, vec![Prompt::Cancelled]);
    }

    #[test]
    fn selecting_an_item_stores_product_type_and_opens_the_order() {
        let outcome = step(DialogueState::SelectingDigitalProduct, "Accounts", &no_scratch());
        assert_eq!(outcome.next, DialogueState::CreatingOrder);
        assert_eq!(outcome.prompts, vec![Prompt::OrderDetails]);
        assert_eq!(
            outcome.actions,
            vec![DialogueAction::SetProductType("Digital – Accounts".to_owned())]
        );
    }

    #[test]
    fn item_selection_is_case_insensitive() {
        let outcome = step(DialogueState::SelectingService, "consulting", &no_scratch());
        assert_eq!(outcome.next, DialogueState::CreatingOrder);
        assert_eq!(
            outcome.actions,
            vec![DialogueAction::SetProductType("Service – Consulting".to_owned())]
        );
    }

    #[test]
    fn back_returns_to_the_category_menu() {
        let outcome = step(DialogueState::SelectingPhysicalProduct, "back", &no_scratch());
        assert_eq!(outcome.next, DialogueState::SelectingProductCategory);
        assert_eq!(outcome.prompts, vec![Prompt::CategoryMenu]);
    }

    #[test]
    fn unknown_item_reprompts_without_transition() {
        let outcome = step(DialogueState::SelectingPhysicalProduct, "spaceship", &no_scratch());
        assert_eq!(
            outcome,
            StepOutcome::stay(
                DialogueState::SelectingPhysicalProduct,
                vec![Prompt::ItemReprompt(ProductCategory::Physical)]
            )
        );
    }

    #[test]
    fn order_details_are_prefixed_with_the_product_type() {
        let scratch =
            ScratchSnapshot { product_type: Some("Digital – Accounts".to_owned()) };
        let outcome = step(DialogueState::CreatingOrder, "need 2 licenses", &scratch);
        assert_eq!(outcome.next, DialogueState::Idle);
        assert_eq!(
            outcome.actions,
            vec![DialogueAction::CommitOrder {
                details: "Digital – Accounts\nneed 2 licenses".to_owned()
            }]
        );
    }

    #[test]
    fn order_details_without_product_type_pass_through() {
        let outcome = step(DialogueState::CreatingOrder, "just the text", &no_scratch());
        assert_eq!(
            outcome.actions,
            vec![DialogueAction::CommitOrder { details: "just the text".to_owned() }]
        );
    }

    #[test]
    fn three_stars_record_a_rating_of_three() {
        let outcome = step(DialogueState::FeedbackRating, "⭐⭐⭐", &no_scratch());
        assert_eq!(outcome.next, DialogueState::FeedbackComment);
        assert_eq!(outcome.prompts, vec![Prompt::CommentPrompt]);
        assert_eq!(outcome.actions, vec![DialogueAction::RecordRating(3)]);
    }

    #[test]
    fn invalid_ratings_reprompt() {
        for input in ["", "nice", "⭐⭐⭐⭐⭐⭐", "⭐ great"] {
            let outcome = step(DialogueState::FeedbackRating, input, &no_scratch());
            assert_eq!(outcome.next, DialogueState::FeedbackRating, "input {input:?}");
            assert_eq!(outcome.prompts, vec![Prompt::RatingReprompt]);
            assert!(outcome.actions.is_empty());
        }
    }

    #[test]
    fn five_stars_is_the_maximum_accepted_rating() {
        let outcome = step(DialogueState::FeedbackRating, "⭐⭐⭐⭐⭐", &no_scratch());
        assert_eq!(outcome.actions, vec![DialogueAction::RecordRating(5)]);
    }

    #[test]
    fn skip_ends_feedback_without_forwarding() {
        let outcome = step(DialogueState::FeedbackComment, "skip", &no_scratch());
        assert_eq!(outcome.next, DialogueState::Idle);
        assert_eq!(outcome.prompts, vec![Prompt::FeedbackThanks]);
        assert!(outcome.actions.is_empty());
    }

    #[test]
    fn feedback_comment_is_forwarded_then_ends() {
        let outcome = step(DialogueState::FeedbackComment, "love the stickers", &no_scratch());
        assert_eq!(outcome.next, DialogueState::Idle);
        assert_eq!(
            outcome.actions,
            vec![DialogueAction::ForwardFeedback { text: "love the stickers".to_owned() }]
        );
    }
}
