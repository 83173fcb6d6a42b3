use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Closed set of dialogue positions. `Idle` maps to a NULL durable state
/// label; every other variant round-trips through `as_label`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialogueState {
    Idle,
    ContactingAdmin,
    SelectingProductCategory,
    SelectingDigitalProduct,
    SelectingPhysicalProduct,
    SelectingService,
    CreatingOrder,
    FeedbackRating,
    FeedbackComment,
}

impl DialogueState {
    pub fn as_label(&self) -> Option<&'static str> {
        match self {
            Self::Idle => None,
            Self::ContactingAdmin => Some("contacting_admin"),
            Self::SelectingProductCategory => Some("selecting_product_category"),
            Self::SelectingDigitalProduct => Some("selecting_digital_product"),
            Self::SelectingPhysicalProduct => Some("selecting_physical_product"),
            Self::SelectingService => Some("selecting_service"),
            Self::CreatingOrder => Some("creating_order"),
            Self::FeedbackRating => Some("feedback_rating"),
            Self::FeedbackComment => Some("feedback_comment"),
        }
    }

    pub fn from_label(label: Option<&str>) -> Result<Self, DomainError> {
        match label {
            None => Ok(Self::Idle),
            Some("contacting_admin") => Ok(Self::ContactingAdmin),
            Some("selecting_product_category") => Ok(Self::SelectingProductCategory),
            Some("selecting_digital_product") => Ok(Self::SelectingDigitalProduct),
            Some("selecting_physical_product") => Ok(Self::SelectingPhysicalProduct),
            Some("selecting_service") => Ok(Self::SelectingService),
            Some("creating_order") => Ok(Self::CreatingOrder),
            Some("feedback_rating") => Ok(Self::FeedbackRating),
            Some("feedback_comment") => Ok(Self::FeedbackComment),
            Some(other) => Err(DomainError::UnknownStateLabel(other.to_owned())),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductCategory {
    Digital,
    Physical,
    Service,
}

impl ProductCategory {
    pub const ALL: [Self; 3] = [Self::Digital, Self::Physical, Self::Service];

    /// Label shown on the category menu keyboard.
    pub fn menu_label(&self) -> &'static str {
        match self {
            Self::Digital => "Digital",
            Self::Physical => "Physical",
            Self::Service => "Services",
        }
    }

    /// Prefix used when composing the scratch `product_type` string.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Digital => "Digital",
            Self::Physical => "Physical",
            Self::Service => "Service",
        }
    }

    pub fn items(&self) -> &'static [&'static str] {
        match self {
            Self::Digital => &["Accounts", "Licenses", "Gift Cards"],
            Self::Physical => &["Merch", "Hardware", "Stickers"],
            Self::Service => &["Setup", "Consulting", "Custom Work"],
        }
    }

    pub fn selecting_state(&self) -> DialogueState {
        match self {
            Self::Digital => DialogueState::SelectingDigitalProduct,
            Self::Physical => DialogueState::SelectingPhysicalProduct,
            Self::Service => DialogueState::SelectingService,
        }
    }

    pub fn matches_input(&self, input: &str) -> bool {
        input.eq_ignore_ascii_case(self.menu_label()) || input.eq_ignore_ascii_case(self.prefix())
    }

    /// Composes the `product_type` scratch value for a chosen item.
    pub fn product_type(&self, item: &str) -> String {
        format!("{} – {}", self.prefix(), item)
    }
}

/// Semantic reply emitted by the transition table. The chat crate renders
/// these to text and reply keyboards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Prompt {
    Welcome,
    MainMenu,
    Help,
    Cancelled,
    CategoryMenu,
    CategoryReprompt,
    ItemMenu(ProductCategory),
    ItemReprompt(ProductCategory),
    OrderDetails,
    RatingPrompt,
    RatingReprompt,
    CommentPrompt,
    FeedbackThanks,
    SupportIntro,
}

/// Side effect requested by a transition; the router applies these.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DialogueAction {
    SetProductType(String),
    RecordRating(u8),
    CommitOrder { details: String },
    ForwardFeedback { text: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepOutcome {
    pub next: DialogueState,
    pub prompts: Vec<Prompt>,
    pub actions: Vec<DialogueAction>,
}

impl StepOutcome {
    pub fn stay(state: DialogueState, prompts: Vec<Prompt>) -> Self {
        Self { next: state, prompts, actions: Vec::new() }
    }

    pub fn transition(next: DialogueState, prompts: Vec<Prompt>) -> Self {
        Self { next, prompts, actions: Vec::new() }
    }

    pub fn with_action(mut self, action: DialogueAction) -> Self {
        self.actions.push(action);
        self
    }
}

/// Read-only view of the transient scratch data the transition table needs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScratchSnapshot {
    pub product_type: Option<String>,
}
