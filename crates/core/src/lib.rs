pub mod config;
pub mod dialogue;
pub mod domain;
pub mod errors;
pub mod pricing;
pub mod reference;

pub use dialogue::{
    step, DialogueAction, DialogueState, ProductCategory, Prompt, ScratchSnapshot, StepOutcome,
};
pub use domain::alert::{AlertDirection, NewPriceAlert, PriceAlert};
pub use domain::order::{NewOrder, NewPayment, Order, OrderId, Payment, PaymentId, PaymentStatus};
pub use domain::session::{UserId, UserSession};
pub use errors::DomainError;
