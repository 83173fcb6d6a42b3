pub mod engine;
pub mod states;

pub use engine::step;
pub use states::{
    DialogueAction, DialogueState, ProductCategory, Prompt, ScratchSnapshot, StepOutcome,
};
