use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown dialogue state label `{0}`")]
    UnknownStateLabel(String),
    #[error("feedback rating {0} is outside the accepted range 1..=5")]
    RatingOutOfRange(usize),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}
