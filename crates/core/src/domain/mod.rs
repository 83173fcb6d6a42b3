pub mod alert;
pub mod order;
pub mod session;
