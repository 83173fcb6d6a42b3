pub mod commands;
pub mod replies;
pub mod router;
pub mod transport;

pub use commands::GlobalCommand;
pub use replies::Reply;
pub use router::{MessageRouter, RouterError, ScratchEntry};
pub use transport::{
    ChatTransport, InboundMessage, Keyboard, NoopTransport, PollPolicy, PollRunner, TransportError,
};
