//! Bidirectional chat relay
//!
//! Participants join, send messages and leave. Every message is stamped with
//! the server time and a sender name, then relayed to all current
//! participants (the sender included). Nothing is kept: a participant only
//! sees messages sent after it joined.

pub mod message;
pub mod relay;

pub use message::{ChatMessage, InboundChat, ANONYMOUS};
pub use relay::ChatRelay;
