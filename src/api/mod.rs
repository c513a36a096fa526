//! API Module
//!
//! Chat completion request types and prompt sizing.

pub mod payload;

pub use payload::{analyze, ChatPayload, ContentPart, Message, MessageContent, USER_ROLE};
