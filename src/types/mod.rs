//! Core types shared across the crate.

pub mod event;
pub mod message;
pub mod usage;

pub use event::{TurnEvent, TurnEventEnvelope};
pub use message::{ContentPart, ModelMessage, Role, ToolCall, ToolResult};
pub use usage::Usage;
