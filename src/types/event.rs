//! Turn event stream types.
//!
//! Events are emitted in occurrence order by the orchestrator and consumed
//! exactly once, in that order, by the wire transform.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::{ToolCall, ToolResult};
use super::usage::Usage;

/// A single event produced while running a turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// Incremental user-visible text.
    Token { text: String },
    /// A tool invocation is starting.
    ToolCallStarted { call: ToolCall },
    /// A tool invocation finished (successfully or not).
    ToolCallCompleted { result: ToolResult, latency_ms: u64 },
    /// The turn finished; carries summed usage across all model calls.
    TurnComplete { usage: Usage },
    /// The turn failed. `category` is a stable machine-readable string.
    Error { category: String, message: String },
}

/// Envelope for streamed turn events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnEventEnvelope {
    pub turn_id: Uuid,
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub event: TurnEvent,
}
