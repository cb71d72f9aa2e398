//! Convenience re-exports for common use.

pub use crate::adapter::{AdapterRegistry, ModelAdapter, ShortIdAdapter};
pub use crate::config::TurnConfig;
pub use crate::error::{DrummerError, ErrorCategory, Result};
pub use crate::harness::{Harness, HarnessOutput, TurnContext};
pub use crate::model::{CallMeta, ModelCallRequest, ModelCaller, ModelResponse};
pub use crate::orchestrator::{TurnHandle, TurnOrchestrator, TurnOutcome};
pub use crate::record::{NoopRecordKeeper, RecordKeeper, TurnRecord, TurnStatus};
pub use crate::tools::{ConfigCheck, Tool, ToolDefinition, ToolDispatcher};
pub use crate::types::{
    ContentPart, ModelMessage, Role, ToolCall, ToolResult, TurnEvent, TurnEventEnvelope, Usage,
};
pub use crate::wire::{ChatCompletion, ChatCompletionChunk, StreamFrame, WireOptions};
