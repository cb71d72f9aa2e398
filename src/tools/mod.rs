//! Tool contract, configuration checks, and dispatch.
//!
//! Tool failures are surfaced to the model as tool-response messages, never
//! as harness-level errors: unknown names, execution failures, and per-call
//! timeouts all synthesize an error result and the loop continues.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{ModelMessage, ToolCall, ToolResult};
use crate::util::with_timeout;

/// Tool definition sent to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Outcome of a tool's configuration check.
#[derive(Debug, Clone)]
pub struct ConfigCheck {
    pub ok: bool,
    pub reason: Option<String>,
}

impl ConfigCheck {
    pub fn ok() -> Self {
        Self {
            ok: true,
            reason: None,
        }
    }

    pub fn disabled(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason.into()),
        }
    }
}

/// Core tool trait. Implement to expose a capability to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the model calls).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's arguments.
    fn parameters(&self) -> serde_json::Value;

    /// Execute the tool with normalized arguments.
    async fn execute(&self, args: &serde_json::Value) -> Result<serde_json::Value>;

    /// Checked once per harness run; tools that fail are never offered to
    /// the model but are surfaced as disabled-with-reason for prompting.
    fn verify_configuration(&self) -> ConfigCheck {
        ConfigCheck::ok()
    }
}

impl dyn Tool {
    /// Convert to the definition shape sent to the model.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// A tool excluded from binding, with the reason it failed verification.
#[derive(Debug, Clone)]
pub struct DisabledTool {
    pub name: String,
    pub reason: String,
}

/// Partition tools into available and disabled, running each tool's
/// configuration check once.
pub fn partition_tools(
    tools: &[Arc<dyn Tool>],
) -> (Vec<Arc<dyn Tool>>, Vec<DisabledTool>) {
    let mut available = Vec::new();
    let mut disabled = Vec::new();
    for tool in tools {
        let check = tool.verify_configuration();
        if check.ok {
            available.push(tool.clone());
        } else {
            let reason = check
                .reason
                .unwrap_or_else(|| "not configured".to_string());
            tracing::debug!(tool = tool.name(), %reason, "tool disabled");
            disabled.push(DisabledTool {
                name: tool.name().to_string(),
                reason,
            });
        }
    }
    (available, disabled)
}

/// Result of dispatching one tool call.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub message: ModelMessage,
    pub result: ToolResult,
    pub latency_ms: u64,
}

/// Resolves tool calls by name and invokes them.
///
/// The name map is built once per harness run.
pub struct ToolDispatcher {
    tools: HashMap<String, Arc<dyn Tool>>,
    timeout: Duration,
}

impl ToolDispatcher {
    pub fn new(available: &[Arc<dyn Tool>], timeout: Duration) -> Self {
        let tools = available
            .iter()
            .map(|tool| (tool.name().to_string(), tool.clone()))
            .collect();
        Self { tools, timeout }
    }

    /// Definitions for all bound tools, or `None` if there are none.
    pub fn definitions(&self) -> Option<Vec<ToolDefinition>> {
        if self.tools.is_empty() {
            return None;
        }
        let mut defs: Vec<ToolDefinition> =
            self.tools.values().map(|t| t.as_ref().definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        Some(defs)
    }

    /// Dispatch a single call, always producing a tool-response message.
    pub async fn dispatch(&self, call: &ToolCall) -> DispatchOutcome {
        let start = Instant::now();
        let result = match self.tools.get(&call.name) {
            Some(tool) => {
                match with_timeout(self.timeout, tool.execute(&call.arguments)).await {
                    Ok(value) => ToolResult {
                        tool_call_id: call.id.clone(),
                        result: value,
                        is_error: false,
                    },
                    Err(err) => {
                        tracing::warn!(tool = %call.name, error = %err, "tool call failed");
                        ToolResult {
                            tool_call_id: call.id.clone(),
                            result: serde_json::json!({
                                "error": format!("Tool '{}' failed: {err}", call.name),
                            }),
                            is_error: true,
                        }
                    }
                }
            }
            None => ToolResult {
                tool_call_id: call.id.clone(),
                result: serde_json::json!({
                    "error": format!("Tool '{}' is not available", call.name),
                }),
                is_error: true,
            },
        };
        let latency_ms = start.elapsed().as_millis() as u64;
        DispatchOutcome {
            message: ModelMessage::tool_result(
                result.tool_call_id.clone(),
                result.result.clone(),
                result.is_error,
            ),
            result,
            latency_ms,
        }
    }

    /// Dispatch sibling calls concurrently and join before returning.
    /// Outcomes are ordered by call order regardless of completion order.
    pub async fn dispatch_all(&self, calls: &[ToolCall]) -> Vec<DispatchOutcome> {
        futures::future::join_all(calls.iter().map(|call| self.dispatch(call))).await
    }
}
