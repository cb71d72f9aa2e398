//! The bounded agent loop: call model → dispatch tools → call model again.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::adapter::AdapterRegistry;
use crate::config::TurnConfig;
use crate::error::{DrummerError, Result};
use crate::model::{call_with_adapters, CallMeta, ModelCallRequest, ModelCaller};
use crate::tools::{partition_tools, DisabledTool, Tool, ToolDispatcher};
use crate::types::{ModelMessage, ToolCall, TurnEvent, Usage};

/// Callback used to stream turn events as they occur.
pub type EventSink = Arc<dyn Fn(TurnEvent) + Send + Sync>;

/// Per-turn correlation data threaded through the loop.
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub conversation_id: String,
    pub request_id: String,
    pub turn_id: Uuid,
    pub cancel: CancellationToken,
}

impl TurnContext {
    pub fn new(conversation_id: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            request_id: request_id.into(),
            turn_id: Uuid::new_v4(),
            cancel: CancellationToken::new(),
        }
    }
}

/// Result of one harness pass.
#[derive(Debug, Clone)]
pub struct HarnessOutput {
    /// The running transcript, excluding the system prompt and excluding
    /// the final no-tool-call assistant message (see [`Harness::run`]).
    pub transcript: Vec<ModelMessage>,
    /// Tool calls most recently requested when the iteration cap was hit;
    /// empty on a clean handoff.
    pub tool_calls: Vec<ToolCall>,
    pub usage: Usage,
    pub done: bool,
}

/// Runs the call→dispatch→call cycle for one reasoning pass.
pub struct Harness {
    caller: Arc<dyn ModelCaller>,
    adapters: Arc<AdapterRegistry>,
    tools: Vec<Arc<dyn Tool>>,
    model: String,
    config: TurnConfig,
    event_sink: Option<EventSink>,
    trace_name: String,
}

impl Harness {
    pub fn new(
        caller: Arc<dyn ModelCaller>,
        adapters: Arc<AdapterRegistry>,
        tools: Vec<Arc<dyn Tool>>,
        model: impl Into<String>,
        config: TurnConfig,
    ) -> Self {
        Self {
            caller,
            adapters,
            tools,
            model: model.into(),
            config,
            event_sink: None,
            trace_name: "intent".to_string(),
        }
    }

    pub fn with_event_sink(mut self, sink: EventSink) -> Self {
        self.event_sink = Some(sink);
        self
    }

    pub fn with_trace_name(mut self, name: impl Into<String>) -> Self {
        self.trace_name = name.into();
        self
    }

    fn emit(&self, event: TurnEvent) {
        if let Some(sink) = &self.event_sink {
            (sink)(event);
        }
    }

    /// Run the loop until the model stops requesting tools or the iteration
    /// cap is reached.
    ///
    /// When the model returns no tool calls the pass hands off: the
    /// just-produced assistant message is not kept in the transcript, since
    /// the routing pass's text is not user-visible. The caller proceeds to
    /// the response stage instead.
    pub async fn run(
        &self,
        ctx: &TurnContext,
        system_prompt: &str,
        messages: Vec<ModelMessage>,
    ) -> Result<HarnessOutput> {
        let (available, disabled) = partition_tools(&self.tools);
        let dispatcher = ToolDispatcher::new(
            &available,
            Duration::from_millis(self.config.tool_timeout_ms),
        );
        let tool_defs = dispatcher.definitions();
        let prompt = build_system_prompt(system_prompt, &disabled);
        let model_timeout = Duration::from_millis(self.config.model_timeout_ms);

        let mut transcript = messages;
        let mut usage = Usage::default();
        let mut last_calls: Vec<ToolCall> = Vec::new();

        for iteration in 1..=self.config.max_intent_iterations {
            let mut request_messages = Vec::with_capacity(transcript.len() + 1);
            request_messages.push(ModelMessage::system(&prompt));
            request_messages.extend(transcript.iter().cloned());

            let request = ModelCallRequest {
                model: self.model.clone(),
                messages: request_messages,
                tools: tool_defs.clone(),
                meta: CallMeta {
                    conversation_id: ctx.conversation_id.clone(),
                    request_id: ctx.request_id.clone(),
                    turn_id: ctx.turn_id,
                    trace_name: self.trace_name.clone(),
                },
            };

            let response = call_with_adapters(
                &self.adapters,
                self.caller.as_ref(),
                request,
                model_timeout,
                &ctx.cancel,
            )
            .await?;

            if let Some(call_usage) = &response.usage {
                usage.merge(call_usage);
            }

            tracing::debug!(
                turn_id = %ctx.turn_id,
                iteration,
                tool_calls = response.tool_calls.len(),
                text_len = response.text.len(),
                "harness iteration complete"
            );

            if response.tool_calls.is_empty() {
                return Ok(HarnessOutput {
                    transcript,
                    tool_calls: vec![],
                    usage,
                    done: true,
                });
            }

            transcript.push(response.message.clone());
            last_calls = response.tool_calls.clone();

            for call in &last_calls {
                self.emit(TurnEvent::ToolCallStarted { call: call.clone() });
            }

            // Sibling calls run concurrently; all responses are collected
            // before the next model call.
            let outcomes = tokio::select! {
                _ = ctx.cancel.cancelled() => return Err(DrummerError::Canceled),
                outcomes = dispatcher.dispatch_all(&last_calls) => outcomes,
            };
            for outcome in outcomes {
                self.emit(TurnEvent::ToolCallCompleted {
                    result: outcome.result.clone(),
                    latency_ms: outcome.latency_ms,
                });
                transcript.push(outcome.message);
            }
        }

        tracing::warn!(
            turn_id = %ctx.turn_id,
            max = self.config.max_intent_iterations,
            "harness hit iteration cap"
        );
        Ok(HarnessOutput {
            transcript,
            tool_calls: last_calls,
            usage,
            done: true,
        })
    }
}

fn build_system_prompt(base: &str, disabled: &[DisabledTool]) -> String {
    if disabled.is_empty() {
        return base.to_string();
    }
    let mut prompt = String::from(base);
    prompt.push_str("\n\nThe following tools are currently unavailable and must not be called:\n");
    for tool in disabled {
        prompt.push_str(&format!("- {}: {}\n", tool.name, tool.reason));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_lists_disabled_tools() {
        let disabled = vec![DisabledTool {
            name: "lights".to_string(),
            reason: "missing hub address".to_string(),
        }];
        let prompt = build_system_prompt("You are an assistant.", &disabled);
        assert!(prompt.starts_with("You are an assistant."));
        assert!(prompt.contains("lights: missing hub address"));
    }

    #[test]
    fn system_prompt_unchanged_without_disabled_tools() {
        let prompt = build_system_prompt("You are an assistant.", &[]);
        assert_eq!(prompt, "You are an assistant.");
    }
}
