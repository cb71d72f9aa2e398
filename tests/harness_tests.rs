//! Harness loop behavior: handoff, tool dispatch, recovery, termination.

mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use drummer::adapter::AdapterRegistry;
use drummer::config::TurnConfig;
use drummer::error::DrummerError;
use drummer::harness::{Harness, TurnContext};
use drummer::tools::Tool;
use drummer::types::{ModelMessage, Role};

use common::*;

fn config() -> TurnConfig {
    TurnConfig::new("intent-model", "response-model")
}

fn harness_with(caller: Arc<dyn drummer::model::ModelCaller>, tools: Vec<Arc<dyn Tool>>) -> Harness {
    Harness::new(
        caller,
        Arc::new(AdapterRegistry::new()),
        tools,
        "intent-model",
        config(),
    )
}

#[tokio::test]
async fn handoff_excludes_assistant_message_from_transcript() {
    let caller = Arc::new(MockCaller::new());
    caller.queue_text("routing thoughts, never user-visible");
    let harness = harness_with(caller.clone(), vec![]);
    let ctx = TurnContext::new("conv", "req");

    let messages = vec![ModelMessage::user("turn on the lights")];
    let output = harness.run(&ctx, "prompt", messages.clone()).await.unwrap();

    assert!(output.done);
    assert!(output.tool_calls.is_empty());
    assert_eq!(output.transcript, messages);
}

#[tokio::test]
async fn tool_call_then_handoff_builds_paired_transcript() {
    let caller = Arc::new(MockCaller::new());
    caller.queue_tool_calls(vec![tool_call("c1", "echo")]);
    caller.queue_text("done");
    let harness = harness_with(caller.clone(), vec![Arc::new(EchoTool)]);
    let ctx = TurnContext::new("conv", "req");

    let output = harness
        .run(&ctx, "prompt", vec![ModelMessage::user("hi")])
        .await
        .unwrap();

    assert!(output.done);
    assert_eq!(caller.call_count(), 2);
    // user, assistant tool-call, tool response
    assert_eq!(output.transcript.len(), 3);
    assert_eq!(output.transcript[1].role, Role::Assistant);
    assert_eq!(output.transcript[1].tool_calls().len(), 1);
    assert_eq!(output.transcript[2].tool_result_id(), Some("c1"));
}

#[tokio::test]
async fn failing_tool_produces_failure_message_and_loop_continues() {
    let caller = Arc::new(MockCaller::new());
    caller.queue_tool_calls(vec![tool_call("c1", "broken")]);
    caller.queue_text("recovered");
    let harness = harness_with(caller.clone(), vec![Arc::new(BrokenTool)]);
    let ctx = TurnContext::new("conv", "req");

    let output = harness
        .run(&ctx, "prompt", vec![ModelMessage::user("hi")])
        .await
        .unwrap();

    // The failure reached the model as a tool message, not as an error.
    assert_eq!(caller.call_count(), 2);
    let tool_message = &output.transcript[2];
    assert_eq!(tool_message.role, Role::Tool);
    let body = serde_json::to_string(tool_message).unwrap();
    assert!(body.contains("upstream service rejected the request"));
}

#[tokio::test]
async fn unknown_tool_produces_unavailable_message_and_loop_continues() {
    let caller = Arc::new(MockCaller::new());
    caller.queue_tool_calls(vec![tool_call("c1", "nonexistent")]);
    caller.queue_text("recovered");
    let harness = harness_with(caller.clone(), vec![Arc::new(EchoTool)]);
    let ctx = TurnContext::new("conv", "req");

    let output = harness
        .run(&ctx, "prompt", vec![ModelMessage::user("hi")])
        .await
        .unwrap();

    assert_eq!(caller.call_count(), 2);
    let body = serde_json::to_string(&output.transcript[2]).unwrap();
    assert!(body.contains("not available"));
}

#[tokio::test]
async fn loop_terminates_at_iteration_cap() {
    let caller = Arc::new(RelentlessCaller::new());
    let harness = harness_with(caller.clone(), vec![Arc::new(EchoTool)]);
    let ctx = TurnContext::new("conv", "req");

    let output = harness
        .run(&ctx, "prompt", vec![ModelMessage::user("hi")])
        .await
        .unwrap();

    assert!(output.done);
    assert_eq!(caller.call_count(), 4); // default max_intent_iterations
    assert_eq!(output.tool_calls.len(), 1);
    assert_eq!(output.tool_calls[0].id, "call-4");
}

#[tokio::test]
async fn disabled_tools_are_excluded_but_surfaced_in_prompt() {
    let caller = Arc::new(MockCaller::new());
    caller.queue_text("ok");
    let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(EchoTool), Arc::new(UnconfiguredTool)];
    let harness = harness_with(caller.clone(), tools);
    let ctx = TurnContext::new("conv", "req");

    harness
        .run(&ctx, "base prompt", vec![ModelMessage::user("hi")])
        .await
        .unwrap();

    let requests = caller.requests.lock().unwrap();
    let request = &requests[0];
    let system_text = request.messages[0].text();
    assert!(system_text.contains("lights: missing hub address"));

    let bound: Vec<String> = request
        .tools
        .as_ref()
        .unwrap()
        .iter()
        .map(|t| t.name.clone())
        .collect();
    assert_eq!(bound, vec!["echo".to_string()]);
}

#[tokio::test]
async fn usage_accumulates_across_iterations() {
    let caller = Arc::new(MockCaller::new());
    caller.queue_tool_calls(vec![tool_call("c1", "echo")]);
    caller.queue_text("done");
    let harness = harness_with(caller.clone(), vec![Arc::new(EchoTool)]);
    let ctx = TurnContext::new("conv", "req");

    let output = harness
        .run(&ctx, "prompt", vec![ModelMessage::user("hi")])
        .await
        .unwrap();

    // Two calls at 10 input / 5 output each.
    assert_eq!(output.usage.input_tokens, 20);
    assert_eq!(output.usage.output_tokens, 10);
    assert_eq!(output.usage.total_tokens, 30);
}

#[tokio::test(start_paused = true)]
async fn cancel_during_tool_dispatch_aborts_the_turn() {
    let caller = Arc::new(MockCaller::new());
    caller.queue_tool_calls(vec![tool_call("c1", "stall")]);
    caller.queue_text("never reached");
    let harness = harness_with(caller.clone(), vec![Arc::new(StallingTool)]);
    let ctx = TurnContext::new("conv", "req");

    let cancel = ctx.cancel.clone();
    let canceler = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let err = harness
        .run(&ctx, "prompt", vec![ModelMessage::user("hi")])
        .await
        .unwrap_err();
    assert!(matches!(err, DrummerError::Canceled));
    // The stalled dispatch never produced a tool message or a second call.
    assert_eq!(caller.call_count(), 1);
    canceler.await.unwrap();
}

#[tokio::test]
async fn model_call_errors_propagate() {
    let harness = harness_with(Arc::new(FailingCaller), vec![]);
    let ctx = TurnContext::new("conv", "req");

    let err = harness
        .run(&ctx, "prompt", vec![ModelMessage::user("hi")])
        .await
        .unwrap_err();
    assert!(matches!(err, DrummerError::Model { .. }));
}

#[tokio::test]
async fn call_meta_carries_correlation_ids() {
    let caller = Arc::new(MockCaller::new());
    caller.queue_text("ok");
    let harness = harness_with(caller.clone(), vec![]);
    let ctx = TurnContext::new("conv-42", "req-7");

    harness
        .run(&ctx, "prompt", vec![ModelMessage::user("hi")])
        .await
        .unwrap();

    let requests = caller.requests.lock().unwrap();
    let meta = &requests[0].meta;
    assert_eq!(meta.conversation_id, "conv-42");
    assert_eq!(meta.request_id, "req-7");
    assert_eq!(meta.turn_id, ctx.turn_id);
    assert_eq!(meta.trace_name, "intent");
}
