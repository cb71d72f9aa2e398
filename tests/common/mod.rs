//! Shared test helpers: scripted model caller, tools, recording keeper.
#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use drummer::error::{DrummerError, Result};
use drummer::model::{ModelCallRequest, ModelCaller, ModelResponse};
use drummer::record::{RecordKeeper, TurnRecord};
use drummer::tools::{ConfigCheck, Tool};
use drummer::types::{ModelMessage, ToolCall, Usage};

/// A mock caller that replays scripted responses in order and records every
/// request it receives.
pub struct MockCaller {
    responses: Mutex<Vec<ModelResponse>>,
    pub requests: Mutex<Vec<ModelCallRequest>>,
}

impl MockCaller {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a plain text response (a handoff, in harness terms).
    pub fn queue_text(&self, text: &str) {
        self.responses.lock().unwrap().push(ModelResponse {
            message: ModelMessage::assistant(text),
            text: text.to_string(),
            tool_calls: vec![],
            usage: Some(Usage::new(10, 5)),
        });
    }

    /// Queue a response requesting the given tool calls.
    pub fn queue_tool_calls(&self, calls: Vec<ToolCall>) {
        self.responses.lock().unwrap().push(ModelResponse {
            message: ModelMessage::assistant_tool_calls("", calls.clone()),
            text: String::new(),
            tool_calls: calls,
            usage: Some(Usage::new(10, 5)),
        });
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelCaller for MockCaller {
    async fn call(&self, request: ModelCallRequest) -> Result<ModelResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(DrummerError::model("mock", "no scripted response left"));
        }
        Ok(responses.remove(0))
    }
}

/// A caller that always requests another tool call, for termination tests.
pub struct RelentlessCaller {
    pub requests: Mutex<usize>,
}

impl RelentlessCaller {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.requests.lock().unwrap()
    }
}

#[async_trait]
impl ModelCaller for RelentlessCaller {
    async fn call(&self, _request: ModelCallRequest) -> Result<ModelResponse> {
        let mut count = self.requests.lock().unwrap();
        *count += 1;
        let call = ToolCall {
            id: format!("call-{count}"),
            name: "echo".to_string(),
            arguments: serde_json::json!({ "text": "again" }),
        };
        Ok(ModelResponse {
            message: ModelMessage::assistant_tool_calls("", vec![call.clone()]),
            text: String::new(),
            tool_calls: vec![call],
            usage: Some(Usage::new(10, 5)),
        })
    }
}

/// A caller that always fails.
pub struct FailingCaller;

#[async_trait]
impl ModelCaller for FailingCaller {
    async fn call(&self, request: ModelCallRequest) -> Result<ModelResponse> {
        Err(DrummerError::model(request.model, "provider unreachable"))
    }
}

/// A caller that never returns until canceled.
pub struct StalledCaller;

#[async_trait]
impl ModelCaller for StalledCaller {
    async fn call(&self, _request: ModelCallRequest) -> Result<ModelResponse> {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        Err(DrummerError::model("stalled", "unreachable"))
    }
}

/// Echoes its `text` argument back.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "Echoes back the input"
    }
    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "text": { "type": "string" } },
            "required": ["text"],
        })
    }
    async fn execute(&self, args: &serde_json::Value) -> Result<serde_json::Value> {
        Ok(serde_json::json!({ "text": args["text"] }))
    }
}

/// Never finishes; for cancellation tests.
pub struct StallingTool;

#[async_trait]
impl Tool for StallingTool {
    fn name(&self) -> &str {
        "stall"
    }
    fn description(&self) -> &str {
        "Never finishes"
    }
    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }
    async fn execute(&self, _args: &serde_json::Value) -> Result<serde_json::Value> {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        Ok(serde_json::json!({}))
    }
}

/// Always fails at execution time.
pub struct BrokenTool;

#[async_trait]
impl Tool for BrokenTool {
    fn name(&self) -> &str {
        "broken"
    }
    fn description(&self) -> &str {
        "Always fails"
    }
    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }
    async fn execute(&self, _args: &serde_json::Value) -> Result<serde_json::Value> {
        Err(DrummerError::ToolExecution {
            tool_name: "broken".to_string(),
            message: "upstream service rejected the request".to_string(),
        })
    }
}

/// Fails its configuration check.
pub struct UnconfiguredTool;

#[async_trait]
impl Tool for UnconfiguredTool {
    fn name(&self) -> &str {
        "lights"
    }
    fn description(&self) -> &str {
        "Home lights"
    }
    fn parameters(&self) -> serde_json::Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }
    async fn execute(&self, _args: &serde_json::Value) -> Result<serde_json::Value> {
        Ok(serde_json::json!({}))
    }
    fn verify_configuration(&self) -> ConfigCheck {
        ConfigCheck::disabled("missing hub address")
    }
}

/// Record keeper that captures every call for assertions.
#[derive(Default)]
pub struct RecordingKeeper {
    pub started: Mutex<Vec<(String, String)>>,
    pub ended: Mutex<Vec<(Uuid, TurnRecord)>>,
    pub completed: Mutex<Vec<(String, u64)>>,
}

#[async_trait]
impl RecordKeeper for RecordingKeeper {
    async fn start_turn(&self, conversation_id: &str, request_id: &str) -> Result<Uuid> {
        self.started
            .lock()
            .unwrap()
            .push((conversation_id.to_string(), request_id.to_string()));
        Ok(Uuid::new_v4())
    }

    async fn end_turn(&self, turn_id: Uuid, record: TurnRecord) -> Result<()> {
        self.ended.lock().unwrap().push((turn_id, record));
        Ok(())
    }

    async fn complete_request(&self, request_id: &str, latency_ms: u64) -> Result<()> {
        self.completed
            .lock()
            .unwrap()
            .push((request_id.to_string(), latency_ms));
        Ok(())
    }
}

/// Record keeper whose sink always fails; turns must still succeed.
pub struct FaultyKeeper;

#[async_trait]
impl RecordKeeper for FaultyKeeper {
    async fn start_turn(&self, _conversation_id: &str, _request_id: &str) -> Result<Uuid> {
        Err(DrummerError::InvalidState("sink offline".to_string()))
    }

    async fn end_turn(&self, _turn_id: Uuid, _record: TurnRecord) -> Result<()> {
        Err(DrummerError::InvalidState("sink offline".to_string()))
    }

    async fn complete_request(&self, _request_id: &str, _latency_ms: u64) -> Result<()> {
        Err(DrummerError::InvalidState("sink offline".to_string()))
    }
}

pub fn tool_call(id: &str, name: &str) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: serde_json::json!({ "text": "hello" }),
    }
}
