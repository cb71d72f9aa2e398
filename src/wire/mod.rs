//! Output transform: turn events to the OpenAI-compatible wire protocol.
//!
//! Every function here is a pure mapping over an ordered event sequence;
//! the same input always produces the same frames. Tool events are internal
//! and never map to wire output; only text deltas, completion, and errors
//! cross the boundary.

use chrono::Utc;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{TurnEvent, TurnEventEnvelope, Usage};

/// Caller-supplied identity for the emitted frames.
#[derive(Debug, Clone)]
pub struct WireOptions {
    pub completion_id: String,
    pub model: String,
    pub created: i64,
    pub include_usage: bool,
}

impl WireOptions {
    pub fn new(model: impl Into<String>, turn_id: Uuid) -> Self {
        Self {
            completion_id: format!("chatcmpl-{}", turn_id.simple()),
            model: model.into(),
            created: Utc::now().timestamp(),
            include_usage: false,
        }
    }

    pub fn with_usage(mut self) -> Self {
        self.include_usage = true;
        self
    }
}

/// Usage block in OpenAI naming.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl From<Usage> for WireUsage {
    fn from(usage: Usage) -> Self {
        Self {
            prompt_tokens: usage.input_tokens,
            completion_tokens: usage.output_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

/// One streamed chunk of an incremental response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<WireUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: ChunkDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChunkDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Fully assembled response for non-streaming callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<CompletionChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<WireUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionChoice {
    pub index: u32,
    pub message: WireMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

/// Terminal error frame for streaming clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorFrame {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A frame in the streamed response.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StreamFrame {
    Chunk(ChatCompletionChunk),
    Error(ErrorFrame),
}

fn chunk(opts: &WireOptions, delta: ChunkDelta, finish_reason: Option<String>) -> ChatCompletionChunk {
    ChatCompletionChunk {
        id: opts.completion_id.clone(),
        object: "chat.completion.chunk".to_string(),
        created: opts.created,
        model: opts.model.clone(),
        choices: vec![ChunkChoice {
            index: 0,
            delta,
            finish_reason,
        }],
        usage: None,
    }
}

fn role_chunk(opts: &WireOptions) -> ChatCompletionChunk {
    chunk(
        opts,
        ChunkDelta {
            role: Some("assistant".to_string()),
            content: Some(String::new()),
        },
        None,
    )
}

fn content_chunk(opts: &WireOptions, text: &str) -> ChatCompletionChunk {
    chunk(
        opts,
        ChunkDelta {
            role: None,
            content: Some(text.to_string()),
        },
        None,
    )
}

fn finish_chunk(opts: &WireOptions, usage: Usage) -> ChatCompletionChunk {
    let mut finish = chunk(opts, ChunkDelta::default(), Some("stop".to_string()));
    if opts.include_usage {
        finish.usage = Some(usage.into());
    }
    finish
}

fn error_frame(category: &str, message: &str) -> ErrorFrame {
    ErrorFrame {
        error: ErrorBody {
            message: message.to_string(),
            kind: category.to_string(),
        },
    }
}

/// Map a complete event sequence to stream frames.
pub fn stream_frames(events: &[TurnEventEnvelope], opts: &WireOptions) -> Vec<StreamFrame> {
    let mut frames = vec![StreamFrame::Chunk(role_chunk(opts))];
    for envelope in events {
        match &envelope.event {
            TurnEvent::Token { text } if !text.is_empty() => {
                frames.push(StreamFrame::Chunk(content_chunk(opts, text)));
            }
            TurnEvent::TurnComplete { usage } => {
                frames.push(StreamFrame::Chunk(finish_chunk(opts, *usage)));
            }
            TurnEvent::Error { category, message } => {
                frames.push(StreamFrame::Error(error_frame(category, message)));
            }
            _ => {}
        }
    }
    frames
}

/// Assemble one response object for non-streaming callers.
///
/// Returns the error frame instead when the turn ended in an error event;
/// mapping it to a non-2xx response belongs to the transport layer.
pub fn completion(
    events: &[TurnEventEnvelope],
    opts: &WireOptions,
) -> std::result::Result<ChatCompletion, ErrorFrame> {
    let mut content = String::new();
    let mut usage: Option<Usage> = None;
    for envelope in events {
        match &envelope.event {
            TurnEvent::Token { text } => content.push_str(text),
            TurnEvent::TurnComplete { usage: turn_usage } => usage = Some(*turn_usage),
            TurnEvent::Error { category, message } => {
                return Err(error_frame(category, message));
            }
            _ => {}
        }
    }
    Ok(ChatCompletion {
        id: opts.completion_id.clone(),
        object: "chat.completion".to_string(),
        created: opts.created,
        model: opts.model.clone(),
        choices: vec![CompletionChoice {
            index: 0,
            message: WireMessage {
                role: "assistant".to_string(),
                content,
            },
            finish_reason: Some("stop".to_string()),
        }],
        usage: if opts.include_usage {
            usage.map(Into::into)
        } else {
            None
        },
    })
}

/// Terminal sentinel frame for `text/event-stream` responses.
pub const SSE_DONE: &str = "data: [DONE]\n\n";

/// Render one payload as a `text/event-stream` frame.
pub fn sse_frame<T: Serialize>(payload: &T) -> String {
    let json = serde_json::to_string(payload).unwrap_or_default();
    format!("data: {json}\n\n")
}

/// Map a live event stream to SSE frames, lazily, ending with `[DONE]`.
pub fn sse_stream<S>(events: S, opts: WireOptions) -> impl Stream<Item = String>
where
    S: Stream<Item = TurnEventEnvelope> + Send + 'static,
{
    async_stream::stream! {
        yield sse_frame(&role_chunk(&opts));
        let mut inner = std::pin::pin!(events);
        while let Some(envelope) = inner.next().await {
            match envelope.event {
                TurnEvent::Token { text } if !text.is_empty() => {
                    yield sse_frame(&content_chunk(&opts, &text));
                }
                TurnEvent::TurnComplete { usage } => {
                    yield sse_frame(&finish_chunk(&opts, usage));
                    break;
                }
                TurnEvent::Error { category, message } => {
                    yield sse_frame(&error_frame(&category, &message));
                    break;
                }
                _ => {}
            }
        }
        yield SSE_DONE.to_string();
    }
}
