//! Tool-call-id compression for providers with short-id limits.
//!
//! Mistral-family endpoints reject tool-call identifiers longer than nine
//! alphanumeric characters and reject transcripts where a tool call is not
//! immediately followed by its response. This adapter compresses every
//! outgoing id to a deterministic nine-character form, reorders the
//! transcript into call/response pairs, drops orphaned calls and responses,
//! and restores original ids on the way back.

use sha2::{Digest, Sha256};

use crate::model::ModelResponse;
use crate::types::{ContentPart, ModelMessage, Role};

use super::{AdapterCallInfo, AdapterState, ModelAdapter};

/// Fixed length of a compressed tool-call id.
pub const COMPRESSED_ID_LEN: usize = 9;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub struct ShortIdAdapter;

impl ShortIdAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ShortIdAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelAdapter for ShortIdAdapter {
    fn name(&self) -> &str {
        "short-tool-call-ids"
    }

    fn applies_to(&self, model: &str) -> bool {
        model.contains("mistral") || model.contains("mixtral") || model.starts_with("codestral")
    }

    fn adapt(&self, call: AdapterCallInfo) -> (AdapterCallInfo, AdapterState) {
        // Fresh state per call; never reused across invocations.
        let mut state = AdapterState::default();

        let rewritten: Vec<ModelMessage> = call
            .messages
            .iter()
            .map(|message| rewrite_ids(message, &mut state))
            .collect();
        let paired = pair_tool_messages(&rewritten);

        (
            AdapterCallInfo {
                model: call.model,
                messages: paired,
            },
            state,
        )
    }

    fn adapt_back(&self, mut response: ModelResponse, state: &AdapterState) -> ModelResponse {
        if response.tool_calls.is_empty() {
            return response;
        }
        for call in &mut response.tool_calls {
            if let Some(original) = state.original(&call.id) {
                call.id = original.to_string();
            }
        }
        for part in &mut response.message.content {
            if let ContentPart::ToolCall(call) = part {
                if let Some(original) = state.original(&call.id) {
                    call.id = original.to_string();
                }
            }
        }
        response
    }
}

/// Rewrite every tool-call and tool-response id in the message through the
/// per-call map. Ids already within the length limit go through the same
/// path so one lookup table covers the whole transcript.
fn rewrite_ids(message: &ModelMessage, state: &mut AdapterState) -> ModelMessage {
    let mut next = message.clone();
    for part in &mut next.content {
        match part {
            ContentPart::ToolCall(call) => {
                call.id = compress_id(&call.id, state);
            }
            ContentPart::ToolResult(result) => {
                result.tool_call_id = compress_id(&result.tool_call_id, state);
            }
            ContentPart::Text { .. } => {}
        }
    }
    next
}

/// Deterministically compress an id to [`COMPRESSED_ID_LEN`] characters,
/// perturbing with a counter suffix on collision within the same call.
fn compress_id(original: &str, state: &mut AdapterState) -> String {
    if let Some(existing) = state.rewritten(original) {
        return existing.to_string();
    }

    let base = hash_to_alphabet(original);
    let mut candidate = base.clone();
    let mut counter: u64 = 0;
    while state.is_taken(&candidate) {
        counter += 1;
        let suffix = encode_alphabet(counter);
        let keep = COMPRESSED_ID_LEN.saturating_sub(suffix.len());
        candidate = format!("{}{}", &base[..keep], suffix);
        candidate.truncate(COMPRESSED_ID_LEN);
    }

    state.insert(original.to_string(), candidate.clone());
    candidate
}

/// Hash the original id and render it base-36, padded and truncated to the
/// fixed length.
fn hash_to_alphabet(original: &str) -> String {
    let digest = Sha256::digest(original.as_bytes());
    let mut value = u128::from_be_bytes(digest[..16].try_into().unwrap_or([0u8; 16]));
    let mut encoded = String::new();
    while value > 0 {
        encoded.push(ALPHABET[(value % 36) as usize] as char);
        value /= 36;
    }
    while encoded.len() < COMPRESSED_ID_LEN {
        encoded.push('0');
    }
    encoded.truncate(COMPRESSED_ID_LEN);
    encoded
}

fn encode_alphabet(mut value: u64) -> String {
    let mut out = String::new();
    loop {
        out.insert(0, ALPHABET[(value % 36) as usize] as char);
        value /= 36;
        if value == 0 {
            break;
        }
    }
    out
}

/// Reorder the transcript into a provider-acceptable shape: non-tool
/// messages pass through; an assistant tool-call message survives only when
/// every one of its calls has a matching response later in the transcript,
/// and is emitted immediately followed by those responses in call order.
/// Orphaned calls and orphaned responses are dropped, not errors; inputs
/// legitimately contain them after truncation or partial failures.
fn pair_tool_messages(messages: &[ModelMessage]) -> Vec<ModelMessage> {
    let mut out: Vec<ModelMessage> = Vec::with_capacity(messages.len());
    let mut claimed = vec![false; messages.len()];

    for (i, message) in messages.iter().enumerate() {
        if claimed[i] {
            continue;
        }
        if message.role == Role::Tool {
            // Tool responses are only emitted when claimed by their call.
            continue;
        }
        if message.role != Role::Assistant {
            out.push(message.clone());
            continue;
        }

        let calls = message.tool_calls();
        if calls.is_empty() {
            out.push(message.clone());
            continue;
        }

        let mut matched: Vec<usize> = Vec::with_capacity(calls.len());
        for call in &calls {
            let found = messages
                .iter()
                .enumerate()
                .skip(i + 1)
                .position(|(j, candidate)| {
                    candidate.role == Role::Tool
                        && !claimed[j]
                        && !matched.contains(&j)
                        && candidate.tool_result_id() == Some(call.id.as_str())
                })
                .map(|offset| i + 1 + offset);
            match found {
                Some(j) => matched.push(j),
                None => break,
            }
        }

        if matched.len() != calls.len() {
            // At least one call has no response: drop the whole message.
            continue;
        }

        out.push(message.clone());
        for j in matched {
            claimed[j] = true;
            out.push(messages[j].clone());
        }
    }

    out
}
