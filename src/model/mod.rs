//! Model caller contract and the adapter-wrapped call path.
//!
//! Concrete providers (HTTP clients, local runtimes) live outside this
//! crate and implement [`ModelCaller`]. Retry policy, if any, belongs to
//! those implementations; the harness never retries.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::adapter::{AdapterCallInfo, AdapterRegistry};
use crate::error::Result;
use crate::tools::ToolDefinition;
use crate::types::{ModelMessage, ToolCall, Usage};
use crate::util::with_timeout_and_cancel;

/// Correlation metadata carried on every model call.
#[derive(Debug, Clone)]
pub struct CallMeta {
    pub conversation_id: String,
    pub request_id: String,
    pub turn_id: Uuid,
    pub trace_name: String,
}

/// A request to invoke a single language model.
#[derive(Debug, Clone)]
pub struct ModelCallRequest {
    pub model: String,
    pub messages: Vec<ModelMessage>,
    pub tools: Option<Vec<ToolDefinition>>,
    pub meta: CallMeta,
}

/// Response from a model call.
#[derive(Debug, Clone)]
pub struct ModelResponse {
    /// The assistant message as it should appear in the transcript.
    pub message: ModelMessage,
    /// Plain text content of the response.
    pub text: String,
    /// Tool calls requested by the model, if any.
    pub tool_calls: Vec<ToolCall>,
    pub usage: Option<Usage>,
}

/// Core trait for invoking a language model.
#[async_trait]
pub trait ModelCaller: Send + Sync {
    async fn call(&self, request: ModelCallRequest) -> Result<ModelResponse>;
}

/// Invoke the caller with the applicable adapter's pre/post transforms.
///
/// At most one adapter applies per call; with none registered for the model
/// the request passes through unchanged. Adapter state lives only for the
/// duration of this call, so concurrent calls never share id maps.
pub async fn call_with_adapters(
    registry: &AdapterRegistry,
    caller: &dyn ModelCaller,
    request: ModelCallRequest,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<ModelResponse> {
    match registry.adapter_for(&request.model) {
        Some(adapter) => {
            let call = AdapterCallInfo {
                model: request.model.clone(),
                messages: request.messages,
            };
            let (adapted, state) = adapter.adapt(call);
            let request = ModelCallRequest {
                model: adapted.model,
                messages: adapted.messages,
                tools: request.tools,
                meta: request.meta,
            };
            tracing::debug!(
                adapter = adapter.name(),
                model = %request.model,
                "applying model adapter"
            );
            let response = with_timeout_and_cancel(timeout, cancel, caller.call(request)).await?;
            Ok(adapter.adapt_back(response, &state))
        }
        None => with_timeout_and_cancel(timeout, cancel, caller.call(request)).await,
    }
}
