//! Two-pass turn orchestration.
//!
//! A turn runs the tool-enabled intent harness to exhaustion, then feeds
//! its transcript to the response model for the user-facing text. Callers
//! get both a lazily-consumed event stream and an eventual outcome; either
//! works without the other, so non-streaming callers simply never take the
//! stream.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::adapter::AdapterRegistry;
use crate::config::TurnConfig;
use crate::error::{DrummerError, Result};
use crate::harness::{EventSink, Harness, TurnContext};
use crate::model::{call_with_adapters, CallMeta, ModelCallRequest, ModelCaller};
use crate::record::{RecordKeeper, TurnRecord, TurnStatus};
use crate::tools::Tool;
use crate::types::{ModelMessage, TurnEvent, TurnEventEnvelope, Usage};

/// Final result of a completed turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The intent-pass transcript followed by the final assistant message.
    pub final_messages: Vec<ModelMessage>,
    /// Summed usage across both harness passes.
    pub usage: Usage,
}

/// Handle for an in-flight turn.
pub struct TurnHandle {
    turn_id: Uuid,
    cancel: CancellationToken,
    events: Option<UnboundedReceiverStream<TurnEventEnvelope>>,
    outcome_rx: oneshot::Receiver<Result<TurnOutcome>>,
}

impl TurnHandle {
    pub fn turn_id(&self) -> Uuid {
        self.turn_id
    }

    /// Request cooperative cancellation of in-flight model and tool calls.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token observed by the turn's I/O, for callers wiring their own
    /// shutdown paths.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Take the event stream. Returns `None` after the first call.
    pub fn take_events(&mut self) -> Option<UnboundedReceiverStream<TurnEventEnvelope>> {
        self.events.take()
    }

    /// Wait for the turn to finish.
    pub async fn outcome(self) -> Result<TurnOutcome> {
        self.outcome_rx
            .await
            .unwrap_or(Err(DrummerError::Canceled))
    }
}

/// Composes the intent and response passes into one logical turn.
pub struct TurnOrchestrator {
    caller: Arc<dyn ModelCaller>,
    adapters: Arc<AdapterRegistry>,
    tools: Vec<Arc<dyn Tool>>,
    record: Arc<dyn RecordKeeper>,
    config: TurnConfig,
}

impl TurnOrchestrator {
    pub fn new(
        caller: Arc<dyn ModelCaller>,
        adapters: Arc<AdapterRegistry>,
        tools: Vec<Arc<dyn Tool>>,
        record: Arc<dyn RecordKeeper>,
        config: TurnConfig,
    ) -> Self {
        Self {
            caller,
            adapters,
            tools,
            record,
            config,
        }
    }

    /// Start one turn. The turn runs on a spawned task; the handle exposes
    /// its event stream, cancellation, and eventual outcome.
    pub fn start_turn(
        &self,
        conversation_id: impl Into<String>,
        request_id: impl Into<String>,
        system_prompt: impl Into<String>,
        messages: Vec<ModelMessage>,
    ) -> TurnHandle {
        let ctx = TurnContext::new(conversation_id, request_id);
        let system_prompt = system_prompt.into();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let handle = TurnHandle {
            turn_id: ctx.turn_id,
            cancel: ctx.cancel.clone(),
            events: Some(UnboundedReceiverStream::new(event_rx)),
            outcome_rx,
        };

        let caller = self.caller.clone();
        let adapters = self.adapters.clone();
        let tools = self.tools.clone();
        let record = self.record.clone();
        let config = self.config.clone();

        tokio::spawn(async move {
            let started = Instant::now();
            tracing::debug!(
                turn_id = %ctx.turn_id,
                conversation_id = %ctx.conversation_id,
                "turn start"
            );

            let record_turn_id = match record
                .start_turn(&ctx.conversation_id, &ctx.request_id)
                .await
            {
                Ok(id) => id,
                Err(err) => {
                    tracing::warn!(error = %err, "record keeper start_turn failed");
                    ctx.turn_id
                }
            };

            let emitter = Arc::new(EventEmitter::new(ctx.turn_id, event_tx));
            let result = run_turn(
                caller, adapters, tools, config, &ctx, &system_prompt, messages, &emitter,
            )
            .await;

            let latency_ms = started.elapsed().as_millis() as u64;
            let record_result = match &result {
                Ok(outcome) => {
                    emitter.emit(TurnEvent::TurnComplete {
                        usage: outcome.usage,
                    });
                    tracing::debug!(turn_id = %ctx.turn_id, latency_ms, "turn complete");
                    TurnRecord {
                        status: TurnStatus::Ok,
                        latency_ms,
                        error_type: None,
                    }
                }
                Err(err) => {
                    let category = err.category();
                    emitter.emit(TurnEvent::Error {
                        category: category.as_str().to_string(),
                        message: err.to_string(),
                    });
                    tracing::warn!(turn_id = %ctx.turn_id, error = %err, "turn failed");
                    TurnRecord {
                        status: TurnStatus::Error,
                        latency_ms,
                        error_type: Some(category.as_str().to_string()),
                    }
                }
            };

            if let Err(err) = record.end_turn(record_turn_id, record_result).await {
                tracing::warn!(error = %err, "record keeper end_turn failed");
            }
            if let Err(err) = record.complete_request(&ctx.request_id, latency_ms).await {
                tracing::warn!(error = %err, "record keeper complete_request failed");
            }

            let _ = outcome_tx.send(result);
        });

        handle
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_turn(
    caller: Arc<dyn ModelCaller>,
    adapters: Arc<AdapterRegistry>,
    tools: Vec<Arc<dyn Tool>>,
    config: TurnConfig,
    ctx: &TurnContext,
    system_prompt: &str,
    messages: Vec<ModelMessage>,
    emitter: &Arc<EventEmitter>,
) -> Result<TurnOutcome> {
    let sink: EventSink = {
        let emitter = emitter.clone();
        Arc::new(move |event| emitter.emit(event))
    };

    let harness = Harness::new(
        caller.clone(),
        adapters.clone(),
        tools,
        config.intent_model.clone(),
        config.clone(),
    )
    .with_event_sink(sink)
    .with_trace_name("intent");

    let intent = harness.run(ctx, system_prompt, messages).await?;
    if ctx.cancel.is_cancelled() {
        return Err(DrummerError::Canceled);
    }

    let mut response_messages = Vec::with_capacity(intent.transcript.len() + 1);
    response_messages.push(ModelMessage::system(system_prompt));
    response_messages.extend(intent.transcript.iter().cloned());

    let request = ModelCallRequest {
        model: config.response_model.clone(),
        messages: response_messages,
        tools: None,
        meta: CallMeta {
            conversation_id: ctx.conversation_id.clone(),
            request_id: ctx.request_id.clone(),
            turn_id: ctx.turn_id,
            trace_name: "response".to_string(),
        },
    };
    let response = call_with_adapters(
        &adapters,
        caller.as_ref(),
        request,
        Duration::from_millis(config.model_timeout_ms),
        &ctx.cancel,
    )
    .await?;

    let mut usage = intent.usage;
    if let Some(call_usage) = &response.usage {
        usage.merge(call_usage);
    }

    emitter.emit(TurnEvent::Token {
        text: response.text.clone(),
    });

    let mut final_messages = intent.transcript;
    final_messages.push(response.message);

    Ok(TurnOutcome {
        final_messages,
        usage,
    })
}

/// Sequenced, timestamped event emission. Send failures mean the stream
/// was dropped; the outcome path stands on its own.
struct EventEmitter {
    turn_id: Uuid,
    seq: AtomicU64,
    tx: mpsc::UnboundedSender<TurnEventEnvelope>,
}

impl EventEmitter {
    fn new(turn_id: Uuid, tx: mpsc::UnboundedSender<TurnEventEnvelope>) -> Self {
        Self {
            turn_id,
            seq: AtomicU64::new(1),
            tx,
        }
    }

    fn emit(&self, event: TurnEvent) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let _ = self.tx.send(TurnEventEnvelope {
            turn_id: self.turn_id,
            seq,
            timestamp: chrono::Utc::now(),
            event,
        });
    }
}
