//! Record-keeper interface: the external sink for turn lifecycle data.
//!
//! The orchestrator calls this unconditionally at turn boundaries. Sink
//! failures are logged and swallowed; they must never fail the turn.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;

/// Terminal status of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    Ok,
    Error,
}

/// What gets recorded when a turn ends.
#[derive(Debug, Clone)]
pub struct TurnRecord {
    pub status: TurnStatus,
    pub latency_ms: u64,
    /// Error category when `status` is `Error`; cancellation carries its
    /// own type and is never folded into generic failures.
    pub error_type: Option<String>,
}

/// Persistence/analytics collaborator consumed by the orchestrator.
#[async_trait]
pub trait RecordKeeper: Send + Sync {
    async fn start_turn(&self, conversation_id: &str, request_id: &str) -> Result<Uuid>;
    async fn end_turn(&self, turn_id: Uuid, record: TurnRecord) -> Result<()>;
    async fn complete_request(&self, request_id: &str, latency_ms: u64) -> Result<()>;
}

/// Record keeper that discards everything.
pub struct NoopRecordKeeper;

#[async_trait]
impl RecordKeeper for NoopRecordKeeper {
    async fn start_turn(&self, _conversation_id: &str, _request_id: &str) -> Result<Uuid> {
        Ok(Uuid::new_v4())
    }

    async fn end_turn(&self, _turn_id: Uuid, _record: TurnRecord) -> Result<()> {
        Ok(())
    }

    async fn complete_request(&self, _request_id: &str, _latency_ms: u64) -> Result<()> {
        Ok(())
    }
}
