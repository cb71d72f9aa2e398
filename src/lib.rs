//! Drummer is the orchestration core for an LLM-backed assistant.
//!
//! Drives the multi-turn "call model → dispatch tools → call model again"
//! loop, normalizes provider quirks through pre/post-call adapters, and
//! converts the resulting event stream into an OpenAI-compatible
//! incremental wire format.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use drummer::prelude::*;
//!
//! # async fn example(caller: Arc<dyn ModelCaller>) {
//! let adapters = Arc::new(AdapterRegistry::with_builtins());
//! let config = TurnConfig::new("mistral-small-latest", "mistral-large-latest");
//! let orchestrator = TurnOrchestrator::new(
//!     caller,
//!     adapters,
//!     vec![],
//!     Arc::new(NoopRecordKeeper),
//!     config,
//! );
//!
//! let mut handle = orchestrator.start_turn(
//!     "conv-1",
//!     "req-1",
//!     "You are a helpful assistant.",
//!     vec![ModelMessage::user("Hello!")],
//! );
//! let _events = handle.take_events();
//! let outcome = handle.outcome().await;
//! # let _ = outcome;
//! # }
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod harness;
pub mod model;
pub mod orchestrator;
pub mod prelude;
pub mod record;
pub mod tools;
pub mod types;
pub mod util;
pub mod wire;
