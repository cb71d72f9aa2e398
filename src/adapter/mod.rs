//! Per-provider model adapters and their registry.
//!
//! An adapter normalizes a provider quirk: it transforms the outgoing
//! message list before a model call and reverses the transform on the
//! response. Adapter state is allocated fresh inside every [`ModelAdapter::adapt`]
//! call and handed back read-only to [`ModelAdapter::adapt_back`], so
//! concurrent turns never observe each other's rewrites.

pub mod short_id;

use std::collections::HashMap;
use std::sync::Arc;

use crate::model::ModelResponse;
use crate::types::ModelMessage;

pub use short_id::ShortIdAdapter;

/// The unit an adapter transforms going into a model call.
#[derive(Debug, Clone)]
pub struct AdapterCallInfo {
    pub model: String,
    pub messages: Vec<ModelMessage>,
}

/// Per-call adapter state: a bidirectional tool-call-id map.
///
/// Owned by the adapter for exactly one adapt/adapt_back pair.
#[derive(Debug, Clone, Default)]
pub struct AdapterState {
    forward: HashMap<String, String>,
    reverse: HashMap<String, String>,
}

impl AdapterState {
    /// Record a mapping from an original id to its rewritten form.
    pub fn insert(&mut self, original: String, rewritten: String) {
        self.forward.insert(original.clone(), rewritten.clone());
        self.reverse.insert(rewritten, original);
    }

    /// Look up the rewritten form of an original id.
    pub fn rewritten(&self, original: &str) -> Option<&str> {
        self.forward.get(original).map(|s| s.as_str())
    }

    /// Look up the original id for a rewritten form.
    pub fn original(&self, rewritten: &str) -> Option<&str> {
        self.reverse.get(rewritten).map(|s| s.as_str())
    }

    /// Whether the rewritten id is already taken within this call.
    pub fn is_taken(&self, rewritten: &str) -> bool {
        self.reverse.contains_key(rewritten)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

/// A pre/post transform around model calls for one provider family.
pub trait ModelAdapter: Send + Sync {
    /// Adapter name, for logging.
    fn name(&self) -> &str;

    /// Whether this adapter handles the given model name.
    fn applies_to(&self, model: &str) -> bool;

    /// Transform the outgoing call, returning the per-call state needed to
    /// reverse the transform.
    fn adapt(&self, call: AdapterCallInfo) -> (AdapterCallInfo, AdapterState) {
        (call, AdapterState::default())
    }

    /// Reverse the transform on the model response.
    fn adapt_back(&self, response: ModelResponse, state: &AdapterState) -> ModelResponse {
        let _ = state;
        response
    }
}

/// Hook invoked after every [`AdapterRegistry::clear`] so built-in adapters
/// survive a reset.
pub type AutoRegisterFn = Arc<dyn Fn(&mut AdapterRegistry) + Send + Sync>;

/// Registry of model adapters.
///
/// Selection picks the first registered adapter whose `applies_to` matches;
/// at most one adapter applies per call.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn ModelAdapter>>,
    auto_register: Option<AutoRegisterFn>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in adapters auto-registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.set_auto_register(Arc::new(|registry| {
            registry.register(Arc::new(ShortIdAdapter::new()));
        }));
        registry
    }

    /// Append an adapter. Registration order is selection priority.
    pub fn register(&mut self, adapter: Arc<dyn ModelAdapter>) {
        self.adapters.push(adapter);
    }

    /// All registered adapters, in priority order.
    pub fn all(&self) -> &[Arc<dyn ModelAdapter>] {
        &self.adapters
    }

    /// Remove all adapters, then re-run the auto-register hook if one is set.
    pub fn clear(&mut self) {
        self.adapters.clear();
        if let Some(hook) = self.auto_register.clone() {
            hook(self);
        }
    }

    /// Install the auto-register hook and run it immediately.
    pub fn set_auto_register(&mut self, hook: AutoRegisterFn) {
        hook(self);
        self.auto_register = Some(hook);
    }

    /// First adapter applicable to the given model name, if any.
    pub fn adapter_for(&self, model: &str) -> Option<Arc<dyn ModelAdapter>> {
        self.adapters
            .iter()
            .find(|a| a.applies_to(model))
            .cloned()
    }
}
