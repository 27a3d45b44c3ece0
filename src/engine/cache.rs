// src/engine/cache.rs

use dashmap::DashMap;
use tracing::debug;

use crate::model::ActionKey;

/// What the executor remembers about an action's last execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionState {
    /// Digests of the outputs the execution produced.
    pub output_digests: Vec<String>,
}

/// Cache of per-action execution state.
///
/// A cached entry short-circuits re-execution, so every action restarted by
/// a rewind must have its entry evicted first.
#[derive(Debug, Default)]
pub struct ActionStateCache {
    states: DashMap<ActionKey, ActionState>,
}

impl ActionStateCache {
    pub fn new() -> Self {
        Self {
            states: DashMap::new(),
        }
    }

    pub fn record(&self, key: ActionKey, state: ActionState) {
        debug!(action = %key, "caching action execution state");
        self.states.insert(key, state);
    }

    pub fn get(&self, key: &ActionKey) -> Option<ActionState> {
        self.states.get(key).map(|s| s.value().clone())
    }

    pub fn contains(&self, key: &ActionKey) -> bool {
        self.states.contains_key(key)
    }

    /// Drop the cached state of an action. Returns `true` if there was one.
    pub fn evict(&self, key: &ActionKey) -> bool {
        let evicted = self.states.remove(key).is_some();
        if evicted {
            debug!(action = %key, "evicted cached action execution state");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn clear(&self) {
        self.states.clear();
    }
}
