//! per-pass memoization of literal values
//!
//! Keyed by the exact expression text. Each key owns a [OnceCell], so two branches asking for the
//! same literal at the same time share a single evaluation. A cache lives for one resolution pass
//! (one template, or one config item) and is never shared beyond it.
use crate::value::Value;
use crate::Result;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

type Slot = Arc<OnceCell<Option<Value>>>;

#[derive(Debug, Default)]
pub struct ResolutionCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, expression: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(expression.to_string()).or_default().clone()
    }

    /// Value of a finished evaluation
    ///
    /// The outer `Option` tells if `expression` is cached, the inner one is the value itself.
    pub fn get(&self, expression: &str) -> Option<Option<Value>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(expression).and_then(|slot| slot.get().cloned())
    }

    /// Return the cached value or run `init` once to produce it
    ///
    /// Failed evaluations are not stored.
    pub async fn get_or_try_insert_with<F, Fut>(&self, expression: &str, init: F) -> Result<Option<Value>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Value>>>,
    {
        let slot = self.slot(expression);
        slot.get_or_try_init(init).await.cloned()
    }

    /// Number of evaluated expressions
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
