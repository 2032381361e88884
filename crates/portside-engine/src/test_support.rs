//! In-memory collaborator doubles for engine tests and downstream hosts
//!
//! Available in this crate's own tests and, behind the `test-helpers`
//! feature, to dependents that drive a [`BoardsEngine`](crate::BoardsEngine)
//! in their test suites. All doubles are cheap to clone and share state
//! through the clone, so a test can keep a handle for assertions after
//! handing the double to the engine.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use portside_core::prelude::*;
use portside_core::{Board, Port};

use crate::services::{BoardDiscovery, UserNotifier};
use crate::store::ConfigStore;

/// Key/value store held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a key before the engine starts.
    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.entries.lock().unwrap().insert(key.into(), value);
    }

    /// Current contents, for assertions.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.entries.lock().unwrap().clone()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }
}

impl ConfigStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }
}

/// Discovery feed answering snapshot queries from fixed lists.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    inner: Arc<Mutex<(Vec<Board>, Vec<Port>)>>,
}

impl StaticDiscovery {
    pub fn new(boards: Vec<Board>, ports: Vec<Port>) -> Self {
        Self {
            inner: Arc::new(Mutex::new((boards, ports))),
        }
    }

    /// Replace the snapshot returned by subsequent queries.
    pub fn set_snapshot(&self, boards: Vec<Board>, ports: Vec<Port>) {
        *self.inner.lock().unwrap() = (boards, ports);
    }
}

impl BoardDiscovery for StaticDiscovery {
    async fn attached_boards(&self) -> Result<Vec<Board>> {
        Ok(self.inner.lock().unwrap().0.clone())
    }

    async fn available_ports(&self) -> Result<Vec<Port>> {
        Ok(self.inner.lock().unwrap().1.clone())
    }
}

#[derive(Debug, Default)]
struct NotifierState {
    warnings: Vec<String>,
    reply: Option<String>,
}

/// Notifier that records every warning and answers prompts with a canned
/// reply.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    inner: Arc<Mutex<NotifierState>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer subsequent prompts with the given action label.
    pub fn reply_with(&self, action: impl Into<String>) {
        self.inner.lock().unwrap().reply = Some(action.into());
    }

    /// Warnings recorded so far.
    pub fn warnings(&self) -> Vec<String> {
        self.inner.lock().unwrap().warnings.clone()
    }

    pub fn warning_count(&self) -> usize {
        self.inner.lock().unwrap().warnings.len()
    }
}

impl UserNotifier for RecordingNotifier {
    async fn warn(&self, message: &str, actions: &[&str]) -> Result<Option<String>> {
        let mut state = self.inner.lock().unwrap();
        state.warnings.push(message.to_string());
        // only a reply the prompt actually offered counts as chosen
        Ok(state
            .reply
            .clone()
            .filter(|reply| actions.contains(&reply.as_str())))
    }
}
