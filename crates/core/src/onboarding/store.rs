//! Durable answer storage behind a key-value port.

use std::collections::HashMap;

use serde_json::Value;

use super::answers::Answers;

/// Fixed key the answer blob lives under.
pub const ANSWERS_KEY: &str = "onboarding_v1";

/// A string key-value store that outlives a page render.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
}

/// In-process store, used by tests and as the storefront's per-request snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_entry(mut self, key: &str, value: impl Into<String>) -> Self {
        self.entries.insert(key.to_string(), value.into());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }
}

/// Reads and writes the answer blob under [`ANSWERS_KEY`].
#[derive(Debug, Clone, Default)]
pub struct AnswerStore<S> {
    store: S,
}

impl<S: KeyValueStore> AnswerStore<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Current answers; missing or corrupt blobs read as empty.
    #[must_use]
    pub fn load(&self) -> Answers {
        self.store
            .get(ANSWERS_KEY)
            .map(|raw| Answers::from_json(&raw))
            .unwrap_or_default()
    }

    pub fn save(&mut self, answers: &Answers) {
        self.store.set(ANSWERS_KEY, answers.to_json());
    }

    /// Read-modify-write of a single answer.
    pub fn save_field(&mut self, path: &str, value: Value) {
        let mut answers = self.load();
        answers.set(path, value);
        self.save(&answers);
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}
