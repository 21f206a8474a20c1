//! Word records on top of a key-value store.
//!
//! All words live under one key as a JSON array. Updates read the full
//! record, merge the changed fields and write the array back, so fields this
//! crate doesn't know about survive a round trip.

use crate::store::KeyValueStore;
use crate::{Error, Result, WordEntry, WordPatch};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

const WORDS_KEY: &str = "words";

/// Single-writer access to stored words
#[derive(Clone)]
pub struct WordRepository {
    store: Arc<dyn KeyValueStore>,
}

impl WordRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    fn load_raw(&self) -> Result<Vec<Value>> {
        words_array(self.store.get(WORDS_KEY)?)
    }

    /// Modify the raw word array in one locked read-modify-write
    fn modify_raw<T, F>(&self, modify: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<Value>) -> Result<T>,
    {
        let mut output = None;
        self.store.update(
            WORDS_KEY,
            Box::new(|current: Option<Value>| -> Result<Value> {
                let mut raw = words_array(current)?;
                output = Some(modify(&mut raw)?);
                Ok(Value::Array(raw))
            }),
        )?;
        output.ok_or_else(|| Error::Store("word update was never applied".into()))
    }

    /// All readable words, in stored order
    ///
    /// Records that fail to parse are skipped with a warning.
    pub fn list_words(&self) -> Result<Vec<WordEntry>> {
        let raw = self.load_raw()?;
        let mut words = Vec::with_capacity(raw.len());
        for (index, item) in raw.into_iter().enumerate() {
            match serde_json::from_value::<WordEntry>(item) {
                Ok(word) => words.push(word),
                Err(e) => tracing::warn!("Skipping unreadable word record {}: {}", index, e),
            }
        }
        Ok(words)
    }

    pub fn get_word(&self, id: Uuid) -> Result<WordEntry> {
        self.list_words()?
            .into_iter()
            .find(|w| w.id == id)
            .ok_or(Error::WordNotFound(id))
    }

    /// Insert a word, replacing any stored word with the same id
    pub fn insert_word(&self, word: &WordEntry) -> Result<()> {
        let value = serde_json::to_value(word)?;
        self.modify_raw(|raw| {
            match position_of(raw, word.id) {
                Some(index) => raw[index] = value,
                None => raw.push(value),
            }
            Ok(())
        })?;
        tracing::debug!("Stored word '{}' ({})", word.word, word.id);
        Ok(())
    }

    /// Merge a patch into a stored word and return the updated record
    ///
    /// The read, merge and write happen under the store's update lock, so a
    /// concurrent writer never loses this patch or has its own overwritten.
    pub fn update_word(&self, id: Uuid, patch: &WordPatch) -> Result<WordEntry> {
        let word = self.modify_raw(|raw| {
            let index = position_of(raw, id).ok_or(Error::WordNotFound(id))?;

            let mut word: WordEntry = serde_json::from_value(raw[index].clone())?;
            patch.apply(&mut word);

            let merged = serde_json::to_value(&word)?;
            match (&mut raw[index], merged) {
                (Value::Object(stored), Value::Object(fields)) => {
                    for (key, value) in fields {
                        stored.insert(key, value);
                    }
                }
                (slot, merged) => *slot = merged,
            }
            Ok(word)
        })?;
        tracing::debug!("Updated word '{}' ({})", word.word, id);
        Ok(word)
    }
}

fn words_array(stored: Option<Value>) -> Result<Vec<Value>> {
    match stored {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(Error::Store(format!(
            "expected an array under '{}', found {}",
            WORDS_KEY,
            type_name(&other)
        ))),
    }
}

fn position_of(raw: &[Value], id: Uuid) -> Option<usize> {
    let id = id.to_string();
    raw.iter()
        .position(|item| item.get("id").and_then(Value::as_str) == Some(id.as_str()))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
