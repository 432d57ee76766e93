//! Circular, keyed selector with a single movable cursor.
//!
//! The ring is built once and never mutated afterwards; only the cursor moves.
//! An empty ring is a valid state (no sessions installed) rather than an error.

use std::collections::HashSet;

use tracing::warn;

/// A single entry in a [`FocusRing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingEntry<T> {
    key: String,
    value: T,
    display: String,
}

impl<T> RingEntry<T> {
    /// Unique key identifying this entry.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The wrapped value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Human-readable label for this entry.
    pub fn display(&self) -> &str {
        &self.display
    }
}

/// Ordered, insertion-preserving ring of uniquely keyed entries.
#[derive(Debug, Clone)]
pub struct FocusRing<T> {
    entries: Vec<RingEntry<T>>,
    cursor: usize,
}

impl<T> Default for FocusRing<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
        }
    }
}

impl<T> FocusRing<T> {
    /// Build a ring whose display labels are the keys themselves.
    pub fn build<I, K>(items: I, key_fn: K) -> Self
    where
        I: IntoIterator<Item = T>,
        K: Fn(&T) -> String,
    {
        Self::build_labeled(items, &key_fn, &key_fn)
    }

    /// Build a ring with separate key and display projections.
    ///
    /// Keys must be unique. When two items project to the same key the first
    /// one is kept and the collision is logged.
    pub fn build_labeled<I, K, D>(items: I, key_fn: K, display_fn: D) -> Self
    where
        I: IntoIterator<Item = T>,
        K: Fn(&T) -> String,
        D: Fn(&T) -> String,
    {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for value in items {
            let key = key_fn(&value);
            if !seen.insert(key.clone()) {
                warn!("Duplicate focus ring key '{}', keeping first occurrence", key);
                continue;
            }
            let display = display_fn(&value);
            entries.push(RingEntry {
                key,
                value,
                display,
            });
        }

        Self { entries, cursor: 0 }
    }

    /// Number of entries in the ring.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the ring holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current cursor position. Always 0 for an empty ring.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Entry under the cursor, or `None` if the ring is empty.
    pub fn current(&self) -> Option<&RingEntry<T>> {
        self.entries.get(self.cursor)
    }

    /// Advance the cursor one position (wrapping) and return the new entry.
    pub fn next(&mut self) -> Option<&RingEntry<T>> {
        if self.entries.is_empty() {
            return None;
        }
        self.cursor = (self.cursor + 1) % self.entries.len();
        self.current()
    }

    /// Move the cursor back one position (wrapping) and return the new entry.
    pub fn previous(&mut self) -> Option<&RingEntry<T>> {
        if self.entries.is_empty() {
            return None;
        }
        self.cursor = if self.cursor == 0 {
            self.entries.len() - 1
        } else {
            self.cursor - 1
        };
        self.current()
    }

    /// Move the cursor to the entry with the given key.
    ///
    /// Returns false and leaves the cursor untouched if no entry matches.
    pub fn scroll_to(&mut self, key: &str) -> bool {
        match self.entries.iter().position(|entry| entry.key == key) {
            Some(index) => {
                self.cursor = index;
                true
            }
            None => false,
        }
    }

    /// Look up an entry by key without moving the cursor.
    pub fn get(&self, key: &str) -> Option<&RingEntry<T>> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    /// Iterate entries in ring order, starting at index 0.
    pub fn iter(&self) -> impl Iterator<Item = &RingEntry<T>> {
        self.entries.iter()
    }
}
