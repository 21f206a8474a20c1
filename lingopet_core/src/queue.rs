//! Ordered word queue for a single review session.
//!
//! The queue owns its own copy of the words, so reordering never touches the
//! caller's list. Entries at or before the cursor have been visited and stay
//! where they are.

use crate::WordEntry;
use rand::seq::SliceRandom;
use rand::Rng;

/// Outcome of moving the cursor forward
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueStep {
    /// The cursor now points at this position
    Next(usize),
    /// No words remain
    Exhausted,
}

#[derive(Clone, Debug)]
pub struct ReviewQueue {
    words: Vec<WordEntry>,
    cursor: usize,
}

impl ReviewQueue {
    pub fn new(words: Vec<WordEntry>) -> Self {
        Self { words, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&WordEntry> {
        self.words.get(self.cursor)
    }

    pub fn current_mut(&mut self) -> Option<&mut WordEntry> {
        self.words.get_mut(self.cursor)
    }

    /// Unvisited entries strictly after the cursor
    pub fn remaining(&self) -> &[WordEntry] {
        self.words.get(self.cursor + 1..).unwrap_or(&[])
    }

    pub fn words(&self) -> &[WordEntry] {
        &self.words
    }

    pub fn advance(&mut self) -> QueueStep {
        if self.cursor + 1 < self.words.len() {
            self.cursor += 1;
            QueueStep::Next(self.cursor)
        } else {
            QueueStep::Exhausted
        }
    }

    /// Shuffle the unvisited suffix in place
    ///
    /// Uses an unbiased Fisher-Yates permutation. Returns false (and leaves
    /// the queue unchanged) when fewer than two entries remain.
    pub fn shuffle_remaining<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        let start = self.cursor + 1;
        if self.words.len() < start + 2 {
            return false;
        }
        self.words[start..].shuffle(rng);
        true
    }
}
