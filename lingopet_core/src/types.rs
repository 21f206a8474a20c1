//! Core domain types for LingoPet reviews.
//!
//! This module defines the fundamental types used throughout the system:
//! - Word entries and their persisted scheduling state
//! - Partial updates applied to stored words
//! - Review modes and per-card presentation state
//! - Image handles produced by the illustration backend

use chrono::serde::{ts_milliseconds, ts_milliseconds_option};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Word Types
// ============================================================================

/// A learnable word with its content, schedule and cached illustration
///
/// Serialized with camelCase keys and millisecond timestamps so records
/// round-trip with the browser app's storage format.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WordEntry {
    pub id: Uuid,
    pub word: String,
    pub definition: String,
    pub translation: String,
    pub example: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_scene: Option<String>,
    #[serde(with = "ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    /// Mastery rank, 0 = unseen or just failed
    #[serde(default)]
    pub review_level: i32,
    /// Total times reviewed, independent of mastery
    #[serde(default)]
    pub review_count: u32,
    #[serde(default, with = "ts_milliseconds_option")]
    pub last_reviewed_at: Option<DateTime<Utc>>,
    #[serde(with = "ts_milliseconds")]
    pub next_review_date: DateTime<Utc>,

    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub today_image: Option<CachedIllustration>,
}

/// An illustration generated for a specific calendar day
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CachedIllustration {
    #[serde(rename = "todayImage")]
    pub image: String,
    #[serde(rename = "todayImageDate")]
    pub date: NaiveDate,
}

impl WordEntry {
    /// Create an unseen word that is due immediately
    pub fn new(
        word: impl Into<String>,
        definition: impl Into<String>,
        translation: impl Into<String>,
        example: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            word: word.into(),
            definition: definition.into(),
            translation: translation.into(),
            example: example.into(),
            visual_scene: None,
            created_at: now,
            review_level: 0,
            review_count: 0,
            last_reviewed_at: None,
            next_review_date: now,
            today_image: None,
        }
    }

    /// A word is due once its next review date has passed
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_review_date
    }

    /// The cached illustration, if it was generated for `today`
    pub fn cached_image_for(&self, today: NaiveDate) -> Option<&str> {
        self.today_image
            .as_ref()
            .filter(|cached| cached.date == today)
            .map(|cached| cached.image.as_str())
    }
}

/// Partial update merged into a stored word
///
/// Fields left as `None` are not touched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WordPatch {
    pub review_level: Option<i32>,
    pub review_count: Option<u32>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub next_review_date: Option<DateTime<Utc>>,
    pub today_image: Option<CachedIllustration>,
}

impl WordPatch {
    /// Merge this patch into a word
    pub fn apply(&self, word: &mut WordEntry) {
        if let Some(level) = self.review_level {
            word.review_level = level;
        }
        if let Some(count) = self.review_count {
            word.review_count = count;
        }
        if let Some(at) = self.last_reviewed_at {
            word.last_reviewed_at = Some(at);
        }
        if let Some(next) = self.next_review_date {
            word.next_review_date = next;
        }
        if let Some(ref cached) = self.today_image {
            word.today_image = Some(cached.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// ============================================================================
// Session Types
// ============================================================================

/// Presentation style of a review session, fixed for its lifetime
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewMode {
    /// Auto-advancing narration and illustration playback
    Passive,
    /// Learner grades each card as recalled or not
    Active,
}

impl FromStr for ReviewMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "passive" | "listen" => Ok(ReviewMode::Passive),
            "active" | "recall" => Ok(ReviewMode::Active),
            other => Err(crate::Error::Other(format!("Unknown review mode: {}", other))),
        }
    }
}

impl fmt::Display for ReviewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewMode::Passive => write!(f, "passive"),
            ReviewMode::Active => write!(f, "active"),
        }
    }
}

/// Reference to an illustration that can be shown on a card
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "src", rename_all = "snake_case")]
pub enum ImageHandle {
    /// A generated or cached image (URL or data URI)
    Image(String),
    /// Stand-in art used when generation failed
    Placeholder(String),
}

impl ImageHandle {
    pub fn placeholder_for(headword: &str) -> Self {
        ImageHandle::Placeholder(format!("placeholder:{}", headword))
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, ImageHandle::Placeholder(_))
    }
}

impl fmt::Display for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageHandle::Image(src) => write!(f, "{}", src),
            ImageHandle::Placeholder(src) => write!(f, "[placeholder] {}", src),
        }
    }
}

/// Transient presentation state of the card currently shown
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardState {
    pub revealed: bool,
    pub image: Option<ImageHandle>,
    pub loading: bool,
}

impl Default for CardState {
    fn default() -> Self {
        Self {
            revealed: false,
            image: None,
            loading: true,
        }
    }
}

impl CardState {
    /// Hide the illustration, drop the image and show the loading indicator
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
