#![forbid(unsafe_code)]

//! Core review logic for the LingoPet vocabulary trainer.
//!
//! This crate provides:
//! - Domain types (words, schedule state, review modes)
//! - Spaced-repetition scheduler
//! - Review session engine (passive playback and active recall)
//! - Media collaborator traits and the daily illustration cache
//! - Persistence (key-value store, review log, daily stats)
//! - Word selection for due and newly added words

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod clock;
pub mod scheduler;
pub mod store;
pub mod repository;
pub mod stats;
pub mod review_log;
pub mod selection;
pub mod media;
pub mod illustration;
pub mod queue;
mod playback;
pub mod engine;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::{Config, SessionSettings};
pub use clock::{Clock, FixedClock, SystemClock};
pub use scheduler::{calc_next_review, ScheduleUpdate};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore, UpdateFn};
pub use repository::WordRepository;
pub use review_log::{JsonlReviewLog, ReviewSink};
pub use media::{IllustrationRequest, ImageSurface, Illustrator, Narrator};
pub use engine::{start_session, Collaborators, SessionEvent, SessionHandle, SessionSnapshot};
