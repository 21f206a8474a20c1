//! Daily review counters.
//!
//! Counters belong to a calendar date and restart from zero the first time
//! they are touched on a new day.

use crate::store::KeyValueStore;
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const STATS_KEY: &str = "stats";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub date: NaiveDate,
    #[serde(default)]
    pub reviews: u32,
    #[serde(default)]
    pub words_added: u32,
}

impl DailyStats {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            reviews: 0,
            words_added: 0,
        }
    }

    /// Load today's counters, or zeroed counters if the stored ones are stale
    pub fn load(store: &dyn KeyValueStore, today: NaiveDate) -> Result<Self> {
        Ok(Self::from_stored(store.get(STATS_KEY)?, today))
    }

    fn from_stored(stored: Option<Value>, today: NaiveDate) -> Self {
        let stored = match stored {
            Some(value) => match serde_json::from_value::<DailyStats>(value) {
                Ok(stats) => Some(stats),
                Err(e) => {
                    tracing::warn!("Failed to parse daily stats: {}. Starting fresh.", e);
                    None
                }
            },
            None => None,
        };

        stored
            .filter(|stats| stats.date == today)
            .unwrap_or_else(|| Self::empty(today))
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<()> {
        store.set(STATS_KEY, serde_json::to_value(self)?)
    }

    /// Load, modify and save today's counters in one locked update
    pub fn update<F>(store: &dyn KeyValueStore, today: NaiveDate, f: F) -> Result<Self>
    where
        F: FnOnce(&mut DailyStats),
    {
        let mut updated = None;
        store.update(
            STATS_KEY,
            Box::new(|current: Option<Value>| -> Result<Value> {
                let mut stats = Self::from_stored(current, today);
                f(&mut stats);
                let value = serde_json::to_value(&stats)?;
                updated = Some(stats);
                Ok(value)
            }),
        )?;
        updated.ok_or_else(|| Error::Store("daily stats update was never applied".into()))
    }
}

pub fn record_review(store: &dyn KeyValueStore, today: NaiveDate) -> Result<DailyStats> {
    DailyStats::update(store, today, |stats| stats.reviews += 1)
}

pub fn record_word_added(store: &dyn KeyValueStore, today: NaiveDate) -> Result<DailyStats> {
    DailyStats::update(store, today, |stats| stats.words_added += 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    #[test]
    fn test_counters_accumulate_within_a_day() {
        let store = MemoryStore::new();
        record_review(&store, day(1)).unwrap();
        record_review(&store, day(1)).unwrap();
        let stats = record_word_added(&store, day(1)).unwrap();

        assert_eq!(stats.reviews, 2);
        assert_eq!(stats.words_added, 1);
        assert_eq!(DailyStats::load(&store, day(1)).unwrap(), stats);
    }

    #[test]
    fn test_counters_reset_on_new_day() {
        let store = MemoryStore::new();
        record_review(&store, day(1)).unwrap();

        let stats = DailyStats::load(&store, day(2)).unwrap();
        assert_eq!(stats, DailyStats::empty(day(2)));

        let stats = record_review(&store, day(2)).unwrap();
        assert_eq!(stats.reviews, 1);
    }

    #[test]
    fn test_concurrent_reviews_all_counted() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        record_review(store.as_ref(), day(4)).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(DailyStats::load(store.as_ref(), day(4)).unwrap().reviews, 40);
    }

    #[test]
    fn test_corrupt_stats_start_fresh() {
        let store = MemoryStore::new();
        store.set("stats", json!("garbage")).unwrap();
        let stats = DailyStats::load(&store, day(3)).unwrap();
        assert_eq!(stats, DailyStats::empty(day(3)));
    }
}
