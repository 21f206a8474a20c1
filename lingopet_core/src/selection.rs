//! Choosing which words go into a review session.
//!
//! The host picks a subset before starting a session: either the words
//! added on a given day or the words whose review date has passed.

use crate::WordEntry;
use chrono::{DateTime, Local, NaiveDate, Utc};

/// Words that are due at `now`, most overdue first
pub fn due_words(words: &[WordEntry], now: DateTime<Utc>) -> Vec<WordEntry> {
    let mut due: Vec<WordEntry> = words.iter().filter(|w| w.is_due(now)).cloned().collect();
    due.sort_by(|a, b| {
        a.next_review_date
            .cmp(&b.next_review_date)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
    tracing::debug!("{} of {} words are due", due.len(), words.len());
    due
}

/// Words created on the given local calendar date, oldest first
pub fn added_on(words: &[WordEntry], date: NaiveDate) -> Vec<WordEntry> {
    added_on_in(words, date, &Local)
}

fn added_on_in<Tz: chrono::TimeZone>(
    words: &[WordEntry],
    date: NaiveDate,
    tz: &Tz,
) -> Vec<WordEntry> {
    let mut added: Vec<WordEntry> = words
        .iter()
        .filter(|w| w.created_at.with_timezone(tz).date_naive() == date)
        .cloned()
        .collect();
    added.sort_by_key(|w| w.created_at);
    added
}

/// The soonest upcoming review among words that are not yet due
pub fn next_due_at(words: &[WordEntry], now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    words
        .iter()
        .filter(|w| !w.is_due(now))
        .map(|w| w.next_review_date)
        .min()
}
