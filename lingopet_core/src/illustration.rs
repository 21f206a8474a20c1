//! Once-per-day illustration resolution.
//!
//! A word keeps the illustration generated for the current calendar day.
//! Resolution reuses that image when present, otherwise asks the
//! illustrator and writes the result back before returning.

use crate::media::{IllustrationRequest, Illustrator};
use crate::repository::WordRepository;
use crate::{CachedIllustration, ImageHandle, WordEntry, WordPatch};
use chrono::NaiveDate;

/// Where a resolved illustration came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IllustrationSource {
    Cached,
    Generated,
    Placeholder,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Illustration {
    pub image: ImageHandle,
    pub source: IllustrationSource,
}

impl Illustration {
    /// Cache entry to store on the word, if this image should be kept
    pub fn cache_entry(&self, today: NaiveDate) -> Option<CachedIllustration> {
        match (&self.image, self.source) {
            (ImageHandle::Image(src), IllustrationSource::Generated) => Some(CachedIllustration {
                image: src.clone(),
                date: today,
            }),
            _ => None,
        }
    }
}

pub fn request_for(word: &WordEntry) -> IllustrationRequest {
    IllustrationRequest {
        headword: word.word.clone(),
        context_sentence: word.example.clone(),
        scene: word.visual_scene.clone(),
    }
}

/// Resolve today's illustration for a word
///
/// The stored record is consulted first so a cache fill made by an earlier,
/// abandoned card still counts. A failed generation yields a placeholder,
/// which is never cached. Cache writes are best effort.
pub async fn resolve(
    repo: &WordRepository,
    illustrator: &dyn Illustrator,
    word: &WordEntry,
    today: NaiveDate,
) -> Illustration {
    let stored = match repo.get_word(word.id) {
        Ok(stored) => Some(stored),
        Err(e) => {
            tracing::debug!("Using session copy of '{}': {}", word.word, e);
            None
        }
    };
    let current = stored.as_ref().unwrap_or(word);

    if let Some(src) = current.cached_image_for(today) {
        tracing::debug!("Reusing today's illustration for '{}'", word.word);
        return Illustration {
            image: ImageHandle::Image(src.to_string()),
            source: IllustrationSource::Cached,
        };
    }

    let request = request_for(current);
    let image = match illustrator.illustrate(&request).await {
        Ok(ImageHandle::Image(src)) => src,
        Ok(placeholder @ ImageHandle::Placeholder(_)) => {
            return Illustration {
                image: placeholder,
                source: IllustrationSource::Placeholder,
            };
        }
        Err(e) => {
            tracing::warn!("Illustration for '{}' failed: {}. Using placeholder.", word.word, e);
            return Illustration {
                image: ImageHandle::placeholder_for(&word.word),
                source: IllustrationSource::Placeholder,
            };
        }
    };

    let illustration = Illustration {
        image: ImageHandle::Image(image),
        source: IllustrationSource::Generated,
    };

    if let Some(cached) = illustration.cache_entry(today) {
        let patch = WordPatch {
            today_image: Some(cached),
            ..Default::default()
        };
        if let Err(e) = repo.update_word(word.id, &patch) {
            tracing::warn!("Failed to cache illustration for '{}': {}", word.word, e);
        }
    }

    illustration
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::{Error, Result};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingIllustrator {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Illustrator for CountingIllustrator {
        async fn illustrate(&self, request: &IllustrationRequest) -> Result<ImageHandle> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Generation("backend down".into()));
            }
            Ok(ImageHandle::Image(format!("img://{}/{}", request.headword, n)))
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 2).unwrap()
    }

    fn setup() -> (WordRepository, WordEntry) {
        let repo = WordRepository::new(Arc::new(MemoryStore::new()));
        let now = Utc.with_ymd_and_hms(2024, 4, 2, 10, 0, 0).unwrap();
        let mut word = WordEntry::new("Baum", "Pflanze", "tree", "Der Baum ist hoch.", now);
        word.visual_scene = Some("a tall oak".into());
        repo.insert_word(&word).unwrap();
        (repo, word)
    }

    #[tokio::test]
    async fn test_generates_and_caches_once_per_day() {
        let (repo, word) = setup();
        let illustrator = CountingIllustrator::default();

        let first = resolve(&repo, &illustrator, &word, today()).await;
        assert_eq!(first.source, IllustrationSource::Generated);
        assert_eq!(first.image, ImageHandle::Image("img://Baum/0".into()));

        let stored = repo.get_word(word.id).unwrap();
        assert_eq!(stored.cached_image_for(today()), Some("img://Baum/0"));

        // Session copy is stale, but the stored cache is still used
        let second = resolve(&repo, &illustrator, &word, today()).await;
        assert_eq!(second.source, IllustrationSource::Cached);
        assert_eq!(second.image, first.image);
        assert_eq!(illustrator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_regenerates_on_a_new_day() {
        let (repo, word) = setup();
        let illustrator = CountingIllustrator::default();

        resolve(&repo, &illustrator, &word, today()).await;
        let tomorrow = today().succ_opt().unwrap();
        let next = resolve(&repo, &illustrator, &word, tomorrow).await;

        assert_eq!(next.source, IllustrationSource::Generated);
        assert_eq!(illustrator.calls.load(Ordering::SeqCst), 2);
        let stored = repo.get_word(word.id).unwrap();
        assert_eq!(stored.cached_image_for(tomorrow), Some("img://Baum/1"));
    }

    #[tokio::test]
    async fn test_failure_yields_uncached_placeholder() {
        let (repo, word) = setup();
        let illustrator = CountingIllustrator {
            fail: true,
            ..Default::default()
        };

        let result = resolve(&repo, &illustrator, &word, today()).await;
        assert_eq!(result.source, IllustrationSource::Placeholder);
        assert!(result.image.is_placeholder());
        assert!(repo.get_word(word.id).unwrap().today_image.is_none());

        // Next attempt tries again
        resolve(&repo, &illustrator, &word, today()).await;
        assert_eq!(illustrator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unstored_word_still_resolves() {
        let repo = WordRepository::new(Arc::new(MemoryStore::new()));
        let now = Utc.with_ymd_and_hms(2024, 4, 2, 10, 0, 0).unwrap();
        let word = WordEntry::new("Haus", "Gebäude", "house", "Das Haus ist alt.", now);
        let illustrator = CountingIllustrator::default();

        let result = resolve(&repo, &illustrator, &word, today()).await;
        assert_eq!(result.source, IllustrationSource::Generated);
    }

    #[test]
    fn test_request_carries_scene() {
        let (_, word) = setup();
        let request = request_for(&word);
        assert_eq!(request.headword, "Baum");
        assert_eq!(request.context_sentence, "Der Baum ist hoch.");
        assert_eq!(request.scene.as_deref(), Some("a tall oak"));
    }
}
