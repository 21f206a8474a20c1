//! Per-card presentation sequences.
//!
//! Each card runs as its own task holding a cancellation token. Timers,
//! narration and image display race the token, so cancelling the card drops
//! them immediately. Illustration generation does not race the token: an
//! image that finished generating is still written to the day cache, but
//! nothing after it happens once the card is cancelled.

use crate::illustration::{self, Illustration};
use crate::media::{ImageSurface, Illustrator, Narrator};
use crate::repository::WordRepository;
use crate::WordEntry;
use chrono::NaiveDate;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Progress reported by a card task back to the session
#[derive(Debug)]
pub(crate) enum CardSignal {
    IllustrationResolved { epoch: u64, illustration: Illustration },
    Revealed { epoch: u64 },
    PlaybackFinished { epoch: u64 },
}

impl CardSignal {
    pub(crate) fn epoch(&self) -> u64 {
        match self {
            CardSignal::IllustrationResolved { epoch, .. }
            | CardSignal::Revealed { epoch }
            | CardSignal::PlaybackFinished { epoch } => *epoch,
        }
    }
}

/// Everything a card task needs, owned so the task can outlive a borrow
pub(crate) struct CardContext {
    pub epoch: u64,
    pub token: CancellationToken,
    pub word: WordEntry,
    pub today: NaiveDate,
    pub words: WordRepository,
    pub illustrator: Arc<dyn Illustrator>,
    pub narrator: Arc<dyn Narrator>,
    pub surface: Arc<dyn ImageSurface>,
    pub narration_rate: f32,
    pub settle_pause: Duration,
    pub dwell: Duration,
    pub signals: UnboundedSender<CardSignal>,
}

impl CardContext {
    fn is_live(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Report progress unless the card was abandoned
    fn signal(&self, signal: CardSignal) -> bool {
        if !self.is_live() {
            return false;
        }
        self.signals.send(signal).is_ok()
    }

    async fn narrate(&self) -> Option<()> {
        let spoken = until_cancelled(
            &self.token,
            self.narrator.narrate(&self.word.word, self.narration_rate),
        )
        .await?;
        if let Err(e) = spoken {
            tracing::debug!("Narration of '{}' failed: {}", self.word.word, e);
        }
        Some(())
    }

    async fn pause(&self, duration: Duration) -> Option<()> {
        until_cancelled(&self.token, tokio::time::sleep(duration)).await
    }

    async fn resolve_illustration(&self) -> Illustration {
        illustration::resolve(&self.words, self.illustrator.as_ref(), &self.word, self.today)
            .await
    }
}

/// Run `fut` unless `token` fires first
async fn until_cancelled<F: Future>(token: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = token.cancelled() => None,
        output = fut => Some(output),
    }
}

/// Auto-advancing card: narrate, reveal, narrate again, dwell
pub(crate) async fn passive_card(ctx: CardContext) {
    let illustration = ctx.resolve_illustration().await;
    let image = illustration.image.clone();
    if !ctx.signal(CardSignal::IllustrationResolved {
        epoch: ctx.epoch,
        illustration,
    }) {
        tracing::debug!("Card '{}' abandoned after illustration", ctx.word.word);
        return;
    }

    if ctx.narrate().await.is_none() {
        return;
    }
    if ctx.pause(ctx.settle_pause).await.is_none() {
        return;
    }

    if !ctx.signal(CardSignal::Revealed { epoch: ctx.epoch }) {
        return;
    }
    match until_cancelled(&ctx.token, ctx.surface.display(&image)).await {
        None => return,
        Some(Err(e)) => tracing::debug!("Image for '{}' failed to load: {}", ctx.word.word, e),
        Some(Ok(())) => {}
    }

    if ctx.narrate().await.is_none() {
        return;
    }
    if ctx.pause(ctx.dwell).await.is_none() {
        return;
    }

    tracing::debug!("Finished passive playback of '{}'", ctx.word.word);
    ctx.signal(CardSignal::PlaybackFinished { epoch: ctx.epoch });
}

/// Recall card: narrate once while the illustration resolves
///
/// The illustration is reported as soon as it resolves; narration keeps
/// running alongside and never holds back the reveal.
pub(crate) async fn active_card(ctx: CardContext) {
    let reveal = async {
        let illustration = ctx.resolve_illustration().await;
        ctx.signal(CardSignal::IllustrationResolved {
            epoch: ctx.epoch,
            illustration,
        });
    };
    tokio::join!(reveal, ctx.narrate());
}

/// Learner-requested repeat of the headword
pub(crate) async fn narrate_again(ctx: CardContext) {
    ctx.narrate().await;
}
