//! Review session engine.
//!
//! A session drives one pass over a queue of words in a fixed mode:
//! - **Passive**: each card narrates, reveals its illustration, narrates
//!   again and auto-advances, counting a review without touching mastery
//! - **Active**: each card waits for the learner to grade the recall and
//!   reschedules the word through [`crate::scheduler`]
//!
//! The session runs as a tokio task that owns all session state. The host
//! talks to it through a [`SessionHandle`] and listens for [`SessionEvent`]s.
//! Completion is reported exactly once, with the configured reward on
//! natural completion and zero on early exit.

use crate::clock::Clock;
use crate::config::SessionSettings;
use crate::illustration::IllustrationSource;
use crate::media::{ImageSurface, Illustrator, Narrator};
use crate::playback::{self, CardContext, CardSignal};
use crate::queue::{QueueStep, ReviewQueue};
use crate::repository::WordRepository;
use crate::review_log::{ReviewKind, ReviewRecord, ReviewSink};
use crate::{scheduler, stats};
use crate::{CardState, Error, ImageHandle, Result, ReviewMode, WordEntry, WordPatch};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Injected services a session works with
pub struct Collaborators {
    pub words: WordRepository,
    pub illustrator: Arc<dyn Illustrator>,
    pub narrator: Arc<dyn Narrator>,
    pub surface: Arc<dyn ImageSurface>,
    pub clock: Arc<dyn Clock>,
    pub review_log: Option<Box<dyn ReviewSink>>,
}

/// Notifications sent to the host
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    CardPresented { position: usize, word_id: Uuid },
    IllustrationReady { word_id: Uuid, image: ImageHandle },
    IllustrationRevealed { word_id: Uuid },
    PlaybackChanged { playing: bool },
    Reviewed { word_id: Uuid, review_level: i32, review_count: u32 },
    Completed { xp_reward: u32 },
}

/// Point-in-time view of a running session
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    pub mode: ReviewMode,
    pub position: usize,
    pub len: usize,
    pub playing: bool,
    pub card: CardState,
    pub current: Option<WordEntry>,
    pub order: Vec<Uuid>,
}

#[derive(Debug)]
enum Command {
    Play,
    Pause,
    TogglePlayback,
    Advance,
    Shuffle,
    Grade(bool),
    Narrate,
    Exit,
    Snapshot(oneshot::Sender<SessionSnapshot>),
}

/// Host-side control of a running session
///
/// Every command fails with [`Error::Session`] once the session has ended.
/// Dropping all handles tears the session down without a reward.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    commands: UnboundedSender<Command>,
    mode: ReviewMode,
}

impl SessionHandle {
    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| Error::Session("review session has ended".into()))
    }

    pub fn mode(&self) -> ReviewMode {
        self.mode
    }

    /// Start or resume passive playback from the top of the current card
    pub fn play(&self) -> Result<()> {
        self.send(Command::Play)
    }

    /// Stop passive playback, silencing narration and clearing timers
    pub fn pause(&self) -> Result<()> {
        self.send(Command::Pause)
    }

    pub fn toggle_playback(&self) -> Result<()> {
        self.send(Command::TogglePlayback)
    }

    /// Move to the next card, completing the session after the last one
    pub fn advance(&self) -> Result<()> {
        self.send(Command::Advance)
    }

    /// Shuffle the cards not yet visited; pauses passive playback
    pub fn shuffle(&self) -> Result<()> {
        self.send(Command::Shuffle)
    }

    /// Grade the current card (active mode only) and move on
    pub fn grade(&self, correct: bool) -> Result<()> {
        self.send(Command::Grade(correct))
    }

    /// Speak the current headword again (active mode only)
    pub fn narrate(&self) -> Result<()> {
        self.send(Command::Narrate)
    }

    /// End the session now with no reward
    pub fn exit(&self) -> Result<()> {
        self.send(Command::Exit)
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx))?;
        rx.await
            .map_err(|_| Error::Session("review session has ended".into()))
    }
}

/// Start a review session over a copy of `words`
///
/// Must be called from within a tokio runtime. Passive sessions wait for
/// [`SessionHandle::play`]; active sessions load the first card immediately.
/// An empty word list completes at once with the completion reward.
pub fn start_session(
    words: Vec<WordEntry>,
    mode: ReviewMode,
    settings: SessionSettings,
    collaborators: Collaborators,
) -> (SessionHandle, UnboundedReceiver<SessionEvent>) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (signal_tx, signal_rx) = mpsc::unbounded_channel();

    tracing::info!("Starting {} review of {} words", mode, words.len());

    let actor = SessionActor {
        queue: ReviewQueue::new(words),
        mode,
        settings,
        deps: collaborators,
        card: CardState::default(),
        playing: false,
        epoch: 0,
        card_token: CancellationToken::new(),
        events: event_tx,
        signals: signal_tx,
        rng: StdRng::from_entropy(),
    };
    tokio::spawn(actor.run(command_rx, signal_rx));

    (
        SessionHandle {
            commands: command_tx,
            mode,
        },
        event_rx,
    )
}

struct SessionActor {
    queue: ReviewQueue,
    mode: ReviewMode,
    settings: SessionSettings,
    deps: Collaborators,
    card: CardState,
    playing: bool,
    /// Bumped whenever the current card's task is abandoned
    epoch: u64,
    card_token: CancellationToken,
    events: UnboundedSender<SessionEvent>,
    signals: UnboundedSender<CardSignal>,
    rng: StdRng,
}

impl SessionActor {
    async fn run(
        mut self,
        mut commands: UnboundedReceiver<Command>,
        mut signals: UnboundedReceiver<CardSignal>,
    ) {
        if self.queue.is_empty() {
            tracing::info!("Review started with no words, completing immediately");
            self.finish(self.settings.completion_xp);
            return;
        }

        self.enter_card();

        loop {
            let flow = tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        tracing::debug!("All session handles dropped, tearing down");
                        self.abandon_card();
                        self.deps.narrator.cancel();
                        ControlFlow::Break(())
                    }
                },
                Some(signal) = signals.recv() => self.handle_signal(signal),
            };
            if flow.is_break() {
                break;
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("Session event dropped, host stopped listening");
        }
    }

    fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Play => self.play(),
            Command::Pause => self.pause(),
            Command::TogglePlayback => {
                if self.playing {
                    self.pause()
                } else {
                    self.play()
                }
            }
            Command::Advance => {
                tracing::debug!("Manual advance from position {}", self.queue.position());
                return self.advance();
            }
            Command::Shuffle => self.shuffle(),
            Command::Grade(correct) => return self.grade(correct),
            Command::Narrate => self.narrate_again(),
            Command::Exit => {
                tracing::info!(
                    "Review exited early at position {} of {}",
                    self.queue.position(),
                    self.queue.len()
                );
                self.finish(0);
                return ControlFlow::Break(());
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
        ControlFlow::Continue(())
    }

    fn handle_signal(&mut self, signal: CardSignal) -> ControlFlow<()> {
        if signal.epoch() != self.epoch {
            tracing::debug!("Ignoring signal from abandoned card: {:?}", signal);
            return ControlFlow::Continue(());
        }
        let Some(word_id) = self.queue.current().map(|w| w.id) else {
            return ControlFlow::Continue(());
        };

        match signal {
            CardSignal::IllustrationResolved { illustration, .. } => {
                if illustration.source == IllustrationSource::Generated {
                    let today = self.deps.clock.today();
                    if let (Some(word), Some(cached)) =
                        (self.queue.current_mut(), illustration.cache_entry(today))
                    {
                        word.today_image = Some(cached);
                    }
                }
                self.card.image = Some(illustration.image.clone());
                self.card.loading = false;
                self.emit(SessionEvent::IllustrationReady {
                    word_id,
                    image: illustration.image,
                });
                if self.mode == ReviewMode::Active {
                    self.card.revealed = true;
                    self.emit(SessionEvent::IllustrationRevealed { word_id });
                }
            }
            CardSignal::Revealed { .. } => {
                self.card.revealed = true;
                self.emit(SessionEvent::IllustrationRevealed { word_id });
            }
            CardSignal::PlaybackFinished { .. } => return self.complete_passive_card(),
        }
        ControlFlow::Continue(())
    }

    /// Cancel the current card's task and invalidate its pending signals
    fn abandon_card(&mut self) {
        self.card_token.cancel();
        self.card_token = CancellationToken::new();
        self.epoch += 1;
    }

    fn card_context(&self, word: WordEntry) -> CardContext {
        CardContext {
            epoch: self.epoch,
            token: self.card_token.clone(),
            word,
            today: self.deps.clock.today(),
            words: self.deps.words.clone(),
            illustrator: Arc::clone(&self.deps.illustrator),
            narrator: Arc::clone(&self.deps.narrator),
            surface: Arc::clone(&self.deps.surface),
            narration_rate: self.settings.narration_rate,
            settle_pause: self.settings.settle_pause,
            dwell: self.settings.dwell,
            signals: self.signals.clone(),
        }
    }

    fn spawn_card<F, Fut>(&self, task: F)
    where
        F: FnOnce(CardContext) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if let Some(word) = self.queue.current().cloned() {
            tokio::spawn(task(self.card_context(word)));
        }
    }

    fn enter_card(&mut self) {
        let Some(word_id) = self.queue.current().map(|w| w.id) else {
            return;
        };
        self.emit(SessionEvent::CardPresented {
            position: self.queue.position(),
            word_id,
        });
        self.start_card();
    }

    /// Reset the card and run its presentation sequence for the mode
    fn start_card(&mut self) {
        self.abandon_card();
        self.card.reset();
        match self.mode {
            ReviewMode::Active => self.spawn_card(playback::active_card),
            ReviewMode::Passive if self.playing => self.spawn_card(playback::passive_card),
            ReviewMode::Passive => {}
        }
    }

    fn play(&mut self) {
        if self.mode != ReviewMode::Passive {
            tracing::debug!("Ignoring play in {} mode", self.mode);
            return;
        }
        if self.playing {
            return;
        }
        self.playing = true;
        self.emit(SessionEvent::PlaybackChanged { playing: true });
        self.start_card();
    }

    fn pause(&mut self) {
        if !self.playing {
            return;
        }
        self.playing = false;
        self.abandon_card();
        self.deps.narrator.cancel();
        self.emit(SessionEvent::PlaybackChanged { playing: false });
        tracing::debug!("Playback paused at position {}", self.queue.position());
    }

    fn shuffle(&mut self) {
        self.pause();
        if self.queue.shuffle_remaining(&mut self.rng) {
            tracing::debug!("Shuffled {} remaining words", self.queue.remaining().len());
        } else {
            tracing::debug!("Nothing to shuffle");
        }
    }

    fn narrate_again(&self) {
        if self.mode != ReviewMode::Active {
            tracing::debug!("Ignoring narration request in {} mode", self.mode);
            return;
        }
        self.spawn_card(playback::narrate_again);
    }

    fn advance(&mut self) -> ControlFlow<()> {
        self.abandon_card();
        self.deps.narrator.cancel();
        match self.queue.advance() {
            QueueStep::Next(_) => {
                self.enter_card();
                ControlFlow::Continue(())
            }
            QueueStep::Exhausted => {
                tracing::info!("Review complete after {} words", self.queue.len());
                self.finish(self.settings.completion_xp);
                ControlFlow::Break(())
            }
        }
    }

    fn grade(&mut self, correct: bool) -> ControlFlow<()> {
        if self.mode != ReviewMode::Active {
            tracing::warn!("Ignoring grade in {} mode", self.mode);
            return ControlFlow::Continue(());
        }
        let Some(word) = self.queue.current() else {
            return ControlFlow::Continue(());
        };

        let now = self.deps.clock.now();
        let update = scheduler::calc_next_review(
            &self.settings.intervals_days,
            word.review_level,
            correct,
            now,
        );
        let patch = WordPatch {
            review_level: Some(update.new_level),
            review_count: Some(word.review_count.saturating_add(1)),
            last_reviewed_at: Some(now),
            next_review_date: Some(update.next_review_date),
            today_image: None,
        };

        tracing::info!(
            "Graded '{}' {}: level {} -> {}",
            word.word,
            if correct { "correct" } else { "incorrect" },
            word.review_level,
            update.new_level
        );

        self.record_review(
            &patch,
            ReviewKind::Graded {
                correct,
                new_level: update.new_level,
            },
        );
        self.advance()
    }

    fn complete_passive_card(&mut self) -> ControlFlow<()> {
        let Some(word) = self.queue.current() else {
            return ControlFlow::Continue(());
        };
        let patch = WordPatch {
            review_count: Some(word.review_count.saturating_add(1)),
            ..Default::default()
        };
        self.record_review(&patch, ReviewKind::Passive);
        self.advance()
    }

    /// Apply a review to the session copy and persist it (best effort)
    fn record_review(&mut self, patch: &WordPatch, kind: ReviewKind) {
        let now = self.deps.clock.now();
        let Some(word) = self.queue.current_mut() else {
            return;
        };
        patch.apply(word);
        let word_id = word.id;
        let review_level = word.review_level;
        let review_count = word.review_count;

        if let Err(e) = self.deps.words.update_word(word_id, patch) {
            tracing::warn!("Failed to persist review of {}: {}", word_id, e);
        }
        if let Some(log) = self.deps.review_log.as_mut() {
            if let Err(e) = log.append(&ReviewRecord::new(word_id, kind, now)) {
                tracing::warn!("Failed to log review of {}: {}", word_id, e);
            }
        }
        if let Err(e) = stats::record_review(self.deps.words.store().as_ref(), self.deps.clock.today())
        {
            tracing::warn!("Failed to update daily stats: {}", e);
        }

        self.emit(SessionEvent::Reviewed {
            word_id,
            review_level,
            review_count,
        });
    }

    fn finish(&mut self, xp_reward: u32) {
        self.abandon_card();
        self.playing = false;
        self.deps.narrator.cancel();
        tracing::info!("Review finished, reporting {} XP", xp_reward);
        self.emit(SessionEvent::Completed { xp_reward });
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            mode: self.mode,
            position: self.queue.position(),
            len: self.queue.len(),
            playing: self.playing,
            card: self.card.clone(),
            current: self.queue.current().cloned(),
            order: self.queue.words().iter().map(|w| w.id).collect(),
        }
    }
}
