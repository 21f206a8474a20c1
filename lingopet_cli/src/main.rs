use async_trait::async_trait;
use chrono::{Local, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use lingopet_core::engine::SessionEvent;
use lingopet_core::review_log::ReviewSink;
use lingopet_core::selection;
use lingopet_core::stats::{self, DailyStats};
use lingopet_core::*;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "lingopet")]
#[command(about = "Spaced-repetition vocabulary reviews", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a word to the collection
    Add {
        /// The headword to learn
        word: String,

        #[arg(long)]
        definition: String,

        #[arg(long)]
        translation: String,

        /// Example sentence using the word
        #[arg(long)]
        example: String,

        /// Scene description used when illustrating the word
        #[arg(long)]
        scene: Option<String>,
    },

    /// List words that are due for review
    Due,

    /// Run a review session
    Review {
        /// Session mode (active, passive)
        #[arg(long, default_value = "active")]
        mode: ReviewMode,

        /// Review words added today instead of due words
        #[arg(long)]
        new: bool,

        /// Auto-grade every card (for testing) instead of prompting
        #[arg(long, value_enum)]
        auto_grade: Option<Outcome>,

        /// Shuffle the words after the first card
        #[arg(long)]
        shuffle: bool,
    },

    /// Show today's counters
    Stats,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Outcome {
    Correct,
    Incorrect,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    lingopet_core::logging::init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(data_dir) = cli.data_dir {
        config.data.data_dir = data_dir;
    }

    match cli.command {
        Commands::Add {
            word,
            definition,
            translation,
            example,
            scene,
        } => cmd_add(&config, word, definition, translation, example, scene),
        Commands::Due => cmd_due(&config),
        Commands::Review {
            mode,
            new,
            auto_grade,
            shuffle,
        } => cmd_review(&config, mode, new, auto_grade, shuffle).await,
        Commands::Stats => cmd_stats(&config),
    }
}

fn open_store(config: &Config) -> Result<Arc<JsonFileStore>> {
    std::fs::create_dir_all(&config.data.data_dir)?;
    Ok(Arc::new(JsonFileStore::new(config.store_path())))
}

fn cmd_add(
    config: &Config,
    word: String,
    definition: String,
    translation: String,
    example: String,
    scene: Option<String>,
) -> Result<()> {
    let store = open_store(config)?;
    let repo = WordRepository::new(store.clone());

    let mut entry = WordEntry::new(word, definition, translation, example, Utc::now());
    entry.visual_scene = scene;
    repo.insert_word(&entry)?;
    stats::record_word_added(store.as_ref(), Local::now().date_naive())?;

    println!("✓ Added '{}'", entry.word);
    println!("  {}", entry.translation);
    Ok(())
}

fn cmd_due(config: &Config) -> Result<()> {
    let repo = WordRepository::new(open_store(config)?);
    let words = repo.list_words()?;
    let now = Utc::now();
    let due = selection::due_words(&words, now);

    if due.is_empty() {
        println!("Nothing due.");
        if let Some(next) = selection::next_due_at(&words, now) {
            println!(
                "  Next review: {}",
                next.with_timezone(&Local).format("%Y-%m-%d %H:%M")
            );
        }
        return Ok(());
    }

    println!("{} words due:", due.len());
    for word in &due {
        println!(
            "  {} - {} (level {}, reviewed {} times)",
            word.word, word.translation, word.review_level, word.review_count
        );
    }
    Ok(())
}

fn cmd_stats(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let repo = WordRepository::new(store.clone());
    let today = Local::now().date_naive();

    let daily = DailyStats::load(store.as_ref(), today)?;
    let words = repo.list_words()?;
    let due = selection::due_words(&words, Utc::now()).len();

    println!("Today ({})", today);
    println!("  Reviews:     {}", daily.reviews);
    println!("  Words added: {}", daily.words_added);
    println!("Collection");
    println!("  Words:       {}", words.len());
    println!("  Due now:     {}", due);
    Ok(())
}

async fn cmd_review(
    config: &Config,
    mode: ReviewMode,
    new: bool,
    auto_grade: Option<Outcome>,
    shuffle: bool,
) -> Result<()> {
    let store = open_store(config)?;
    let repo = WordRepository::new(store);
    let clock = Arc::new(SystemClock);

    let all = repo.list_words()?;
    let words = if new {
        selection::added_on(&all, clock.today())
    } else {
        selection::due_words(&all, clock.now())
    };

    if words.is_empty() {
        println!("Nothing to review.");
        return Ok(());
    }

    println!("Starting {} review of {} words\n", mode, words.len());

    let by_id: HashMap<Uuid, WordEntry> = words.iter().map(|w| (w.id, w.clone())).collect();
    let review_log: Box<dyn ReviewSink> = Box::new(JsonlReviewLog::new(config.review_log_path()));
    let collaborators = Collaborators {
        words: repo,
        illustrator: Arc::new(OfflineIllustrator),
        narrator: Arc::new(TerminalNarrator),
        surface: Arc::new(lingopet_core::media::NoSurface),
        clock,
        review_log: Some(review_log),
    };

    let (handle, mut events) = start_session(words, mode, config.session_settings(), collaborators);
    if shuffle {
        handle.shuffle()?;
    }
    if mode == ReviewMode::Passive {
        handle.play()?;
    }

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut xp_reward = None;

    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::CardPresented { position, word_id } => {
                if let Some(word) = by_id.get(&word_id) {
                    println!("[{}/{}] {}", position + 1, by_id.len(), word.word);
                    println!("  \"{}\"", word.example);
                }
            }
            SessionEvent::IllustrationReady { image, .. } => {
                println!("  Illustration: {}", image);
            }
            SessionEvent::IllustrationRevealed { word_id } => {
                let Some(word) = by_id.get(&word_id) else {
                    continue;
                };
                if mode == ReviewMode::Passive {
                    print_answer(word);
                    continue;
                }

                let correct = match auto_grade {
                    Some(outcome) => Some(matches!(outcome, Outcome::Correct)),
                    None => prompt_grade(&handle, &mut input, word).await?,
                };
                print_answer(word);
                match correct {
                    Some(correct) => handle.grade(correct)?,
                    None => handle.exit()?,
                }
            }
            SessionEvent::Reviewed {
                review_level,
                review_count,
                ..
            } => {
                println!(
                    "  ✓ Level {} (reviewed {} times)\n",
                    review_level, review_count
                );
            }
            SessionEvent::PlaybackChanged { playing } => {
                tracing::debug!("Playback {}", if playing { "started" } else { "paused" });
            }
            SessionEvent::Completed { xp_reward: xp } => xp_reward = Some(xp),
        }
    }

    match xp_reward {
        Some(0) => println!("Review ended early. No XP this time."),
        Some(xp) => println!("🎉 Review complete! +{} XP", xp),
        None => tracing::warn!("Review ended without a completion event"),
    }
    Ok(())
}

fn print_answer(word: &WordEntry) {
    println!("  → {}: {}", word.translation, word.definition);
}

/// Ask whether the word was recalled; `None` means quit
async fn prompt_grade(
    handle: &SessionHandle,
    input: &mut Lines<BufReader<Stdin>>,
    word: &WordEntry,
) -> Result<Option<bool>> {
    loop {
        println!("─────────────────────────────────────────");
        println!("Do you remember '{}'?", word.word);
        println!("  'y' yes, 'n' no, 'r' hear it again, 'q' quit");
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = input.next_line().await? else {
            return Ok(None);
        };
        match line.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(Some(true)),
            "n" | "no" => return Ok(Some(false)),
            "q" | "quit" => return Ok(None),
            "r" => handle.narrate()?,
            other => println!("Unknown answer '{}'", other),
        }
    }
}

/// Prints narration instead of speaking it
struct TerminalNarrator;

#[async_trait]
impl Narrator for TerminalNarrator {
    async fn narrate(&self, text: &str, _rate: f32) -> Result<()> {
        println!("  🔊 {}", text);
        Ok(())
    }

    fn cancel(&self) {}
}

/// No image backend in the terminal; every card gets the placeholder
struct OfflineIllustrator;

#[async_trait]
impl Illustrator for OfflineIllustrator {
    async fn illustrate(&self, request: &IllustrationRequest) -> Result<ImageHandle> {
        Ok(ImageHandle::placeholder_for(&request.headword))
    }
}
