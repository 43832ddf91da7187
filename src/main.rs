use cardcast::bot::handlers;
use cardcast::bot::{CardPublisher, MessagingTransport, TelegramTransport};
use cardcast::card::{CardLibrary, CardSource};
use cardcast::config::Settings;
use cardcast::pagination::{InteractionRouter, PaginationStore};
use cardcast::scheduler::Scheduler;
use dotenvy::dotenv;
use regex::Regex;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};
use url::Url;

/// Regex patterns for redacting bot tokens from log output
struct RedactionPatterns {
    token_in_url: Regex,
    bare_token: Regex,
    token_with_prefix: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            token_in_url: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            bare_token: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            token_with_prefix: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
        })
    }

    fn redact(&self, input: &str) -> String {
        let mut output = input.to_string();
        output = self
            .token_in_url
            .replace_all(&output, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        output = self
            .bare_token
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .token_with_prefix
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .to_string();
        output
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // We return the original buffer length to satisfy the contract,
        // even if the redacted string length differs.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    // Initialize redaction patterns early (before logging)
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);

    // Setup logging with redaction
    init_logging(patterns);

    info!("Starting Cardcast bot...");

    // Load settings
    let settings = init_settings();

    let channels = settings.channels();
    if channels.is_empty() {
        error!("No channels configured; set CHANNEL_IDS.");
        std::process::exit(1);
    }
    let play_now = init_play_now_url(&settings);

    // Initialize Bot and transport
    let bot = Bot::new(settings.telegram_token.clone());
    let transport: Arc<dyn MessagingTransport> = Arc::new(TelegramTransport::new(bot.clone()));

    // Core components
    let store = PaginationStore::new();
    let router = Arc::new(InteractionRouter::new(
        store.clone(),
        Arc::clone(&transport),
        play_now.clone(),
    ));
    let publisher = Arc::new(CardPublisher::new(
        Arc::clone(&transport),
        channels,
        play_now,
    ));
    let source = init_card_source(&settings);

    // Scheduler, resumed from persisted configuration
    let scheduler = Arc::new(Scheduler::load(Path::new(&settings.scheduler_config)));
    if scheduler.status().await.config.is_enabled {
        scheduler
            .start(Arc::clone(&publisher), Arc::clone(&source))
            .await;
    }

    spawn_session_sweep(store);

    info!("Bot is running...");

    Dispatcher::builder(bot, handlers::handler_tree())
        .dependencies(dptree::deps![settings, router, publisher, scheduler, source])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_play_now_url(settings: &Settings) -> Url {
    match Url::parse(&settings.play_now_url) {
        Ok(url) => url,
        Err(e) => {
            error!("Invalid PLAY_NOW_URL `{}`: {}", settings.play_now_url, e);
            std::process::exit(1);
        }
    }
}

fn init_card_source(settings: &Settings) -> Arc<dyn CardSource> {
    match CardLibrary::load(Path::new(&settings.card_manifest)) {
        Ok(library) => {
            info!("Card library loaded: {} card(s).", library.len());
            Arc::new(library)
        }
        Err(e) => {
            warn!("Card manifest unavailable ({e}); starting with an empty library.");
            Arc::new(CardLibrary::from_cards(Vec::new()))
        }
    }
}

/// Periodic backstop that reclaims expired browsing sessions
fn spawn_session_sweep(store: PaginationStore) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(600));
        loop {
            interval.tick().await;
            let removed = store.sweep_expired().await;
            if removed > 0 {
                debug!("Session sweep reclaimed {removed} expired session(s)");
            }
        }
    });
}
