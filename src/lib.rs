pub mod collector;
pub mod commands;
pub mod config;
pub mod corrector;
pub mod events;
pub mod interaction;
pub mod platform;
pub mod text_commands;
pub mod voice;
pub mod webhook;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use collector::CollectorRegistry;
use commands::{CommandRegistry, RegistryError, SlashCommand};
use platform::{PendingModals, Platform};

/// Custom data passed to all commands
pub struct Data {
    pub config: config::Config,
    pub platform: Arc<dyn Platform>,
    pub collectors: Arc<CollectorRegistry>,
    pub commands: Arc<CommandRegistry>,
    /// Modal callbacks waiting for a submission; shared with the platform.
    pub modals: Arc<PendingModals>,
    pub http_client: reqwest::Client,
    pub songbird: Option<Arc<songbird::Songbird>>,
    pub bot_logs: Option<Arc<dyn webhook::BotLogs>>,
    pub voice_watch: voice::EmptyChannelWatch,
    /// Off until the first ready event and again during shutdown.
    accepting_commands: AtomicBool,
    ready_seen: AtomicBool,
}

impl Data {
    pub fn new(
        config: config::Config,
        platform: Arc<dyn Platform>,
        modals: Arc<PendingModals>,
        commands: Vec<Arc<dyn SlashCommand>>,
    ) -> Result<Self, RegistryError> {
        Ok(Self {
            collectors: Arc::new(CollectorRegistry::new(config.timeouts)),
            voice_watch: voice::EmptyChannelWatch::new(config.voice_idle_timeout),
            commands: Arc::new(CommandRegistry::new(commands)?),
            config,
            platform,
            modals,
            http_client: reqwest::Client::new(),
            songbird: None,
            bot_logs: None,
            accepting_commands: AtomicBool::new(false),
            ready_seen: AtomicBool::new(false),
        })
    }

    pub fn with_songbird(mut self, songbird: Option<Arc<songbird::Songbird>>) -> Self {
        self.songbird = songbird;
        self
    }

    pub fn with_bot_logs(mut self, bot_logs: Option<Arc<dyn webhook::BotLogs>>) -> Self {
        self.bot_logs = bot_logs;
        self
    }

    pub fn is_accepting_commands(&self) -> bool {
        self.accepting_commands.load(Ordering::SeqCst)
    }

    pub fn set_accepting_commands(&self, accepting: bool) {
        self.accepting_commands.store(accepting, Ordering::SeqCst);
    }

    /// True only for the first caller; later ready events are reconnects.
    pub fn mark_ready(&self) -> bool {
        !self.ready_seen.swap(true, Ordering::SeqCst)
    }
}

#[cfg(test)]
impl Data {
    pub(crate) fn for_tests(
        platform: Arc<platform::testing::RecordingPlatform>,
        commands: Vec<Arc<dyn SlashCommand>>,
    ) -> Self {
        let config = config::Config::for_tests();
        let modals = Arc::new(PendingModals::new(config.timeouts.feedback));
        Self::new(config, platform, modals, commands).expect("test commands must register")
    }
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
