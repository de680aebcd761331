use dotenvy::dotenv;
use std::env;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    pub discord_token: String,
    pub application_id: u64,
    pub admin_users: Vec<u64>,
    pub prefix: String,
    pub status_message: String,
    pub dev_guild_id: Option<u64>,
    pub register_commands: bool,
    pub bot_logs_webhook_url: Option<String>,
    pub voice_idle_timeout: Duration,
    pub timeouts: Timeouts,
}

/// Waits used by the interaction primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Lifetime of a collector created without an explicit timeout.
    pub collector: Duration,
    /// How long a pagination session waits for the next click.
    pub pagination: Duration,
    /// Modal submission window for modals opened from a button.
    pub modal: Duration,
    /// Modal submission window for the feedback flow.
    pub feedback: Duration,
    /// Spacing between "has the command responded yet" polls.
    pub after_command_interval: Duration,
    pub after_command_attempts: u32,
    /// Window in which a second unmatched click on a message counts as stale.
    pub stale_click_grace: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            collector: Duration::from_secs(15),
            pagination: Duration::from_secs(90),
            modal: Duration::from_secs(25),
            feedback: Duration::from_secs(120),
            after_command_interval: Duration::from_secs(1),
            after_command_attempts: 5,
            stale_click_grace: Duration::from_secs(5),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::build()
    }

    fn build() -> anyhow::Result<Self> {
        let defaults = Timeouts::default();

        Ok(Config {
            discord_token: env::var("DISCORD_TOKEN")
                .map_err(|_| anyhow::anyhow!("DISCORD_TOKEN must be set"))?,
            application_id: env::var("APPLICATION_ID")
                .map_err(|_| anyhow::anyhow!("APPLICATION_ID must be set"))?
                .parse()
                .map_err(|_| anyhow::anyhow!("APPLICATION_ID must be a valid u64"))?,
            admin_users: env::var("ADMIN_USERS")
                .map(|ids| parse_id_list(&ids))
                .unwrap_or_default(),
            prefix: env::var("PREFIX").unwrap_or_else(|_| "=".to_string()),
            status_message: env::var("STATUS_MESSAGE")
                .unwrap_or_else(|_| "League of Legends".to_string()),
            dev_guild_id: env::var("DEV_GUILD_ID").ok().and_then(|id| id.parse().ok()),
            register_commands: env::var("REGISTER_COMMANDS")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            bot_logs_webhook_url: env::var("BOT_LOGS_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            voice_idle_timeout: env_duration("VOICE_IDLE_TIMEOUT", Duration::from_secs(60)),
            timeouts: Timeouts {
                collector: env_duration("COLLECTOR_TIMEOUT", defaults.collector),
                pagination: env_duration("PAGINATION_TIMEOUT", defaults.pagination),
                modal: env_duration("MODAL_TIMEOUT", defaults.modal),
                feedback: env_duration("FEEDBACK_TIMEOUT", defaults.feedback),
                after_command_interval: env_duration(
                    "AFTER_COMMAND_INTERVAL",
                    defaults.after_command_interval,
                ),
                after_command_attempts: env::var("AFTER_COMMAND_ATTEMPTS")
                    .ok()
                    .and_then(|n| n.parse().ok())
                    .filter(|n| *n > 0)
                    .unwrap_or(defaults.after_command_attempts),
                stale_click_grace: env_duration("STALE_CLICK_GRACE", defaults.stale_click_grace),
            },
        })
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Config {
            discord_token: "test_token".to_string(),
            application_id: 1000,
            admin_users: vec![42],
            prefix: "=".to_string(),
            status_message: "League of Legends".to_string(),
            dev_guild_id: None,
            register_commands: false,
            bot_logs_webhook_url: None,
            voice_idle_timeout: Duration::from_secs(60),
            timeouts: Timeouts::default(),
        }
    }
}

/// Reads a humantime duration (`15s`, `2m`, `1h 30m`), falling back on absent or bad input.
fn env_duration(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|raw| humantime::parse_duration(raw.trim()).ok())
        .unwrap_or(default)
}

fn parse_id_list(raw: &str) -> Vec<u64> {
    raw.split(',')
        .filter_map(|id| id.trim().parse().ok())
        .collect()
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"[REDACTED]")
            .field("application_id", &self.application_id)
            .field("admin_users", &self.admin_users)
            .field("prefix", &self.prefix)
            .field("status_message", &self.status_message)
            .field("dev_guild_id", &self.dev_guild_id)
            .field("register_commands", &self.register_commands)
            .field(
                "bot_logs_webhook_url",
                &self.bot_logs_webhook_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("voice_idle_timeout", &self.voice_idle_timeout)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

/// Custom emoji used in user-facing replies.
pub mod icons {
    pub const OWO: &str = "<a:owo_skin:1151093413790371890>";
    pub const KISS: &str = "<:ahri_kiss:1151093674109845515>";
    pub const SHY: &str = "<:ahri_shy:1151093475022999582>";
    pub const CONFUSED: &str = "<:ahri_huh:1151117050039767092>";
    pub const POINTING_LEFT: &str = "<:ahri_look:1151117087083864105>";
    pub const CRY: &str = "<:ahricry:1151118947073142795>";
}

/// Embed accent color used across the bot.
pub const EMBED_COLOR: u32 = 0xFF7F96;
