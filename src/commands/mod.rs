//! Slash command model and the registry the dispatcher resolves against.

pub mod dispatch;
pub mod feedback;
pub mod followup;
pub mod help;
pub mod music;

use async_trait::async_trait;
use poise::serenity_prelude::GuildId;
use std::sync::Arc;

use crate::interaction::{CommandContext, CommandKind};
use crate::{Data, Error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Info,
    Music,
    /// Hidden from the help overview.
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandArgument {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

/// Static description of a slash command and how the dispatcher treats it.
#[derive(Debug, Clone)]
pub struct CommandOptions {
    pub name: &'static str,
    pub description: &'static str,
    /// Shown by `help <command>`.
    pub long_description: String,
    pub category: Category,
    pub kind: CommandKind,
    /// Requires the Manage Server permission when used in a server.
    pub guild_mods_only: bool,
    pub works_in_dms: bool,
    /// Skip the automatic deferral. Needed when the first response must ping.
    pub no_defer: bool,
    pub defer_ephemeral: bool,
    /// Empty means global.
    pub guild_ids: Vec<GuildId>,
    pub arguments: Vec<CommandArgument>,
}

impl CommandOptions {
    pub fn new(name: &'static str, description: &'static str, category: Category) -> Self {
        Self {
            name,
            description,
            long_description: description.to_string(),
            category,
            kind: CommandKind::ChatInput,
            guild_mods_only: false,
            works_in_dms: false,
            no_defer: false,
            defer_ephemeral: false,
            guild_ids: Vec::new(),
            arguments: Vec::new(),
        }
    }

    pub fn long_description(mut self, text: impl Into<String>) -> Self {
        self.long_description = text.into();
        self
    }

    pub fn guild_mods_only(mut self) -> Self {
        self.guild_mods_only = true;
        self
    }

    pub fn works_in_dms(mut self) -> Self {
        self.works_in_dms = true;
        self
    }

    pub fn no_defer(mut self) -> Self {
        self.no_defer = true;
        self
    }

    pub fn defer_ephemeral(mut self) -> Self {
        self.defer_ephemeral = true;
        self
    }

    pub fn guilds(mut self, guild_ids: impl IntoIterator<Item = GuildId>) -> Self {
        self.guild_ids = guild_ids.into_iter().collect();
        self
    }

    pub fn argument(mut self, name: &'static str, description: &'static str, required: bool) -> Self {
        self.arguments.push(CommandArgument {
            name,
            description,
            required,
        });
        self
    }

    pub fn is_global(&self) -> bool {
        self.guild_ids.is_empty()
    }

    fn validate(&self) -> Result<(), RegistryError> {
        if self.works_in_dms && self.guild_mods_only {
            return Err(RegistryError::ModsOnlyInDms(self.name));
        }
        Ok(())
    }

    /// Two registrations collide when they would answer the same invocation.
    fn collides_with(&self, other: &CommandOptions) -> bool {
        if self.kind != other.kind || self.name != other.name {
            return false;
        }
        match (self.is_global(), other.is_global()) {
            (true, true) => true,
            (false, false) => self.guild_ids.iter().any(|id| other.guild_ids.contains(id)),
            _ => false,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("command `{0}` works in DMs so it cannot require Manage Server")]
    ModsOnlyInDms(&'static str),
    #[error("command `{0}` is registered twice in the same scope")]
    Duplicate(&'static str),
}

#[async_trait]
pub trait SlashCommand: Send + Sync {
    fn options(&self) -> &CommandOptions;

    async fn run(&self, ctx: &CommandContext, data: &Data) -> Result<(), Error>;
}

/// Registered slash commands keyed by (kind, scope, name).
pub struct CommandRegistry {
    commands: Vec<Arc<dyn SlashCommand>>,
}

impl CommandRegistry {
    pub fn new(commands: Vec<Arc<dyn SlashCommand>>) -> Result<Self, RegistryError> {
        let mut registry = Self {
            commands: Vec::with_capacity(commands.len()),
        };
        for command in commands {
            registry.register(command)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, command: Arc<dyn SlashCommand>) -> Result<(), RegistryError> {
        let options = command.options();
        options.validate()?;
        if self
            .commands
            .iter()
            .any(|existing| existing.options().collides_with(options))
        {
            return Err(RegistryError::Duplicate(options.name));
        }
        self.commands.push(command);
        Ok(())
    }

    /// Guild-scoped registrations win over the global one of the same name.
    /// Outside a server only global commands are considered.
    pub fn resolve(
        &self,
        kind: CommandKind,
        name: &str,
        guild_id: Option<GuildId>,
    ) -> Option<Arc<dyn SlashCommand>> {
        let matches = |command: &&Arc<dyn SlashCommand>| {
            let options = command.options();
            options.kind == kind && options.name == name
        };

        if let Some(guild_id) = guild_id {
            if let Some(scoped) = self
                .commands
                .iter()
                .filter(matches)
                .find(|c| c.options().guild_ids.contains(&guild_id))
            {
                return Some(Arc::clone(scoped));
            }
        }

        self.commands
            .iter()
            .filter(matches)
            .find(|c| c.options().is_global())
            .cloned()
    }

    /// First command with this name in any scope.
    pub fn find(&self, name: &str) -> Option<Arc<dyn SlashCommand>> {
        self.commands
            .iter()
            .find(|c| c.options().name == name)
            .cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.commands.iter().map(|c| c.options().name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SlashCommand>> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Every slash command the bot ships with.
pub fn all() -> Vec<Arc<dyn SlashCommand>> {
    vec![
        Arc::new(help::Help::new()),
        Arc::new(music::Play::new()),
        Arc::new(music::Skip::new()),
        Arc::new(music::Stop::new()),
        Arc::new(music::Queue::new()),
        Arc::new(feedback::Feedback::new()),
    ]
}
