use async_trait::async_trait;

use super::{Category, CommandOptions, CommandRegistry, SlashCommand};
use crate::config::{icons, EMBED_COLOR};
use crate::corrector::Corrector;
use crate::interaction::CommandContext;
use crate::platform::{Embed, Reply};
use crate::{Data, Error};

const THUMBNAIL: &str =
    "https://cdn.discordapp.com/attachments/1151081323218346093/1151150759870726235/oaoaoaoa.gif";

pub struct Help {
    options: CommandOptions,
}

impl Help {
    pub fn new() -> Self {
        Self {
            options: CommandOptions::new("help", "view the commands", Category::Other)
                .long_description(icons::OWO)
                .works_in_dms()
                .argument("command", "command to get info for", false),
        }
    }
}

impl Default for Help {
    fn default() -> Self {
        Self::new()
    }
}

/// Page for a single command, falling back to the closest name.
fn command_info(registry: &CommandRegistry, query: &str) -> Reply {
    let command = registry.find(query).or_else(|| {
        let names = registry.names();
        Corrector::new(names)
            .get_word(query)
            .and_then(|name| registry.find(name))
    });

    match command {
        Some(command) => {
            let options = command.options();
            Reply::new().embed(
                Embed::new()
                    .color(EMBED_COLOR)
                    .title(format!("{} command info", options.name))
                    .description(options.long_description.clone()),
            )
        }
        None => Reply::text(format!("{} I'm not sure what command you mean?", icons::CONFUSED)),
    }
}

fn overview(registry: &CommandRegistry, bot_id: u64) -> Reply {
    let listed = registry
        .iter()
        .map(|c| c.options())
        .filter(|o| o.category != Category::Other)
        .map(|o| format!("`{}`", o.name))
        .collect::<Vec<_>>()
        .join(", ");

    Reply::new().embed(
        Embed::new()
            .color(EMBED_COLOR)
            .thumbnail(THUMBNAIL)
            .description(format!(
                "Hey there! I'm <@{}>, I can play music, chat, and other fun things. Here's a list of my commands:\n\n{}",
                bot_id, listed
            )),
    )
}

#[async_trait]
impl SlashCommand for Help {
    fn options(&self) -> &CommandOptions {
        &self.options
    }

    async fn run(&self, ctx: &CommandContext, data: &Data) -> Result<(), Error> {
        let reply = match ctx.option("command") {
            Some(query) => command_info(&data.commands, query),
            None => overview(&data.commands, data.config.application_id),
        };
        ctx.send(&reply).await?;
        Ok(())
    }
}
