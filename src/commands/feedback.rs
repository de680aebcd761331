//! `/feedback` and the "respond" button on DMs relayed by the owner.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use super::{Category, CommandOptions, SlashCommand};
use crate::collector::{await_modal_input, ModalError, ModalOptions};
use crate::config::{icons, Config, EMBED_COLOR};
use crate::interaction::{CommandContext, ComponentContext, InteractionContext, ModalContext};
use crate::platform::{ActionRow, Button, Embed, ModalSpec, Reply, TextInput};
use crate::{Data, Error};

/// Custom id of the button attached to relayed DMs.
pub const DM_RESPOND_ID: &str = "dm_respond";
const TEXT_INPUT_ID: &str = "text_input";

pub struct Feedback {
    options: CommandOptions,
}

impl Feedback {
    pub fn new() -> Self {
        Self {
            options: CommandOptions::new("feedback", "send a nice message to my owner!", Category::Info)
                .long_description(
                    "lets you send a nice *or not so nice* message to my owner. YOU MIGHT GET A RESPONSE??",
                )
                // The modal has to be the initial response
                .no_defer(),
        }
    }
}

impl Default for Feedback {
    fn default() -> Self {
        Self::new()
    }
}

fn owner_pings(config: &Config) -> String {
    config
        .admin_users
        .iter()
        .map(|id| format!("<@{}>, ", id))
        .collect()
}

/// Shows a single paragraph input and waits for it. `None` when the user
/// never submitted or moved channels.
async fn prompt(
    ctx: &InteractionContext,
    title: &str,
    placeholder: Option<&str>,
    timeout: Duration,
) -> Result<Option<ModalContext>, Error> {
    let mut input = TextInput::paragraph(TEXT_INPUT_ID, "type here:");
    if let Some(placeholder) = placeholder {
        input = input.placeholder(placeholder);
    }
    let spec = ModalSpec::new(title, vec![input]);
    let options = ModalOptions::new(timeout)
        .origin_channel(ctx.channel_id)
        .late_notice("you ran out of time to submit!");

    match await_modal_input(ctx, &spec, options).await {
        Ok(submission) => Ok(Some(submission)),
        Err(ModalError::Platform(e)) => Err(e.into()),
        Err(e) => {
            debug!("{} canceled: {}", title, e);
            Ok(None)
        }
    }
}

fn submission_embed(submission: &ModalContext) -> Embed {
    let mut embed = Embed::new()
        .color(EMBED_COLOR)
        .description(submission.value(TEXT_INPUT_ID).unwrap_or_default());
    if let Some(avatar) = &submission.user.avatar_url {
        embed = embed.thumbnail(avatar.clone());
    }
    embed
}

#[async_trait]
impl SlashCommand for Feedback {
    fn options(&self) -> &CommandOptions {
        &self.options
    }

    async fn run(&self, ctx: &CommandContext, data: &Data) -> Result<(), Error> {
        let guild_id = ctx.guild_id.ok_or("No guild attached to interaction")?;

        let Some(logs) = data.bot_logs.as_ref() else {
            ctx.send(&Reply::text("sorry this command isn't working right now :\\"))
                .await?;
            return Ok(());
        };

        let Some(submission) = prompt(
            ctx,
            "send feedback!",
            Some("I love ahribot so so much but I really wish... blah blah blah..."),
            data.config.timeouts.feedback,
        )
        .await?
        else {
            return Ok(());
        };

        let embed = submission_embed(&submission).field("Guild", format!("```\nID: {}```", guild_id), false);
        let content = format!(
            "{}feedback from {} (`{}`)",
            owner_pings(&data.config),
            ctx.user.display_name(),
            ctx.user.id
        );

        match logs.send(Some(content), embed).await {
            Ok(()) => {
                let thanks = Reply::text(format!(
                    "{} thanks for the feedback!! you may or may not get a response",
                    icons::KISS
                ))
                .ephemeral(true);
                if let Err(e) = submission.send(&thanks).await {
                    warn!("Failed to thank for feedback: {}", e);
                }
            }
            Err(e) => {
                warn!("Failed to forward feedback: {}", e);
                submission
                    .send(
                        &Reply::text(format!(
                            "{} something broke and the feedback couldn't be send, try again idk",
                            icons::CONFUSED
                        ))
                        .ephemeral(true),
                    )
                    .await?;
            }
        }

        Ok(())
    }
}

/// Handles a click on the "respond" button of a relayed DM: collects the
/// user's answer, forwards it to the bot logs and retires the button.
pub async fn respond_to_dm(data: &Data, click: &ComponentContext) -> Result<(), Error> {
    let Some(logs) = data.bot_logs.as_ref() else {
        click
            .send(&Reply::text("Sorry but the owner isnt accepting messages right meow").ephemeral(true))
            .await?;
        return Ok(());
    };

    let Some(submission) = prompt(click, "response input", None, data.config.timeouts.modal).await? else {
        return Ok(());
    };

    let content = format!(
        "{}response from {} (`{}`)",
        owner_pings(&data.config),
        click.user.display_name(),
        click.user.id
    );

    if let Err(e) = logs.send(Some(content), submission_embed(&submission)).await {
        warn!("Failed to forward DM response: {}", e);
        submission
            .send(
                &Reply::text(format!(
                    "{} Something broke and the response couldn't be sent, try again idk",
                    icons::CRY
                ))
                .ephemeral(true),
            )
            .await?;
        return Ok(());
    }

    let retired = Reply::new().row(ActionRow::new(vec![Button::secondary(
        "respond (already responded)",
        DM_RESPOND_ID,
    )
    .disabled(true)]));
    if let Err(e) = click.edit_original(&retired).await {
        warn!("Failed to disable respond button: {}", e);
    }

    let forwarded = Reply::text(format!(
        "{} I'll make sure to forward this message to my owner!",
        icons::OWO
    ));
    if let Err(e) = submission.send(&forwarded).await {
        warn!("Failed to confirm DM response: {}", e);
    }

    Ok(())
}
