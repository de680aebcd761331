//! Owner-only prefix commands, parsed by poise.

use poise::serenity_prelude as serenity;
use tracing::{error, info, warn};

use crate::commands::feedback::DM_RESPOND_ID;
use crate::config::{icons, EMBED_COLOR};
use crate::platform::{ActionRow, Button, Embed, Reply};
use crate::{Context, Data, Error};

pub const COMMAND_FAILED: &str = "Command failed to execute!";

/// Relay a message to a user's DMs with a button to answer back
#[poise::command(prefix_command, owners_only, hide_in_help)]
pub async fn message(
    ctx: Context<'_>,
    #[description = "User to message"] user: Option<serenity::User>,
    #[rest]
    #[description = "Message"]
    text: Option<String>,
) -> Result<(), Error> {
    let Some(user) = user else {
        ctx.reply("❌ You forgot to include a user ID.").await?;
        return Ok(());
    };
    let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
        ctx.reply("❌ You need to include a message. `message <id> <message>`.")
            .await?;
        return Ok(());
    };

    let attachment = match ctx {
        poise::Context::Prefix(prefix) => prefix.msg.attachments.first().map(|a| a.url.clone()),
        poise::Context::Application(_) => None,
    };
    let author = ctx.author();
    let relay = relay_message(
        author.global_name.as_deref().unwrap_or(&author.name),
        author.avatar_url(),
        &text,
        attachment,
    );

    let sent = async {
        let channel = user.create_dm_channel(ctx.http()).await?;
        ctx.data().platform.send_message(channel.id, &relay).await?;
        Ok::<_, Error>(())
    }
    .await;

    match sent {
        Ok(()) => {
            info!("Relayed owner message to {} ({})", user.name, user.id);
            ctx.reply(format!(
                "📨 Message sent to **{}**!",
                user.global_name.as_deref().unwrap_or(&user.name)
            ))
            .await?;
        }
        Err(e) => {
            warn!("Failed to relay message to {}: {}", user.id, e);
            ctx.reply(format!("Error sending message:```\n{}```", e)).await?;
        }
    }
    Ok(())
}

fn relay_message(
    author_name: &str,
    author_avatar: Option<String>,
    text: &str,
    attachment: Option<String>,
) -> Reply {
    let mut embed = Embed::new().description(text).color(EMBED_COLOR);
    if let Some(avatar) = author_avatar {
        embed = embed.thumbnail(avatar);
    }
    if let Some(url) = attachment {
        // Discord only previews images inside embeds
        embed = if url.ends_with(".mp4") || url.ends_with(".mp3") {
            embed.field("File", url, false)
        } else {
            embed.image(url)
        };
    }

    Reply::text(format!(
        "{} My owner, *{}*, asked me to pass this message to you:",
        icons::SHY,
        author_name
    ))
    .embed(embed)
    .row(ActionRow::new(vec![Button::secondary("respond", DM_RESPOND_ID)]))
}

/// Stop taking commands and shut down the bot (Owner only)
#[poise::command(prefix_command, owners_only, hide_in_help)]
pub async fn shutdown(ctx: Context<'_>) -> Result<(), Error> {
    info!("Shutdown command received from owner: {}", ctx.author().name);
    ctx.data().set_accepting_commands(false);
    ctx.say("👋 Shutting down...").await?;
    ctx.framework().shard_manager().shutdown_all().await;
    Ok(())
}

pub fn all() -> Vec<poise::Command<crate::Data, Error>> {
    vec![message(), shutdown()]
}

/// Nudge toward `/help` when someone mentions the bot with an unknown
/// command. Typos after the text prefix stay silent.
fn unknown_command_reply(prefix_used: &str, configured_prefix: &str) -> Option<String> {
    (prefix_used != configured_prefix).then(|| {
        format!("{} do you need help? use the `/help` command!", icons::CONFUSED)
    })
}

pub async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::UnknownInteraction { .. } => {}
        poise::FrameworkError::UnknownCommand {
            ctx,
            msg,
            prefix,
            framework,
            ..
        } => {
            if !framework.user_data.is_accepting_commands() {
                return;
            }
            let configured = framework.options.prefix_options.prefix.as_deref().unwrap_or_default();
            if let Some(text) = unknown_command_reply(prefix, configured) {
                if let Err(e) = msg.reply(ctx, text).await {
                    warn!("Failed to answer unknown command in {}: {}", msg.channel_id, e);
                }
            }
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!("Text command {} failed: {}", ctx.command().name, error);
            if let Err(e) = ctx.say(COMMAND_FAILED).await {
                warn!("Failed to report command failure: {}", e);
            }
        }
        poise::FrameworkError::NotAnOwner { ctx, .. } => {
            info!("{} tried to run owner command {}", ctx.author().name, ctx.command().name);
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                warn!("Error while handling error: {}", e);
            }
        }
    }
}
