//! Gateway event routing. Serenity already runs every event on its own task,
//! so handlers here may await for as long as their session lasts.

use poise::serenity_prelude as serenity;
use tracing::{debug, error, info, warn};

use crate::commands::dispatch::dispatch;
use crate::commands::feedback::{respond_to_dm, DM_RESPOND_ID};
use crate::interaction::{ComponentContext, ModalContext};
use crate::platform::serenity::{command_context, component_context, modal_context, sync_commands};
use crate::platform::Embed;
use crate::{Data, Error};

const JOINED_COLOR: u32 = 9043800;
const LEFT_COLOR: u32 = 16734296;

/// Where a component click is handled.
#[derive(Debug, PartialEq, Eq)]
pub enum ComponentRoute {
    DmRespond,
    Collector,
}

pub fn route_component(custom_id: &str) -> ComponentRoute {
    match custom_id {
        DM_RESPOND_ID => ComponentRoute::DmRespond,
        _ => ComponentRoute::Collector,
    }
}

pub async fn handle_event(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            on_ready(ctx, data_about_bot, data).await;
        }
        serenity::FullEvent::InteractionCreate { interaction } => match interaction {
            serenity::Interaction::Command(command) => {
                dispatch(data, command_context(data.platform.clone(), command)).await;
            }
            serenity::Interaction::Component(component) => {
                handle_component(data, component_context(data.platform.clone(), component)).await;
            }
            serenity::Interaction::Modal(modal) => {
                handle_modal(data, modal_context(data.platform.clone(), modal)).await;
            }
            _ => {}
        },
        serenity::FullEvent::VoiceStateUpdate { new, .. } => {
            if let Some(guild_id) = new.guild_id {
                crate::voice::check_listeners(data, guild_id).await;
            }
        }
        serenity::FullEvent::GuildCreate { guild, is_new } => {
            // Startup replays every guild; only fresh joins are logged
            if *is_new == Some(true) {
                info!("Joined guild {} ({})", guild.name, guild.id);
                send_guild_log(data, joined_embed(&guild.name, guild.id, guild.member_count)).await;
            }
        }
        serenity::FullEvent::GuildDelete { incomplete, full } => {
            if incomplete.unavailable {
                debug!("Guild {} became unavailable", incomplete.id);
                return Ok(());
            }
            info!("Left guild {}", incomplete.id);
            let embed = left_embed(
                full.as_ref().map(|g| g.name.as_str()),
                incomplete.id,
                full.as_ref().map(|g| g.joined_at.to_string()),
            );
            send_guild_log(data, embed).await;
        }
        _ => {}
    }
    Ok(())
}

pub async fn handle_component(data: &Data, click: ComponentContext) {
    match route_component(&click.custom_id) {
        ComponentRoute::DmRespond => {
            if let Err(e) = respond_to_dm(data, &click).await {
                error!("Failed to handle DM response from {}: {}", click.user.id, e);
            }
        }
        ComponentRoute::Collector => data.collectors.verify(click).await,
    }
}

/// Runs the callback waiting on this modal, if any. A second submission of
/// the same modal finds nothing.
pub async fn handle_modal(data: &Data, submission: ModalContext) {
    match data.modals.take(&submission.custom_id) {
        Some(callback) => callback(submission).await,
        None => debug!("No pending callback for modal {}", submission.custom_id),
    }
}

/// Opens the dispatcher on the first ready. Later ready events are reconnects.
pub fn begin_accepting(data: &Data) -> bool {
    if !data.mark_ready() {
        return false;
    }
    data.set_accepting_commands(true);
    true
}

async fn on_ready(ctx: &serenity::Context, ready: &serenity::Ready, data: &Data) {
    if !begin_accepting(data) {
        debug!("Reconnected as {}", ready.user.name);
        return;
    }

    ctx.set_activity(Some(serenity::ActivityData::playing(&data.config.status_message)));

    if !data.config.register_commands {
        info!(
            "Logged in as {} ({}) and accepting commands! ({})",
            ready.user.name,
            ready.user.id,
            data.commands.names().join(", ")
        );
        return;
    }

    let dev_guild = data.config.dev_guild_id.map(serenity::GuildId::new);
    match sync_commands(&ctx.http, &data.commands, dev_guild).await {
        Ok(names) => info!(
            "Logged in as {} ({}) and listening for {} commands! ({})",
            ready.user.name,
            ready.user.id,
            names.len(),
            names.join(", ")
        ),
        Err(e) => {
            error!("Failed to register slash commands: {}", e);
            info!("Bot ready and accepting commands!");
        }
    }
}

fn joined_embed(name: &str, id: serenity::GuildId, member_count: u64) -> Embed {
    Embed::new()
        .title("Joined Server")
        .description(format!(
            "**Name**: {}\n**ID**: {}\n**Members**: {}",
            name, id, member_count
        ))
        .color(JOINED_COLOR)
}

fn left_embed(name: Option<&str>, id: serenity::GuildId, joined_at: Option<String>) -> Embed {
    Embed::new()
        .title("Left Server")
        .description(format!(
            "**Name**: {}\n**ID**: {}\n**Joined**: {}",
            name.unwrap_or("unknown"),
            id,
            joined_at.as_deref().unwrap_or("unknown")
        ))
        .color(LEFT_COLOR)
}

async fn send_guild_log(data: &Data, embed: Embed) {
    let Some(logs) = data.bot_logs.as_ref() else {
        return;
    };
    if let Err(e) = logs.send(None, embed).await {
        warn!("Failed to post guild log: {}", e);
    }
}
