//! Gatekeeping and execution of slash command invocations.

use poise::serenity_prelude::Permissions;
use tracing::{debug, error, info, warn};

use super::followup::spawn_after_command;
use super::{CommandOptions, SlashCommand};
use crate::config::icons;
use crate::interaction::CommandContext;
use crate::platform::Reply;
use crate::{Data, Error};

fn restarting() -> String {
    format!(
        "{} The bot is currently restarting. Try using this command again in a minute or two...",
        icons::OWO
    )
}

fn removed() -> String {
    format!("{} That command was recently removed.", icons::OWO)
}

fn apology() -> String {
    format!(
        "{} Ok so something might have broke... Just dont tell the devs they might restart me {}",
        icons::CONFUSED,
        icons::CRY
    )
}

/// Why an invocation was refused before the command body ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Denial {
    ModsOnly,
    NotInDms,
}

impl Denial {
    fn message(self) -> String {
        match self {
            Denial::ModsOnly => format!(
                "{} Only users with the `Manage Server` permission can use that command.",
                icons::OWO
            ),
            Denial::NotInDms => format!(
                "{} this chat feels a little too personal for that command, could you head to a server?",
                icons::SHY
            ),
        }
    }
}

fn authorize(options: &CommandOptions, ctx: &CommandContext) -> Result<(), Denial> {
    if ctx.guild_id.is_some() {
        let is_mod = ctx
            .member_permissions
            .is_some_and(|p| p.contains(Permissions::MANAGE_GUILD));
        if options.guild_mods_only && !is_mod {
            return Err(Denial::ModsOnly);
        }
    } else if !options.works_in_dms {
        return Err(Denial::NotInDms);
    }
    Ok(())
}

async fn notify(ctx: &CommandContext, content: String) {
    if let Err(e) = ctx.send(&Reply::text(content).ephemeral(true)).await {
        warn!("Failed to answer /{}: {}", ctx.name, e);
    }
}

/// Runs one slash command invocation end to end. Never fails: refusals and
/// errors are reported to the user and logged.
pub async fn dispatch(data: &Data, ctx: CommandContext) {
    if !data.is_accepting_commands() {
        debug!("Refusing /{} while not accepting commands", ctx.name);
        notify(&ctx, restarting()).await;
        return;
    }

    let Some(command) = data.commands.resolve(ctx.kind, &ctx.name, ctx.guild_id) else {
        debug!("No command registered for /{}", ctx.name);
        notify(&ctx, removed()).await;
        return;
    };

    if let Err(denial) = authorize(command.options(), &ctx) {
        debug!("User {} denied /{}: {:?}", ctx.user.id, ctx.name, denial);
        notify(&ctx, denial.message()).await;
        return;
    }

    info!(
        "Command ({}) run by {} ({}) in {}",
        ctx.name,
        ctx.user.display_name(),
        ctx.user.id,
        ctx.guild_id
            .map(|id| format!("guild ({})", id))
            .unwrap_or_else(|| "DMs".to_string())
    );

    match run(command.as_ref(), &ctx, data).await {
        Ok(()) => {
            if let Some(reply) = ctx.take_after_command() {
                spawn_after_command(ctx.interaction().clone(), reply, &data.config.timeouts);
            }
        }
        Err(e) => {
            error!("Command /{} failed: {}", ctx.name, e);
            let reply = Reply::text(apology()).ephemeral(command.options().defer_ephemeral);
            if let Err(e) = ctx.send(&reply).await {
                warn!("Failed to send apology for /{}: {}", ctx.name, e);
            }
        }
    }
}

async fn run(command: &dyn SlashCommand, ctx: &CommandContext, data: &Data) -> Result<(), Error> {
    let options = command.options();
    if !options.no_defer {
        ctx.defer(options.defer_ephemeral).await?;
    }
    command.run(ctx, data).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::FakeCommand;
    use crate::commands::{Category, CommandOptions};
    use crate::platform::testing::{Call, RecordingPlatform};
    use crate::platform::InteractionResponse;
    use std::sync::Arc;
    use std::time::Duration;

    fn data_with(platform: &Arc<RecordingPlatform>, fakes: &[Arc<FakeCommand>]) -> Data {
        let data = Data::for_tests(
            platform.clone(),
            fakes.iter().map(|p| p.clone() as Arc<dyn SlashCommand>).collect(),
        );
        data.set_accepting_commands(true);
        data
    }

    fn ephemeral_texts(platform: &RecordingPlatform) -> Vec<String> {
        platform
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Respond(_, InteractionResponse::Message(r)) if r.ephemeral => r.content,
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_not_accepting_never_runs_body() {
        let platform = RecordingPlatform::new();
        let fake = Arc::new(FakeCommand::new(CommandOptions::new("ping", "ping", Category::Info)));
        let data = data_with(&platform, &[fake.clone()]);
        data.set_accepting_commands(false);

        dispatch(&data, platform.command(1, "ping", Some(1), None)).await;

        assert_eq!(fake.runs(), 0);
        assert_eq!(ephemeral_texts(&platform), vec![restarting()]);
    }

    #[tokio::test]
    async fn test_failing_body_gets_one_apology() {
        let platform = RecordingPlatform::new();
        let fake = Arc::new(FakeCommand::new(CommandOptions::new("boom", "boom", Category::Info)).failing());
        let data = data_with(&platform, &[fake.clone()]);

        dispatch(&data, platform.command(1, "boom", Some(1), None)).await;

        assert_eq!(fake.runs(), 1);
        let apologies = platform
            .visible_replies()
            .into_iter()
            .filter(|r| r.content.as_deref() == Some(apology().as_str()))
            .count();
        assert_eq!(apologies, 1);
        // Deferred first, so the apology edits the placeholder
        assert!(matches!(platform.calls()[0], Call::Respond(_, InteractionResponse::Defer { ephemeral: false })));
        assert!(matches!(platform.calls()[1], Call::EditOriginal(..)));
    }

    #[tokio::test]
    async fn test_apology_failure_is_swallowed() {
        let platform = RecordingPlatform::new();
        let fake = Arc::new(
            FakeCommand::new(CommandOptions::new("boom", "boom", Category::Info).no_defer()).failing(),
        );
        let data = data_with(&platform, &[fake.clone()]);
        platform.fail_sends(true);

        dispatch(&data, platform.command(1, "boom", Some(1), None)).await;
        assert!(platform.visible_replies().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let platform = RecordingPlatform::new();
        let data = data_with(&platform, &[]);

        dispatch(&data, platform.command(1, "gone", Some(1), None)).await;
        assert_eq!(ephemeral_texts(&platform), vec![removed()]);
    }

    #[tokio::test]
    async fn test_authorization() {
        let platform = RecordingPlatform::new();
        let mods = Arc::new(FakeCommand::new(
            CommandOptions::new("config", "config", Category::Other).guild_mods_only(),
        ));
        let guild_only = Arc::new(FakeCommand::new(CommandOptions::new("play", "play", Category::Music)));
        let data = data_with(&platform, &[mods.clone(), guild_only.clone()]);

        dispatch(&data, platform.command(1, "config", Some(1), Some(Permissions::SEND_MESSAGES))).await;
        dispatch(&data, platform.command(2, "play", None, None)).await;
        assert_eq!(mods.runs() + guild_only.runs(), 0);
        assert_eq!(
            ephemeral_texts(&platform),
            vec![Denial::ModsOnly.message(), Denial::NotInDms.message()]
        );

        dispatch(&data, platform.command(3, "config", Some(1), Some(Permissions::MANAGE_GUILD))).await;
        assert_eq!(mods.runs(), 1);
    }

    #[tokio::test]
    async fn test_no_defer_sends_initial_response() {
        let platform = RecordingPlatform::new();
        let fake = Arc::new(FakeCommand::new(
            CommandOptions::new("feedback", "feedback", Category::Info).no_defer(),
        ));
        let data = data_with(&platform, &[fake.clone()]);

        dispatch(&data, platform.command(1, "feedback", Some(1), None)).await;

        let calls = platform.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(&calls[0], Call::Respond(_, InteractionResponse::Message(r)) if r.content.as_deref() == Some("ran feedback")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_after_command_message_follows_response() {
        let platform = RecordingPlatform::new();
        platform.confirm_after(1);
        let fake = Arc::new(
            FakeCommand::new(CommandOptions::new("daily", "daily", Category::Info)).with_after("streak!"),
        );
        let data = data_with(&platform, &[fake.clone()]);

        dispatch(&data, platform.command(1, "daily", Some(1), None)).await;
        assert!(!platform.calls().iter().any(|c| matches!(c, Call::FollowUp(..))));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(platform
            .calls()
            .iter()
            .any(|c| matches!(c, Call::FollowUp(_, r) if r.content.as_deref() == Some("streak!"))));
    }
}
