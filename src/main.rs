use ahri::platform::serenity::SerenityPlatform;
use ahri::platform::PendingModals;
use ahri::webhook::{BotLogs, WebhookLogs};
use ahri::{commands, config::Config, events, text_commands, Data};
use poise::serenity_prelude as serenity;
use songbird::serenity::SerenityInit;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let discord_token = config.discord_token.clone();
    let owners: HashSet<serenity::UserId> =
        config.admin_users.iter().copied().map(serenity::UserId::new).collect();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: text_commands::all(),
            owners,
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: Some(config.prefix.clone()),
                mention_as_prefix: true,
                ..Default::default()
            },
            // Text commands share the gate with slash commands
            command_check: Some(|ctx| Box::pin(async move { Ok(ctx.data().is_accepting_commands()) })),
            event_handler: |ctx, event, _framework, data| {
                Box::pin(events::handle_event(ctx, event, data))
            },
            on_error: |error| Box::pin(text_commands::on_error(error)),
            ..Default::default()
        })
        .setup(|ctx, _ready, _framework| {
            Box::pin(async move {
                info!("Connected, setting up...");
                let modals = Arc::new(PendingModals::new(config.timeouts.feedback * 5));
                let platform = Arc::new(SerenityPlatform::new(
                    ctx.http.clone(),
                    ctx.cache.clone(),
                    modals.clone(),
                ));

                let bot_logs = match config.bot_logs_webhook_url.as_deref() {
                    Some(url) => match WebhookLogs::connect(ctx.http.clone(), url).await {
                        Ok(logs) => Some(Arc::new(logs) as Arc<dyn BotLogs>),
                        Err(e) => {
                            warn!("Bot logs disabled: {}", e);
                            None
                        }
                    },
                    None => None,
                };

                let songbird = songbird::get(ctx).await;
                if songbird.is_none() {
                    warn!("Songbird not registered, music commands will not work");
                }

                let data = Data::new(config, platform, modals, commands::all())?
                    .with_songbird(songbird)
                    .with_bot_logs(bot_logs);
                Ok(data)
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    let mut client = serenity::ClientBuilder::new(&discord_token, intents)
        .framework(framework)
        .register_songbird()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    info!("Starting bot...");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}
