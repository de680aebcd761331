use async_trait::async_trait;
use songbird::input::{AuxMetadata, Compose, YoutubeDl};
use songbird::tracks::Track;
use songbird::{Event, Songbird, TrackEvent};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

use super::{Category, CommandOptions, SlashCommand};
use crate::collector::PaginateOptions;
use crate::config::{icons, EMBED_COLOR};
use crate::interaction::CommandContext;
use crate::platform::{Embed, Reply};
use crate::voice::events::TrackErrorNotifier;
use crate::{Data, Error};

const SONGS_PER_PAGE: usize = 20;

/// What we remember about a queued track; attached to its songbird handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub title: String,
    pub artist: Option<String>,
    pub duration: Option<Duration>,
    pub url: Option<String>,
}

impl TrackInfo {
    fn from_metadata(meta: AuxMetadata, fallback: &str) -> Self {
        Self {
            title: meta
                .title
                .or(meta.track)
                .unwrap_or_else(|| fallback.to_string()),
            artist: meta.artist,
            duration: meta.duration,
            url: meta.source_url,
        }
    }

    /// "`title` (3:45)", safe to drop inside markdown.
    pub fn display(&self) -> String {
        let length = self
            .duration
            .map(format_duration)
            .unwrap_or_else(|| "live".to_string());
        format!("`{}` ({})", self.title.replace('`', ""), length)
    }
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Queue listing split into pages of [`SONGS_PER_PAGE`]; the first track is the one playing.
pub fn generate_pages(tracks: &[TrackInfo]) -> Vec<Reply> {
    let header = format!(
        "__**{} {} in queue**__",
        tracks.len(),
        if tracks.len() == 1 { "song" } else { "songs" }
    );

    let pages: Vec<Reply> = tracks
        .chunks(SONGS_PER_PAGE)
        .enumerate()
        .map(|(page, chunk)| {
            let lines = chunk
                .iter()
                .enumerate()
                .map(|(i, track)| match page * SONGS_PER_PAGE + i {
                    0 => format!("PLAYING: {}\n", track.display()),
                    num => format!("{}. {}", num, track.display()),
                })
                .collect::<Vec<_>>()
                .join("\n");

            Reply::new().embed(
                Embed::new()
                    .color(EMBED_COLOR)
                    .description(format!("{}\n\n{}", header, lines)),
            )
        })
        .collect();

    if pages.is_empty() {
        vec![Reply::new().embed(Embed::new().color(EMBED_COLOR).description(header))]
    } else {
        pages
    }
}

fn voice_manager(data: &Data) -> Result<Arc<Songbird>, Error> {
    Ok(data
        .songbird
        .clone()
        .ok_or("Songbird Voice client not initialized")?)
}

/// Tracks in play order, current first.
async fn queued_tracks(manager: &Songbird, guild_id: poise::serenity_prelude::GuildId) -> Vec<TrackInfo> {
    let Some(call) = manager.get(guild_id) else {
        return Vec::new();
    };
    let handler = call.lock().await;
    handler
        .queue()
        .current_queue()
        .iter()
        .map(|track| track.data::<TrackInfo>().as_ref().clone())
        .collect()
}

fn nothing_playing() -> Reply {
    Reply::text(format!("{} Nothing is playing?", icons::CONFUSED))
}

pub struct Play {
    options: CommandOptions,
}

impl Play {
    pub fn new() -> Self {
        Self {
            options: CommandOptions::new("play", "Play a song in voice chat!", Category::Music)
                .long_description("Play a song from youtube, soundcloud, etc.")
                .argument("search", "song to play (url or search input)", true),
        }
    }
}

impl Default for Play {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SlashCommand for Play {
    fn options(&self) -> &CommandOptions {
        &self.options
    }

    async fn run(&self, ctx: &CommandContext, data: &Data) -> Result<(), Error> {
        let guild_id = ctx.guild_id.ok_or("No guild attached to interaction")?;
        let query = ctx.option("search").ok_or("Missing search option")?.to_string();

        let member = data
            .platform
            .fetch_member(guild_id, ctx.user.id)
            .await?
            .ok_or("No member found")?;
        let Some(channel_id) = member.voice_channel else {
            ctx.send(&Reply::text(format!(
                "{} you have to join a voice channel first",
                icons::POINTING_LEFT
            )))
            .await?;
            return Ok(());
        };

        let manager = voice_manager(data)?;

        let mut source = if query.starts_with("http://") || query.starts_with("https://") {
            YoutubeDl::new(data.http_client.clone(), query.clone())
        } else {
            YoutubeDl::new_search(data.http_client.clone(), query.clone())
        };
        let info = match source.aux_metadata().await {
            Ok(meta) => TrackInfo::from_metadata(meta, &query),
            Err(e) => {
                error!("Search for {:?} failed: {}", query, e);
                ctx.send(&Reply::text(format!("{} I couldn't find anything to play...", icons::CRY)))
                    .await?;
                return Ok(());
            }
        };

        let call = match manager.get(guild_id) {
            Some(call) => call,
            None => match manager.join(guild_id, channel_id).await {
                Ok(call) => {
                    let mut handler = call.lock().await;
                    if let Err(e) = handler.deafen(true).await {
                        warn!("Failed to self-deafen in guild {}: {}", guild_id, e);
                    }
                    drop(handler);
                    call
                }
                Err(e) => {
                    warn!("Failed to join voice in guild {}: {}", guild_id, e);
                    let _ = manager.remove(guild_id).await;
                    ctx.send(&Reply::text(format!(
                        "{} There was an issue trying to join ur voice channel",
                        icons::CONFUSED
                    )))
                    .await?;
                    return Ok(());
                }
            },
        };

        let handle = call
            .lock()
            .await
            .enqueue(Track::new_with_data(source.into(), Arc::new(info.clone())))
            .await;
        let notifier = TrackErrorNotifier {
            guild_id,
            channel_id: ctx.channel_id,
            platform: data.platform.clone(),
        };
        if let Err(e) = handle.add_event(Event::Track(TrackEvent::Error), notifier) {
            warn!("Failed to watch track errors in guild {}: {}", guild_id, e);
        }

        ctx.send(
            &Reply::new().embed(
                Embed::new()
                    .color(EMBED_COLOR)
                    .title(format!("{} Loading...", icons::OWO))
                    .description(info.display()),
            ),
        )
        .await?;

        if let Some(logs) = &data.bot_logs {
            let mut embed = Embed::new()
                .color(EMBED_COLOR)
                .description(format!(
                    "*{}* is listening to a song in the server `{}`",
                    ctx.user.display_name(),
                    guild_id
                ))
                .field("Song", info.display(), false)
                .field("User ID", format!("```{}```", ctx.user.id), true)
                .field("Guild ID", format!("```{}```", guild_id), true);
            if let Some(avatar) = &ctx.user.avatar_url {
                embed = embed.thumbnail(avatar.clone());
            }
            if let Err(e) = logs.send(None, embed).await {
                warn!("Failed to log play: {}", e);
            }
        }

        Ok(())
    }
}

pub struct Skip {
    options: CommandOptions,
}

impl Skip {
    pub fn new() -> Self {
        Self {
            options: CommandOptions::new("skip", "skip the current song", Category::Music)
                .long_description("for when you're sick of the current song"),
        }
    }
}

impl Default for Skip {
    fn default() -> Self {
        Self::new()
    }
}

fn skip_message(current: &TrackInfo, next: Option<&TrackInfo>) -> String {
    let next = match next {
        Some(next) => format!("Now playing: `{}`.", next.title.replace('`', "")),
        None => "Now playing: There's nothing else to play.".to_string(),
    };
    format!("Skipping `{}`\n\n{}", current.title.replace('`', ""), next)
}

#[async_trait]
impl SlashCommand for Skip {
    fn options(&self) -> &CommandOptions {
        &self.options
    }

    async fn run(&self, ctx: &CommandContext, data: &Data) -> Result<(), Error> {
        let guild_id = ctx.guild_id.ok_or("No guild attached to interaction")?;
        let manager = voice_manager(data)?;

        let tracks = queued_tracks(&manager, guild_id).await;
        let Some(current) = tracks.first() else {
            ctx.send(&nothing_playing()).await?;
            return Ok(());
        };

        if let Some(call) = manager.get(guild_id) {
            call.lock().await.queue().skip()?;
        }

        ctx.send(&Reply::text(skip_message(current, tracks.get(1))))
            .await?;
        Ok(())
    }
}

pub struct Stop {
    options: CommandOptions,
}

impl Stop {
    pub fn new() -> Self {
        Self {
            options: CommandOptions::new("stop", "stop the music!", Category::Music)
                .long_description("it stops the music and clears the queue"),
        }
    }
}

impl Default for Stop {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SlashCommand for Stop {
    fn options(&self) -> &CommandOptions {
        &self.options
    }

    async fn run(&self, ctx: &CommandContext, data: &Data) -> Result<(), Error> {
        let guild_id = ctx.guild_id.ok_or("No guild attached to interaction")?;
        let manager = voice_manager(data)?;

        let Some(call) = manager.get(guild_id) else {
            ctx.send(&nothing_playing()).await?;
            return Ok(());
        };

        {
            let handler = call.lock().await;
            if handler.queue().is_empty() {
                drop(handler);
                ctx.send(&nothing_playing()).await?;
                return Ok(());
            }
            handler.queue().stop();
        }
        manager.remove(guild_id).await?;

        ctx.send(&Reply::text(format!("{} Stopping the music...", icons::OWO)))
            .await?;
        Ok(())
    }
}

pub struct Queue {
    options: CommandOptions,
}

impl Queue {
    pub fn new() -> Self {
        Self {
            options: CommandOptions::new("queue", "view to song queue", Category::Music)
                .long_description("shows all the songs being played"),
        }
    }
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SlashCommand for Queue {
    fn options(&self) -> &CommandOptions {
        &self.options
    }

    async fn run(&self, ctx: &CommandContext, data: &Data) -> Result<(), Error> {
        let guild_id = ctx.guild_id.ok_or("No guild attached to interaction")?;
        let manager = voice_manager(data)?;

        let tracks = queued_tracks(&manager, guild_id).await;
        if tracks.is_empty() {
            ctx.send(&nothing_playing()).await?;
            return Ok(());
        }

        let pages = generate_pages(&tracks);
        data.collectors
            .paginate(ctx.interaction(), pages, None, PaginateOptions::default())
            .await?;
        Ok(())
    }
}
