//! Leaving voice once nobody is left listening.

use poise::serenity_prelude::{ChannelId, GuildId};
use songbird::Songbird;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::Data;

type Timers = Arc<Mutex<HashMap<GuildId, (u64, AbortHandle)>>>;

/// Per-guild countdown that runs while the bot's voice channel has no
/// listeners and is called off as soon as someone is back.
pub struct EmptyChannelWatch {
    cooldown: Duration,
    timers: Timers,
    next_id: AtomicU64,
}

impl EmptyChannelWatch {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            timers: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    fn lock(timers: &Timers) -> MutexGuard<'_, HashMap<GuildId, (u64, AbortHandle)>> {
        timers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Starts the countdown when `listeners` is zero, cancels it otherwise.
    /// An already running countdown keeps its deadline. `leave` runs only if
    /// the countdown completes.
    pub fn update<F>(&self, guild_id: GuildId, listeners: usize, leave: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if listeners > 0 {
            self.cancel(guild_id);
            return;
        }

        let mut timers = Self::lock(&self.timers);
        if timers.contains_key(&guild_id) {
            return;
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let own_timers = Arc::clone(&self.timers);
        let cooldown = self.cooldown;
        debug!("Voice channel in guild {} is empty, leaving in {:?}", guild_id, cooldown);

        let task = tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            let expired = {
                let mut timers = Self::lock(&own_timers);
                if timers.get(&guild_id).is_some_and(|(timer, _)| *timer == id) {
                    timers.remove(&guild_id);
                    true
                } else {
                    false
                }
            };
            if expired {
                leave.await;
            }
        });
        timers.insert(guild_id, (id, task.abort_handle()));
    }

    pub fn cancel(&self, guild_id: GuildId) {
        if let Some((_, timer)) = Self::lock(&self.timers).remove(&guild_id) {
            debug!("Listener back in guild {}, staying in voice", guild_id);
            timer.abort();
        }
    }

    pub fn is_counting_down(&self, guild_id: GuildId) -> bool {
        Self::lock(&self.timers).contains_key(&guild_id)
    }
}

/// Re-checks who is left in the bot's voice channel after a voice state change.
pub async fn check_listeners(data: &Data, guild_id: GuildId) {
    let Some(manager) = data.songbird.clone() else {
        return;
    };

    let current = match manager.get(guild_id) {
        Some(call) => call.lock().await.current_channel(),
        None => None,
    };
    let channel = current.map(|c| ChannelId::new(c.0.get()));
    watch_channel(data, guild_id, channel, leave_voice(manager, guild_id)).await;
}

async fn watch_channel<F>(data: &Data, guild_id: GuildId, channel: Option<ChannelId>, leave: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let Some(channel_id) = channel else {
        data.voice_watch.cancel(guild_id);
        return;
    };
    match data.platform.voice_listeners(guild_id, channel_id).await {
        Ok(listeners) => data.voice_watch.update(guild_id, listeners, leave),
        Err(e) => debug!("Could not count listeners in {}: {}", channel_id, e),
    }
}

async fn leave_voice(manager: Arc<Songbird>, guild_id: GuildId) {
    info!("Voice channel in guild {} stayed empty, leaving.", guild_id);
    if let Err(e) = manager.remove(guild_id).await {
        warn!("Failed to leave voice in guild {}: {}", guild_id, e);
    }
}
