use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{Event, EventContext, EventHandler as VoiceEventHandler};
use std::sync::Arc;
use tracing::{error, warn};

use crate::config::icons;
use crate::platform::{Platform, Reply};

/// Tells the channel a track was queued from that it could not be played.
pub struct TrackErrorNotifier {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub platform: Arc<dyn Platform>,
}

#[async_trait]
impl VoiceEventHandler for TrackErrorNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(tracks) = ctx {
            for (state, _) in tracks.iter() {
                error!("Guild {} queue error: {:?}", self.guild_id, state.playing);
            }
            notify_track_error(self.platform.as_ref(), self.channel_id).await;
        }
        None
    }
}

pub async fn notify_track_error(platform: &dyn Platform, channel_id: ChannelId) {
    let notice = Reply::text(format!(
        "{} there was an error trying to play the track...",
        icons::CONFUSED
    ));
    if let Err(e) = platform.send_message(channel_id, &notice).await {
        warn!("Failed to report track error in {}: {}", channel_id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::testing::{Call, RecordingPlatform, CHANNEL_ID};

    #[tokio::test]
    async fn test_track_error_notice_goes_to_queue_channel() {
        let platform = RecordingPlatform::new();

        notify_track_error(platform.as_ref(), ChannelId::new(CHANNEL_ID)).await;

        let calls = platform.calls();
        let Some(Call::SendMessage(channel, notice)) = calls.first() else {
            panic!("no notice sent");
        };
        assert_eq!(*channel, ChannelId::new(CHANNEL_ID));
        assert!(notice
            .content
            .as_deref()
            .unwrap()
            .ends_with("there was an error trying to play the track..."));
    }

    #[tokio::test]
    async fn test_track_error_notice_failure_is_swallowed() {
        let platform = RecordingPlatform::new();
        platform.fail_sends(true);

        notify_track_error(platform.as_ref(), ChannelId::new(CHANNEL_ID)).await;
        assert!(platform.calls().is_empty());
    }
}
