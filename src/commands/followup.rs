//! Delivery of a message queued during a command, once the command's own
//! response is visible.

use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::Timeouts;
use crate::interaction::InteractionContext;
use crate::platform::{PlatformError, Reply};

#[derive(Debug, thiserror::Error)]
pub enum RetrySendError {
    #[error("command not responded to after {attempts} checks")]
    NotRespondedInTime { attempts: u32 },
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Polls the original response every `interval`, at most `attempts` times,
/// and sends `reply` as a follow-up as soon as the response renders anything.
pub async fn send_after_command(
    ctx: &InteractionContext,
    reply: &Reply,
    interval: Duration,
    attempts: u32,
) -> Result<(), RetrySendError> {
    for attempt in 1..=attempts {
        tokio::time::sleep(interval).await;

        if ctx.fetch().await?.is_confirmed() {
            ctx.follow_up(reply).await?;
            return Ok(());
        }
        debug!(
            "Response to interaction {} not visible yet ({}/{})",
            ctx.handle.id, attempt, attempts
        );
    }

    Err(RetrySendError::NotRespondedInTime { attempts })
}

/// Runs [`send_after_command`] in the background. Failures are only logged.
pub fn spawn_after_command(ctx: InteractionContext, reply: Reply, timeouts: &Timeouts) -> JoinHandle<()> {
    let interval = timeouts.after_command_interval;
    let attempts = timeouts.after_command_attempts;

    tokio::spawn(async move {
        if let Err(e) = send_after_command(&ctx, &reply, interval, attempts).await {
            warn!("Failed to send after-command message: {}", e);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::testing::{Call, RecordingPlatform};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_five_checks() {
        let platform = RecordingPlatform::new();
        let ctx = platform.interaction(1, 10);
        let started = Instant::now();

        let result = send_after_command(&ctx, &Reply::text("later"), Duration::from_secs(1), 5).await;

        assert!(matches!(result, Err(RetrySendError::NotRespondedInTime { attempts: 5 })));
        assert_eq!(platform.fetch_count(), 5);
        assert_eq!(started.elapsed(), Duration::from_secs(5));
        assert!(!platform.calls().iter().any(|c| matches!(c, Call::FollowUp(..))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sends_once_response_is_visible() {
        let platform = RecordingPlatform::new();
        platform.confirm_after(3);
        let ctx = platform.interaction(1, 10);

        send_after_command(&ctx, &Reply::text("later"), Duration::from_secs(1), 5)
            .await
            .unwrap();

        assert_eq!(platform.fetch_count(), 3);
        let follow_ups: Vec<_> = platform
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::FollowUp(..)))
            .collect();
        assert_eq!(follow_ups.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_send_swallows_failure() {
        let platform = RecordingPlatform::new();
        let ctx = platform.interaction(1, 10);

        spawn_after_command(ctx, Reply::text("later"), &Timeouts::default())
            .await
            .unwrap();
        assert_eq!(platform.fetch_count(), 5);
    }
}
