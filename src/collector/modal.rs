//! Show a modal and wait, bounded, for its submission.

use poise::serenity_prelude::ChannelId;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::interaction::{InteractionContext, ModalContext};
use crate::platform::{BoxFuture, ModalSpec, PlatformError, Reply};

#[derive(Debug, thiserror::Error)]
pub enum ModalError {
    #[error("modal was never submitted")]
    NotSubmitted,
    #[error("modal was submitted from a different channel")]
    ChannelChanged,
    #[error("modal submission was dropped before it resolved")]
    Abandoned,
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

#[derive(Debug, Clone)]
pub struct ModalOptions {
    pub timeout: Duration,
    /// When set, a submission from any other channel is refused.
    pub origin_channel: Option<ChannelId>,
    /// Ephemeral notice for a submission that arrives after the timeout.
    pub late_notice: String,
}

impl ModalOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            origin_channel: None,
            late_notice: "Your time to submit the modal has run out.".to_string(),
        }
    }

    pub fn origin_channel(mut self, channel_id: ChannelId) -> Self {
        self.origin_channel = Some(channel_id);
        self
    }

    pub fn late_notice(mut self, notice: impl Into<String>) -> Self {
        self.late_notice = notice.into();
        self
    }
}

type Resolution = Result<ModalContext, ModalError>;

/// Presents `spec` on `ctx` and returns the submission. Resolves exactly once:
/// whichever of submission and timeout claims the sender first wins, and a
/// submission that loses is told it arrived too late.
pub async fn await_modal_input(
    ctx: &InteractionContext,
    spec: &ModalSpec,
    options: ModalOptions,
) -> Result<ModalContext, ModalError> {
    let (tx, rx) = oneshot::channel::<Resolution>();
    let slot = Arc::new(Mutex::new(Some(tx)));

    let callback_slot = Arc::clone(&slot);
    let origin_channel = options.origin_channel;
    let late_notice = options.late_notice.clone();

    ctx.send_modal(
        spec,
        Box::new(move |submission: ModalContext| -> BoxFuture {
            Box::pin(async move {
                let sender = callback_slot
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .take();

                let Some(sender) = sender else {
                    debug!("Modal {} submitted after timeout", submission.custom_id);
                    let notice = Reply::text(late_notice).ephemeral(true);
                    if let Err(e) = submission.send(&notice).await {
                        warn!("Failed to send late modal notice: {}", e);
                    }
                    return;
                };

                if origin_channel.is_some_and(|channel| channel != submission.channel_id) {
                    let notice = Reply::text("you changed channels while submitting?").ephemeral(true);
                    if let Err(e) = submission.send(&notice).await {
                        warn!("Failed to send channel change notice: {}", e);
                    }
                    let _ = sender.send(Err(ModalError::ChannelChanged));
                    return;
                }

                let _ = sender.send(Ok(submission));
            })
        }),
    )
    .await?;

    let mut rx = rx;
    match tokio::time::timeout(options.timeout, &mut rx).await {
        Ok(resolution) => resolution.unwrap_or(Err(ModalError::Abandoned)),
        Err(_) => {
            let unclaimed = slot.lock().unwrap_or_else(|e| e.into_inner()).take();
            if unclaimed.is_some() {
                return Err(ModalError::NotSubmitted);
            }
            // A submission claimed the sender just as the timer fired.
            rx.await.unwrap_or(Err(ModalError::Abandoned))
        }
    }
}
