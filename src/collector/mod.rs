//! Time-boxed collection of component clicks, keyed by the message they target.
//!
//! The gateway hands every component interaction to [`CollectorRegistry::verify`].
//! Sessions that want clicks register a collector for their message and read
//! [`CollectorEvent`]s from the returned handle.

pub mod modal;
pub mod pagination;

use poise::serenity_prelude::MessageId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use crate::config::{icons, Timeouts};
use crate::interaction::ComponentContext;
use crate::platform::Reply;

pub use modal::{await_modal_input, ModalError, ModalOptions};
pub use pagination::{HandlerOutcome, NewPages, PageComponentHandler, PaginateOptions, PaginationError};

pub type ClickFilter = Arc<dyn Fn(&ComponentContext) -> bool + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    /// The collector reached its click limit.
    Limit,
    /// The countdown elapsed.
    Time,
    /// Stopped by its owner.
    Stopped(String),
}

pub enum CollectorEvent {
    Collect(ComponentContext),
    End {
        reason: EndReason,
        collected: Vec<ComponentContext>,
    },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CollectorError {
    #[error("no interaction was collected before the collector timed out")]
    TimedOut,
    #[error("collector closed without ending")]
    Closed,
}

struct ActiveCollector {
    id: u64,
    message_id: MessageId,
    filter: ClickFilter,
    collected: Vec<ComponentContext>,
    limit: Option<usize>,
    events: mpsc::UnboundedSender<CollectorEvent>,
    timer: Option<AbortHandle>,
}

#[derive(Default)]
struct RegistryState {
    collectors: Vec<ActiveCollector>,
    /// Unmatched-click markers: message id -> (marker generation, expiry timer).
    expire_timers: HashMap<MessageId, (u64, AbortHandle)>,
    next_id: u64,
}

impl RegistryState {
    /// Removes the collector and emits its single `End`. No-op if it already ended.
    fn stop(&mut self, id: u64, reason: EndReason) -> bool {
        let Some(pos) = self.collectors.iter().position(|c| c.id == id) else {
            return false;
        };
        let collector = self.collectors.remove(pos);
        if let Some(timer) = collector.timer {
            timer.abort();
        }
        debug!(
            "Collector {} on message {} ended: {:?} ({} collected)",
            id,
            collector.message_id,
            reason,
            collector.collected.len()
        );
        let _ = collector.events.send(CollectorEvent::End {
            reason,
            collected: collector.collected,
        });
        true
    }
}

enum VerifyOutcome {
    Collected,
    Rejected,
    FirstUnmatched,
    Stale,
}

/// Registry of active collectors.
pub struct CollectorRegistry {
    state: Arc<Mutex<RegistryState>>,
    timeouts: Timeouts,
}

impl CollectorRegistry {
    pub fn new(timeouts: Timeouts) -> Self {
        Self {
            state: Arc::new(Mutex::new(RegistryState::default())),
            timeouts,
        }
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Starts collecting clicks on `message_id`. The collector stops itself
    /// after `timeout`, after `limit` accepted clicks, or when stopped through
    /// the handle (dropping the handle stops it too).
    pub fn create_collector(
        &self,
        message_id: MessageId,
        filter: ClickFilter,
        timeout: Option<Duration>,
        limit: Option<usize>,
    ) -> CollectorHandle {
        let timeout = timeout.unwrap_or(self.timeouts.collector);
        let (tx, rx) = mpsc::unbounded_channel();

        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;

        // The timer can't observe the collector until the lock is released,
        // by which point it has been pushed.
        let timer_state = Arc::clone(&self.state);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let mut state = timer_state.lock().unwrap_or_else(|e| e.into_inner());
            state.stop(id, EndReason::Time);
        });

        state.collectors.push(ActiveCollector {
            id,
            message_id,
            filter,
            collected: Vec::new(),
            limit,
            events: tx,
            timer: Some(timer.abort_handle()),
        });
        drop(state);

        debug!("Collector {} registered on message {}", id, message_id);

        CollectorHandle {
            events: rx,
            stopper: CollectorStopper {
                state: Arc::clone(&self.state),
                id,
            },
        }
    }

    /// Waits for `limit` clicks on `message_id` that pass `filter`.
    pub async fn await_clicks(
        &self,
        message_id: MessageId,
        filter: ClickFilter,
        timeout: Option<Duration>,
        limit: usize,
    ) -> Result<Vec<ComponentContext>, CollectorError> {
        let mut handle = self.create_collector(message_id, filter, timeout, Some(limit.max(1)));

        while let Some(event) = handle.next().await {
            if let CollectorEvent::End { reason, collected } = event {
                return match reason {
                    EndReason::Time => Err(CollectorError::TimedOut),
                    _ => Ok(collected),
                };
            }
        }
        Err(CollectorError::Closed)
    }

    /// Entry point for every component interaction the bot receives.
    pub async fn verify(&self, click: ComponentContext) {
        let outcome = self.route_click(&click);

        match outcome {
            VerifyOutcome::Collected | VerifyOutcome::FirstUnmatched => {}
            VerifyOutcome::Rejected => {
                debug!(
                    "User {} clicked a component on message {} that is not theirs",
                    click.user.id, click.message_id
                );
                let notice = Reply::text(format!("{} That button is not for u.", icons::CONFUSED))
                    .ephemeral(true);
                if let Err(e) = click.send(&notice).await {
                    warn!("Failed to send wrong-user notice: {}", e);
                }
            }
            VerifyOutcome::Stale => {
                debug!("Stale click on message {}", click.message_id);
                let broke = Reply::text(format!(
                    "{} That button broke..? Try running the command again.",
                    icons::CONFUSED
                ));
                if let Err(e) = click.acknowledge().await {
                    warn!("Failed to acknowledge stale click: {}", e);
                    return;
                }
                if let Err(e) = click.edit_original(&broke).await {
                    warn!("Failed to edit stale click message: {}", e);
                }
            }
        }
    }

    /// All registry mutation for one click happens under a single lock.
    fn route_click(&self, click: &ComponentContext) -> VerifyOutcome {
        let mut state = self.lock();

        if let Some(pos) = state
            .collectors
            .iter()
            .position(|c| c.message_id == click.message_id)
        {
            let collector = &mut state.collectors[pos];
            if !(collector.filter)(click) {
                return VerifyOutcome::Rejected;
            }

            collector.collected.push(click.clone());
            let _ = collector.events.send(CollectorEvent::Collect(click.clone()));

            if collector
                .limit
                .is_some_and(|limit| collector.collected.len() >= limit)
            {
                let id = collector.id;
                state.stop(id, EndReason::Limit);
            }
            return VerifyOutcome::Collected;
        }

        // No collector: either it has not been registered yet, or it already ended.
        if let Some((_, timer)) = state.expire_timers.remove(&click.message_id) {
            timer.abort();
            return VerifyOutcome::Stale;
        }

        let generation = state.next_id;
        state.next_id += 1;
        let message_id = click.message_id;
        let grace = self.timeouts.stale_click_grace;
        let timer_state = Arc::clone(&self.state);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let mut state = timer_state.lock().unwrap_or_else(|e| e.into_inner());
            if state
                .expire_timers
                .get(&message_id)
                .is_some_and(|(g, _)| *g == generation)
            {
                state.expire_timers.remove(&message_id);
            }
        });
        state
            .expire_timers
            .insert(message_id, (generation, timer.abort_handle()));
        VerifyOutcome::FirstUnmatched
    }

    pub fn is_collecting(&self, message_id: MessageId) -> bool {
        self.lock()
            .collectors
            .iter()
            .any(|c| c.message_id == message_id)
    }

    pub fn active_count(&self) -> usize {
        self.lock().collectors.len()
    }
}

/// Stops one collector; safe to call after it already ended.
struct CollectorStopper {
    state: Arc<Mutex<RegistryState>>,
    id: u64,
}

impl CollectorStopper {
    fn stop(&self, reason: impl Into<String>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.stop(self.id, EndReason::Stopped(reason.into()));
    }
}

/// Receiving end of a collector.
pub struct CollectorHandle {
    events: mpsc::UnboundedReceiver<CollectorEvent>,
    stopper: CollectorStopper,
}

impl CollectorHandle {
    pub async fn next(&mut self) -> Option<CollectorEvent> {
        self.events.recv().await
    }

    pub fn stop(&self, reason: impl Into<String>) {
        self.stopper.stop(reason);
    }
}

impl Drop for CollectorHandle {
    fn drop(&mut self) {
        self.stopper.stop("dropped");
    }
}

/// Filter accepting clicks from one user only.
pub fn same_user(user_id: poise::serenity_prelude::UserId) -> ClickFilter {
    Arc::new(move |click: &ComponentContext| click.user.id == user_id)
}
