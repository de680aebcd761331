//! The slice of the chat platform the interaction core depends on.
//!
//! Everything in `collector` and `commands` talks to Discord through the
//! [`Platform`] trait so that sessions can be driven by a recording fake in
//! tests and by serenity in production.

pub mod reply;
pub mod serenity;
#[cfg(test)]
pub mod testing;

use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, GuildId, InteractionId, MessageId, UserId};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::interaction::ModalContext;
pub use reply::{ActionRow, Button, ButtonStyle, Embed, ModalSpec, Reply, TextInput};

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("discord request failed: {0}")]
    Request(String),
    #[error("missing permissions: {0}")]
    Forbidden(String),
    #[error("{0} not found")]
    NotFound(&'static str),
}

/// Identity of an interaction, enough to answer it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionHandle {
    pub id: InteractionId,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub id: UserId,
    pub name: String,
    pub global_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl UserInfo {
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub user: UserInfo,
    pub voice_channel: Option<ChannelId>,
}

/// A message the bot has sent and may edit later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
}

/// What the platform currently shows as the original response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseState {
    pub content: String,
    pub embed_count: usize,
}

impl ResponseState {
    /// The primary response has landed once it renders anything at all.
    pub fn is_confirmed(&self) -> bool {
        !self.content.is_empty() || self.embed_count > 0
    }
}

/// Initial responses to an interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionResponse {
    Message(Reply),
    Defer { ephemeral: bool },
    /// Deferred update of the message a component is attached to.
    Acknowledge,
    UpdateMessage(Reply),
}

pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// One-shot handler for a modal submission.
pub type ModalCallback = Box<dyn FnOnce(ModalContext) -> BoxFuture + Send>;

#[async_trait]
pub trait Platform: Send + Sync {
    async fn send_message(
        &self,
        channel_id: ChannelId,
        reply: &Reply,
    ) -> Result<SentMessage, PlatformError>;

    async fn edit_message(
        &self,
        message: &SentMessage,
        reply: &Reply,
    ) -> Result<SentMessage, PlatformError>;

    async fn create_response(
        &self,
        interaction: &InteractionHandle,
        response: InteractionResponse,
    ) -> Result<(), PlatformError>;

    async fn edit_original(
        &self,
        interaction: &InteractionHandle,
        reply: &Reply,
    ) -> Result<SentMessage, PlatformError>;

    async fn follow_up(
        &self,
        interaction: &InteractionHandle,
        reply: &Reply,
    ) -> Result<SentMessage, PlatformError>;

    async fn fetch_response(
        &self,
        interaction: &InteractionHandle,
    ) -> Result<ResponseState, PlatformError>;

    /// Shows `spec` and arranges for `on_submit` to run at most once if the
    /// user submits. Nothing is reported if the user dismisses the modal.
    async fn send_modal(
        &self,
        interaction: &InteractionHandle,
        spec: &ModalSpec,
        on_submit: ModalCallback,
    ) -> Result<(), PlatformError>;

    async fn fetch_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<Option<MemberInfo>, PlatformError>;

    /// Members other than bots currently connected to `channel_id`.
    async fn voice_listeners(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<usize, PlatformError>;
}

/// Modal callbacks waiting for a submission, keyed by modal custom id.
pub struct PendingModals {
    callbacks: Mutex<HashMap<String, (Instant, ModalCallback)>>,
    max_age: Duration,
}

impl PendingModals {
    pub fn new(max_age: Duration) -> Self {
        Self {
            callbacks: Mutex::new(HashMap::new()),
            max_age,
        }
    }

    pub fn insert(&self, custom_id: String, callback: ModalCallback) {
        let mut callbacks = self.callbacks.lock().unwrap_or_else(|e| e.into_inner());
        let max_age = self.max_age;
        let before = callbacks.len();
        callbacks.retain(|_, (created, _)| created.elapsed() < max_age);
        if callbacks.len() < before {
            debug!("Dropped {} abandoned modal callbacks", before - callbacks.len());
        }
        callbacks.insert(custom_id, (Instant::now(), callback));
    }

    /// Removes the callback so a second submission finds nothing.
    pub fn take(&self, custom_id: &str) -> Option<ModalCallback> {
        let mut callbacks = self.callbacks.lock().unwrap_or_else(|e| e.into_inner());
        callbacks.remove(custom_id).map(|(_, callback)| callback)
    }

    pub fn len(&self) -> usize {
        self.callbacks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> ModalCallback {
        Box::new(|_ctx: ModalContext| -> BoxFuture { Box::pin(async {}) })
    }

    #[test]
    fn test_pending_modal_taken_once() {
        let pending = PendingModals::new(Duration::from_secs(600));
        pending.insert("modal:1".to_string(), noop());

        assert!(pending.take("modal:1").is_some());
        assert!(pending.take("modal:1").is_none());
        assert!(pending.is_empty());
    }

    #[test]
    fn test_response_state_confirmation() {
        assert!(!ResponseState::default().is_confirmed());
        assert!(ResponseState { content: "hi".into(), embed_count: 0 }.is_confirmed());
        assert!(ResponseState { content: String::new(), embed_count: 1 }.is_confirmed());
    }
}
