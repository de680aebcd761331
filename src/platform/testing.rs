//! In-memory platform that records every call, for unit tests.

use async_trait::async_trait;
use poise::serenity_prelude::{
    ChannelId, GuildId, InteractionId, MessageId, Permissions, UserId,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::*;
use crate::interaction::{
    CommandContext, CommandKind, ComponentContext, InteractionContext, ModalContext,
};

pub const GUILD_ID: u64 = 1;
pub const CHANNEL_ID: u64 = 2;
/// Id of the message returned for edits of an original response.
pub const ORIGINAL_MESSAGE_ID: u64 = 900;

#[derive(Debug, Clone)]
pub enum Call {
    SendMessage(ChannelId, Reply),
    EditMessage(SentMessage, Reply),
    Respond(InteractionId, InteractionResponse),
    EditOriginal(InteractionId, Reply),
    FollowUp(InteractionId, Reply),
    Fetch(InteractionId),
    Modal(InteractionId, ModalSpec),
}

#[derive(Default)]
pub struct RecordingPlatform {
    calls: Mutex<Vec<Call>>,
    modals: Mutex<Vec<(String, ModalCallback)>>,
    fail_edits: AtomicBool,
    fail_sends: AtomicBool,
    /// Fetches before the original response reports as confirmed; `usize::MAX` never confirms.
    confirm_after_fetches: AtomicUsize,
    fetches: AtomicUsize,
    listeners: Mutex<HashMap<ChannelId, usize>>,
}

impl RecordingPlatform {
    pub fn new() -> Arc<Self> {
        let platform = Self::default();
        platform.confirm_after_fetches.store(usize::MAX, Ordering::SeqCst);
        Arc::new(platform)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn fail_edits(&self, fail: bool) {
        self.fail_edits.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn confirm_after(&self, fetches: usize) {
        self.confirm_after_fetches.store(fetches, Ordering::SeqCst);
    }

    pub fn set_listeners(&self, channel_id: u64, listeners: usize) {
        self.listeners
            .lock()
            .unwrap()
            .insert(ChannelId::new(channel_id), listeners);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn take_modal(&self) -> Option<(String, ModalCallback)> {
        let mut modals = self.modals.lock().unwrap();
        if modals.is_empty() {
            None
        } else {
            Some(modals.remove(0))
        }
    }

    /// Waits for the next modal to be shown and hands back its submit callback.
    pub async fn next_modal(&self) -> ModalCallback {
        for _ in 0..100 {
            if let Some((_, callback)) = self.take_modal() {
                return callback;
            }
            tokio::task::yield_now().await;
        }
        panic!("modal was never shown");
    }

    /// Replies the user could see (initial messages, edits, follow-ups, message sends).
    pub fn visible_replies(&self) -> Vec<Reply> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Respond(_, InteractionResponse::Message(reply))
                | Call::Respond(_, InteractionResponse::UpdateMessage(reply))
                | Call::EditOriginal(_, reply)
                | Call::FollowUp(_, reply)
                | Call::SendMessage(_, reply)
                | Call::EditMessage(_, reply) => Some(reply),
                _ => None,
            })
            .collect()
    }

    pub fn user(user_id: u64) -> UserInfo {
        UserInfo {
            id: UserId::new(user_id),
            name: format!("user{user_id}"),
            global_name: None,
            avatar_url: None,
        }
    }

    pub fn interaction(self: &Arc<Self>, interaction_id: u64, user_id: u64) -> InteractionContext {
        self.interaction_in(interaction_id, user_id, Some(GUILD_ID), CHANNEL_ID)
    }

    pub fn interaction_in(
        self: &Arc<Self>,
        interaction_id: u64,
        user_id: u64,
        guild_id: Option<u64>,
        channel_id: u64,
    ) -> InteractionContext {
        InteractionContext::new(
            self.clone() as Arc<dyn Platform>,
            InteractionHandle {
                id: InteractionId::new(interaction_id),
                token: format!("token-{interaction_id}"),
            },
            Self::user(user_id),
            guild_id.map(GuildId::new),
            ChannelId::new(channel_id),
        )
    }

    pub fn click(
        self: &Arc<Self>,
        interaction_id: u64,
        user_id: u64,
        message_id: u64,
        custom_id: &str,
    ) -> ComponentContext {
        ComponentContext::new(
            self.interaction(interaction_id, user_id),
            MessageId::new(message_id),
            custom_id,
        )
    }

    pub fn command(
        self: &Arc<Self>,
        interaction_id: u64,
        name: &str,
        guild_id: Option<u64>,
        permissions: Option<Permissions>,
    ) -> CommandContext {
        CommandContext::new(
            self.interaction_in(interaction_id, 10, guild_id, CHANNEL_ID),
            CommandKind::ChatInput,
            name,
            HashMap::new(),
            permissions,
        )
    }

    pub fn modal_submission(
        self: &Arc<Self>,
        interaction_id: u64,
        channel_id: u64,
        custom_id: &str,
        values: &[(&str, &str)],
    ) -> ModalContext {
        ModalContext::new(
            self.interaction_in(interaction_id, 10, Some(GUILD_ID), channel_id),
            custom_id,
            values
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn original(&self) -> SentMessage {
        SentMessage {
            id: MessageId::new(ORIGINAL_MESSAGE_ID),
            channel_id: ChannelId::new(CHANNEL_ID),
        }
    }
}

#[async_trait]
impl Platform for RecordingPlatform {
    async fn send_message(
        &self,
        channel_id: ChannelId,
        reply: &Reply,
    ) -> Result<SentMessage, PlatformError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(PlatformError::Request("send failed".into()));
        }
        self.record(Call::SendMessage(channel_id, reply.clone()));
        Ok(SentMessage {
            id: MessageId::new(1000 + self.calls.lock().unwrap().len() as u64),
            channel_id,
        })
    }

    async fn edit_message(
        &self,
        message: &SentMessage,
        reply: &Reply,
    ) -> Result<SentMessage, PlatformError> {
        if self.fail_edits.load(Ordering::SeqCst) {
            return Err(PlatformError::Request("edit failed".into()));
        }
        self.record(Call::EditMessage(*message, reply.clone()));
        Ok(*message)
    }

    async fn create_response(
        &self,
        interaction: &InteractionHandle,
        response: InteractionResponse,
    ) -> Result<(), PlatformError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(PlatformError::Request("response failed".into()));
        }
        self.record(Call::Respond(interaction.id, response));
        Ok(())
    }

    async fn edit_original(
        &self,
        interaction: &InteractionHandle,
        reply: &Reply,
    ) -> Result<SentMessage, PlatformError> {
        if self.fail_edits.load(Ordering::SeqCst) {
            return Err(PlatformError::Request("edit failed".into()));
        }
        self.record(Call::EditOriginal(interaction.id, reply.clone()));
        Ok(self.original())
    }

    async fn follow_up(
        &self,
        interaction: &InteractionHandle,
        reply: &Reply,
    ) -> Result<SentMessage, PlatformError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(PlatformError::Request("follow-up failed".into()));
        }
        self.record(Call::FollowUp(interaction.id, reply.clone()));
        Ok(SentMessage {
            id: MessageId::new(2000),
            channel_id: ChannelId::new(CHANNEL_ID),
        })
    }

    async fn fetch_response(
        &self,
        interaction: &InteractionHandle,
    ) -> Result<ResponseState, PlatformError> {
        self.record(Call::Fetch(interaction.id));
        let seen = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
        if seen >= self.confirm_after_fetches.load(Ordering::SeqCst) {
            Ok(ResponseState {
                content: "done".into(),
                embed_count: 0,
            })
        } else {
            Ok(ResponseState::default())
        }
    }

    async fn send_modal(
        &self,
        interaction: &InteractionHandle,
        spec: &ModalSpec,
        on_submit: ModalCallback,
    ) -> Result<(), PlatformError> {
        self.record(Call::Modal(interaction.id, spec.clone()));
        let custom_id = format!("modal:{}", interaction.id);
        self.modals.lock().unwrap().push((custom_id, on_submit));
        Ok(())
    }

    async fn fetch_member(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
    ) -> Result<Option<MemberInfo>, PlatformError> {
        Ok(Some(MemberInfo {
            user: Self::user(user_id.get()),
            voice_channel: None,
        }))
    }

    async fn voice_listeners(
        &self,
        _guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<usize, PlatformError> {
        Ok(self
            .listeners
            .lock()
            .unwrap()
            .get(&channel_id)
            .copied()
            .unwrap_or(0))
    }
}
