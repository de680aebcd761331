//! Response contexts for command, component and modal interactions.
//!
//! Discord allows exactly one initial response per interaction; everything
//! after it is either an edit of that response or a follow-up. The contexts
//! here track which phase an interaction is in so callers can just `send`.

use poise::serenity_prelude::{ChannelId, GuildId, MessageId, Permissions};
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, Mutex};

use crate::platform::{
    InteractionHandle, InteractionResponse, ModalCallback, ModalSpec, Platform, PlatformError,
    Reply, ResponseState, SentMessage, UserInfo,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseStatus {
    Pending,
    Deferred,
    Responded,
}

/// Shared state of one interaction. Cheap to clone; clones share the response status.
#[derive(Clone)]
pub struct InteractionContext {
    platform: Arc<dyn Platform>,
    pub handle: InteractionHandle,
    pub user: UserInfo,
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    status: Arc<Mutex<ResponseStatus>>,
}

impl InteractionContext {
    pub fn new(
        platform: Arc<dyn Platform>,
        handle: InteractionHandle,
        user: UserInfo,
        guild_id: Option<GuildId>,
        channel_id: ChannelId,
    ) -> Self {
        Self {
            platform,
            handle,
            user,
            guild_id,
            channel_id,
            status: Arc::new(Mutex::new(ResponseStatus::Pending)),
        }
    }

    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.platform
    }

    fn status(&self) -> ResponseStatus {
        *self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_status(&self, status: ResponseStatus) {
        *self.status.lock().unwrap_or_else(|e| e.into_inner()) = status;
    }

    pub fn is_deferred(&self) -> bool {
        self.status() == ResponseStatus::Deferred
    }

    pub fn has_responded(&self) -> bool {
        self.status() != ResponseStatus::Pending
    }

    /// Answers the interaction: initial response, then edit of a deferral, then follow-ups.
    pub async fn send(&self, reply: &Reply) -> Result<(), PlatformError> {
        match self.status() {
            ResponseStatus::Pending => {
                self.platform
                    .create_response(&self.handle, InteractionResponse::Message(reply.clone()))
                    .await?;
                self.set_status(ResponseStatus::Responded);
            }
            ResponseStatus::Deferred => {
                self.platform.edit_original(&self.handle, reply).await?;
                self.set_status(ResponseStatus::Responded);
            }
            ResponseStatus::Responded => {
                self.platform.follow_up(&self.handle, reply).await?;
            }
        }
        Ok(())
    }

    pub async fn defer(&self, ephemeral: bool) -> Result<(), PlatformError> {
        if self.status() != ResponseStatus::Pending {
            return Ok(());
        }
        self.platform
            .create_response(&self.handle, InteractionResponse::Defer { ephemeral })
            .await?;
        self.set_status(ResponseStatus::Deferred);
        Ok(())
    }

    pub async fn edit_original(&self, reply: &Reply) -> Result<SentMessage, PlatformError> {
        let message = self.platform.edit_original(&self.handle, reply).await?;
        self.set_status(ResponseStatus::Responded);
        Ok(message)
    }

    pub async fn follow_up(&self, reply: &Reply) -> Result<SentMessage, PlatformError> {
        self.platform.follow_up(&self.handle, reply).await
    }

    pub async fn fetch(&self) -> Result<ResponseState, PlatformError> {
        self.platform.fetch_response(&self.handle).await
    }

    pub async fn send_modal(
        &self,
        spec: &ModalSpec,
        on_submit: ModalCallback,
    ) -> Result<(), PlatformError> {
        self.platform.send_modal(&self.handle, spec, on_submit).await?;
        self.set_status(ResponseStatus::Responded);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    ChatInput,
    User,
    Message,
}

/// A slash (or context-menu) command invocation.
pub struct CommandContext {
    inner: InteractionContext,
    pub kind: CommandKind,
    pub name: String,
    pub options: HashMap<String, String>,
    /// Invoking member's resolved permissions; `None` outside a server.
    pub member_permissions: Option<Permissions>,
    after_command: Mutex<Option<Reply>>,
}

impl CommandContext {
    pub fn new(
        inner: InteractionContext,
        kind: CommandKind,
        name: impl Into<String>,
        options: HashMap<String, String>,
        member_permissions: Option<Permissions>,
    ) -> Self {
        Self {
            inner,
            kind,
            name: name.into(),
            options,
            member_permissions,
            after_command: Mutex::new(None),
        }
    }

    pub fn interaction(&self) -> &InteractionContext {
        &self.inner
    }

    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }

    /// Queues a message to be sent as a follow-up once the command's own
    /// response is visible. Replaces any previously queued message.
    pub fn send_after_command(&self, reply: Reply) {
        *self.after_command.lock().unwrap_or_else(|e| e.into_inner()) = Some(reply);
    }

    pub(crate) fn take_after_command(&self) -> Option<Reply> {
        self.after_command
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }
}

impl Deref for CommandContext {
    type Target = InteractionContext;

    fn deref(&self) -> &InteractionContext {
        &self.inner
    }
}

/// A click on a message component.
#[derive(Clone)]
pub struct ComponentContext {
    inner: InteractionContext,
    pub message_id: MessageId,
    pub custom_id: String,
}

impl ComponentContext {
    pub fn new(inner: InteractionContext, message_id: MessageId, custom_id: impl Into<String>) -> Self {
        Self {
            inner,
            message_id,
            custom_id: custom_id.into(),
        }
    }

    /// Defers an update of the parent message.
    pub async fn acknowledge(&self) -> Result<(), PlatformError> {
        if self.inner.has_responded() {
            return Ok(());
        }
        self.inner
            .platform
            .create_response(&self.inner.handle, InteractionResponse::Acknowledge)
            .await?;
        self.inner.set_status(ResponseStatus::Deferred);
        Ok(())
    }

    /// Replaces the message this component is attached to.
    pub async fn edit_parent(&self, reply: &Reply) -> Result<(), PlatformError> {
        if self.inner.has_responded() {
            self.inner.platform.edit_original(&self.inner.handle, reply).await?;
        } else {
            self.inner
                .platform
                .create_response(
                    &self.inner.handle,
                    InteractionResponse::UpdateMessage(reply.clone()),
                )
                .await?;
        }
        self.inner.set_status(ResponseStatus::Responded);
        Ok(())
    }
}

impl Deref for ComponentContext {
    type Target = InteractionContext;

    fn deref(&self) -> &InteractionContext {
        &self.inner
    }
}

/// A submitted modal.
#[derive(Clone)]
pub struct ModalContext {
    inner: InteractionContext,
    pub custom_id: String,
    pub values: HashMap<String, String>,
}

impl ModalContext {
    pub fn new(
        inner: InteractionContext,
        custom_id: impl Into<String>,
        values: HashMap<String, String>,
    ) -> Self {
        Self {
            inner,
            custom_id: custom_id.into(),
            values,
        }
    }

    pub fn value(&self, input_id: &str) -> Option<&str> {
        self.values.get(input_id).map(String::as_str)
    }
}

impl Deref for ModalContext {
    type Target = InteractionContext;

    fn deref(&self) -> &InteractionContext {
        &self.inner
    }
}
