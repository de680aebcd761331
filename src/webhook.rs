//! Optional bot-log channel fed through a Discord webhook.

use async_trait::async_trait;
use poise::serenity_prelude::{ExecuteWebhook, Http, Webhook};
use std::sync::Arc;

use crate::platform::serenity::create_embed;
use crate::platform::{Embed, PlatformError};

/// Where feedback, DM replies and guild join/leave notices go.
#[async_trait]
pub trait BotLogs: Send + Sync {
    async fn send(&self, content: Option<String>, embed: Embed) -> Result<(), PlatformError>;
}

pub struct WebhookLogs {
    http: Arc<Http>,
    webhook: Webhook,
}

impl WebhookLogs {
    pub async fn connect(http: Arc<Http>, url: &str) -> Result<Self, PlatformError> {
        let webhook = Webhook::from_url(&http, url)
            .await
            .map_err(|e| PlatformError::Request(format!("bot logs webhook: {e}")))?;
        Ok(Self { http, webhook })
    }
}

#[async_trait]
impl BotLogs for WebhookLogs {
    async fn send(&self, content: Option<String>, embed: Embed) -> Result<(), PlatformError> {
        let mut message = ExecuteWebhook::new().embed(create_embed(&embed));
        if let Some(content) = content {
            message = message.content(content);
        }
        self.webhook
            .execute(&self.http, false, message)
            .await
            .map_err(|e| PlatformError::Request(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingLogs {
        pub sent: Mutex<Vec<(Option<String>, Embed)>>,
        pub fail: AtomicBool,
    }

    impl RecordingLogs {
        pub fn sent(&self) -> Vec<(Option<String>, Embed)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BotLogs for RecordingLogs {
        async fn send(&self, content: Option<String>, embed: Embed) -> Result<(), PlatformError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(PlatformError::Request("webhook down".into()));
            }
            self.sent.lock().unwrap().push((content, embed));
            Ok(())
        }
    }
}
