//! Button-driven pagination on top of the collector registry.

use async_trait::async_trait;
use tracing::{debug, error, warn};

use super::{same_user, CollectorRegistry};
use crate::interaction::{ComponentContext, InteractionContext};
use crate::platform::reply::{disable_all_components, NEXT_ID, PAGE_NUMBER_ID, PREVIOUS_ID};
use crate::platform::{ActionRow, Button, PlatformError, Reply, SentMessage};
use crate::Error;

#[derive(Debug, thiserror::Error)]
pub enum PaginationError {
    #[error("cannot paginate an empty page set")]
    NoPages,
    #[error("starting page {start} is out of range for {len} pages")]
    StartOutOfRange { start: usize, len: usize },
    #[error("new pages array length ({actual}) must match old pages length ({expected}) when not resetting page number")]
    PageCountMismatch { expected: usize, actual: usize },
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

#[derive(Debug, Clone, Copy)]
pub struct PaginateOptions {
    /// Append Previous / page indicator / Next to every page.
    pub add_page_components: bool,
    /// 0-based page shown first.
    pub starting_page: usize,
}

impl Default for PaginateOptions {
    fn default() -> Self {
        Self {
            add_page_components: true,
            starting_page: 0,
        }
    }
}

/// Replacement page set returned by a [`PageComponentHandler`].
#[derive(Debug, Clone)]
pub struct NewPages {
    pub messages: Vec<Reply>,
    pub add_page_components: bool,
    /// Go back to page 0. When false the new set must be the same length as the old one.
    pub reset_page_number: bool,
}

impl NewPages {
    pub fn new(messages: Vec<Reply>) -> Self {
        Self {
            messages,
            add_page_components: true,
            reset_page_number: true,
        }
    }

    pub fn keep_page(mut self) -> Self {
        self.reset_page_number = false;
        self
    }

    pub fn without_page_components(mut self) -> Self {
        self.add_page_components = false;
        self
    }
}

#[derive(Debug, Clone)]
pub struct HandlerOutcome {
    pub continue_pagination: bool,
    pub new_pages: Option<NewPages>,
}

impl HandlerOutcome {
    pub fn proceed() -> Self {
        Self {
            continue_pagination: true,
            new_pages: None,
        }
    }

    pub fn stop() -> Self {
        Self {
            continue_pagination: false,
            new_pages: None,
        }
    }

    pub fn with_pages(mut self, pages: NewPages) -> Self {
        self.new_pages = Some(pages);
        self
    }
}

/// Handles clicks on page components other than the navigation buttons.
#[async_trait]
pub trait PageComponentHandler: Send + Sync {
    async fn handle(&self, click: &ComponentContext, page: usize) -> Result<HandlerOutcome, Error>;
}

/// Appends a navigation row to every page.
pub fn add_page_buttons(pages: &mut [Reply]) {
    let total = pages.len();
    for (i, page) in pages.iter_mut().enumerate() {
        page.components.push(ActionRow::new(vec![
            Button::previous_page(i == 0),
            Button::page_indicator(i, total),
            Button::next_page(i + 1 == total),
        ]));
    }
}

impl CollectorRegistry {
    /// Renders `pages` as the original response of `ctx` and lets the invoking
    /// user flip through them until no click arrives within the pagination
    /// timeout. Components are disabled when the session ends on its own.
    pub async fn paginate(
        &self,
        ctx: &InteractionContext,
        mut pages: Vec<Reply>,
        handler: Option<&dyn PageComponentHandler>,
        options: PaginateOptions,
    ) -> Result<(), PaginationError> {
        if pages.is_empty() {
            return Err(PaginationError::NoPages);
        }

        if pages.len() == 1 && (handler.is_none() || !pages[0].has_components()) {
            ctx.edit_original(&pages[0]).await?;
            return Ok(());
        }

        if options.starting_page >= pages.len() {
            return Err(PaginationError::StartOutOfRange {
                start: options.starting_page,
                len: pages.len(),
            });
        }

        if options.add_page_components && pages.len() > 1 {
            add_page_buttons(&mut pages);
        }

        let mut page = options.starting_page;
        let message = ctx.edit_original(&pages[page]).await?;

        loop {
            let clicks = self
                .await_clicks(
                    message.id,
                    same_user(ctx.user.id),
                    Some(self.timeouts.pagination),
                    1,
                )
                .await;

            let click = match clicks.map(|c| c.into_iter().next()) {
                Ok(Some(click)) => click,
                Ok(None) => {
                    disable_components(ctx, &message, &pages[page]).await;
                    return Ok(());
                }
                Err(e) => {
                    debug!("Pagination on message {} ended: {}", message.id, e);
                    disable_components(ctx, &message, &pages[page]).await;
                    return Ok(());
                }
            };

            if let Err(e) = click.acknowledge().await {
                warn!("Failed to acknowledge page click: {}", e);
                disable_components(ctx, &message, &pages[page]).await;
                return Ok(());
            }

            let target = match click.custom_id.as_str() {
                PREVIOUS_ID => page.checked_sub(1),
                NEXT_ID => (page + 1 < pages.len()).then_some(page + 1),
                PAGE_NUMBER_ID => None,
                _ => {
                    let Some(handler) = handler else {
                        continue;
                    };

                    let outcome = match handler.handle(&click, page).await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            error!("Page component handler failed: {}", e);
                            disable_components(ctx, &message, &pages[page]).await;
                            return Ok(());
                        }
                    };

                    if let Some(new_pages) = outcome.new_pages {
                        if !new_pages.reset_page_number && new_pages.messages.len() != pages.len()
                        {
                            disable_components(ctx, &message, &pages[page]).await;
                            return Err(PaginationError::PageCountMismatch {
                                expected: pages.len(),
                                actual: new_pages.messages.len(),
                            });
                        }
                        if new_pages.messages.is_empty() {
                            disable_components(ctx, &message, &pages[page]).await;
                            return Err(PaginationError::NoPages);
                        }

                        pages = new_pages.messages;
                        if new_pages.add_page_components && pages.len() > 1 {
                            add_page_buttons(&mut pages);
                        }
                        if new_pages.reset_page_number {
                            page = 0;
                        }

                        if let Err(e) = click.edit_parent(&pages[page]).await {
                            warn!("Failed to render replacement page: {}", e);
                            disable_components(ctx, &message, &pages[page]).await;
                            return Ok(());
                        }
                    }

                    // Deliberate stop: leave the message as rendered.
                    if !outcome.continue_pagination {
                        return Ok(());
                    }
                    continue;
                }
            };

            if let Some(target) = target {
                page = target;
                if let Err(e) = click.edit_parent(&pages[page]).await {
                    warn!("Failed to render page {}: {}", page, e);
                    disable_components(ctx, &message, &pages[page]).await;
                    return Ok(());
                }
            }
        }
    }
}

async fn disable_components(ctx: &InteractionContext, message: &SentMessage, page: &Reply) {
    let mut disabled = page.clone();
    disabled.components = disable_all_components(&page.components);

    if let Err(e) = ctx.platform().edit_message(message, &disabled).await {
        warn!("Failed to disable components on message {}: {}", message.id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timeouts;
    use crate::platform::testing::{Call, RecordingPlatform, ORIGINAL_MESSAGE_ID};
    use poise::serenity_prelude::MessageId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn pages(n: usize) -> Vec<Reply> {
        (0..n).map(|i| Reply::text(format!("page {i}"))).collect()
    }

    async fn wait_for_collector(registry: &CollectorRegistry) {
        for _ in 0..1000 {
            if registry.is_collecting(MessageId::new(ORIGINAL_MESSAGE_ID)) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("pagination never started collecting");
    }

    async fn click(registry: &CollectorRegistry, platform: &Arc<RecordingPlatform>, id: u64, custom_id: &str) {
        wait_for_collector(registry).await;
        registry
            .verify(platform.click(id, 10, ORIGINAL_MESSAGE_ID, custom_id))
            .await;
        wait_for_collector(registry).await;
    }

    fn last_render(platform: &RecordingPlatform) -> Reply {
        platform
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::EditOriginal(_, reply) => Some(reply),
                _ => None,
            })
            .last()
            .expect("nothing rendered")
    }

    fn spawn_paginate(
        registry: &Arc<CollectorRegistry>,
        platform: &Arc<RecordingPlatform>,
        pages: Vec<Reply>,
        handler: Option<Arc<dyn PageComponentHandler>>,
    ) -> tokio::task::JoinHandle<Result<(), PaginationError>> {
        let registry = Arc::clone(registry);
        let ctx = platform.interaction(1, 10);
        tokio::spawn(async move {
            registry
                .paginate(&ctx, pages, handler.as_deref(), PaginateOptions::default())
                .await
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_page_renders_once_without_collector() {
        let platform = RecordingPlatform::new();
        let registry = CollectorRegistry::new(Timeouts::default());
        let ctx = platform.interaction(1, 10);

        registry
            .paginate(&ctx, pages(1), None, PaginateOptions::default())
            .await
            .unwrap();

        assert_eq!(platform.calls().len(), 1);
        assert_eq!(last_render(&platform).content.as_deref(), Some("page 0"));
        assert!(last_render(&platform).components.is_empty());
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_walkthrough() {
        let platform = RecordingPlatform::new();
        let registry = Arc::new(CollectorRegistry::new(Timeouts::default()));
        let task = spawn_paginate(&registry, &platform, pages(3), None);

        click(&registry, &platform, 2, "next").await;
        click(&registry, &platform, 3, "next").await;
        click(&registry, &platform, 4, "next").await;
        assert_eq!(last_render(&platform).content.as_deref(), Some("page 2"));
        click(&registry, &platform, 5, "previous").await;

        let shown = last_render(&platform);
        assert_eq!(shown.content.as_deref(), Some("page 1"));
        let nav = &shown.components.last().unwrap().buttons;
        assert!(!nav[0].disabled, "previous should be enabled");
        assert_eq!(nav[1].label, "Page 2 / 3");
        assert!(!nav[2].disabled, "next should be enabled");

        // The no-op click at the last page rendered nothing
        let renders = platform
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::EditOriginal(..)))
            .count();
        assert_eq!(renders, 4);

        tokio::time::sleep(Duration::from_secs(91)).await;
        task.await.unwrap().unwrap();

        let Some(Call::EditMessage(_, disabled)) = platform.calls().last().cloned() else {
            panic!("components were not disabled");
        };
        assert_eq!(disabled.content.as_deref(), Some("page 1"));
        assert!(disabled.components.iter().flat_map(|r| &r.buttons).all(|b| b.disabled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_previous_on_first_page_is_noop() {
        let platform = RecordingPlatform::new();
        let registry = Arc::new(CollectorRegistry::new(Timeouts::default()));
        let _task = spawn_paginate(&registry, &platform, pages(2), None);

        click(&registry, &platform, 2, "previous").await;
        click(&registry, &platform, 3, "page_number").await;

        let renders: Vec<Reply> = platform
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::EditOriginal(_, r) => Some(r),
                _ => None,
            })
            .collect();
        assert_eq!(renders.len(), 1);
        assert_eq!(renders[0].content.as_deref(), Some("page 0"));
        assert!(registry.is_collecting(MessageId::new(ORIGINAL_MESSAGE_ID)));
    }

    struct ReplaceWith {
        pages: usize,
        keep_page: bool,
        continue_pagination: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageComponentHandler for ReplaceWith {
        async fn handle(&self, _click: &ComponentContext, _page: usize) -> Result<HandlerOutcome, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let replacement: Vec<Reply> = (0..self.pages)
                .map(|i| Reply::text(format!("new {i}")))
                .collect();
            let mut new_pages = NewPages::new(replacement);
            if self.keep_page {
                new_pages = new_pages.keep_page();
            }
            let outcome = if self.continue_pagination {
                HandlerOutcome::proceed()
            } else {
                HandlerOutcome::stop()
            };
            Ok(outcome.with_pages(new_pages))
        }
    }

    fn handler(pages: usize, keep_page: bool, continue_pagination: bool) -> Arc<ReplaceWith> {
        Arc::new(ReplaceWith {
            pages,
            keep_page,
            continue_pagination,
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_replacement_length_mismatch_fails_loudly() {
        let platform = RecordingPlatform::new();
        let registry = Arc::new(CollectorRegistry::new(Timeouts::default()));
        let task = spawn_paginate(&registry, &platform, pages(3), Some(handler(2, true, true) as Arc<dyn PageComponentHandler>));

        wait_for_collector(&registry).await;
        registry
            .verify(platform.click(2, 10, ORIGINAL_MESSAGE_ID, "remove"))
            .await;

        let result = task.await.unwrap();
        assert!(matches!(
            result,
            Err(PaginationError::PageCountMismatch { expected: 3, actual: 2 })
        ));
        assert_eq!(last_render(&platform).content.as_deref(), Some("page 0"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_replacement_keeps_cursor_when_asked() {
        let platform = RecordingPlatform::new();
        let registry = Arc::new(CollectorRegistry::new(Timeouts::default()));
        let custom = handler(3, true, true);
        let _task = spawn_paginate(&registry, &platform, pages(3), Some(custom.clone() as Arc<dyn PageComponentHandler>));

        click(&registry, &platform, 2, "next").await;
        click(&registry, &platform, 3, "refresh").await;

        let shown = last_render(&platform);
        assert_eq!(shown.content.as_deref(), Some("new 1"));
        assert_eq!(shown.components.last().unwrap().buttons[1].label, "Page 2 / 3");
        assert_eq!(custom.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replacement_resets_and_stops_without_disabling() {
        let platform = RecordingPlatform::new();
        let registry = Arc::new(CollectorRegistry::new(Timeouts::default()));
        let task = spawn_paginate(&registry, &platform, pages(3), Some(handler(2, false, false) as Arc<dyn PageComponentHandler>));

        click(&registry, &platform, 2, "next").await;
        wait_for_collector(&registry).await;
        registry
            .verify(platform.click(3, 10, ORIGINAL_MESSAGE_ID, "shrink"))
            .await;
        task.await.unwrap().unwrap();

        let shown = last_render(&platform);
        assert_eq!(shown.content.as_deref(), Some("new 0"));
        assert_eq!(shown.components.last().unwrap().buttons[1].label, "Page 1 / 2");
        assert!(!platform.calls().iter().any(|c| matches!(c, Call::EditMessage(..))));
        assert_eq!(registry.active_count(), 0);
    }

    fn disabled_render(platform: &RecordingPlatform) -> Option<Reply> {
        platform.calls().into_iter().find_map(|call| match call {
            Call::EditMessage(_, reply) => Some(reply),
            _ => None,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_replacement_disables_before_failing() {
        let platform = RecordingPlatform::new();
        let registry = Arc::new(CollectorRegistry::new(Timeouts::default()));
        let task = spawn_paginate(&registry, &platform, pages(2), Some(handler(0, false, true) as Arc<dyn PageComponentHandler>));

        wait_for_collector(&registry).await;
        registry
            .verify(platform.click(2, 10, ORIGINAL_MESSAGE_ID, "clear"))
            .await;

        assert!(matches!(task.await.unwrap(), Err(PaginationError::NoPages)));
        let disabled = disabled_render(&platform).expect("components were not disabled");
        assert_eq!(disabled.content.as_deref(), Some("page 0"));
        assert!(disabled.components.iter().flat_map(|r| &r.buttons).all(|b| b.disabled));
        assert_eq!(registry.active_count(), 0);
    }

    struct Broken;

    #[async_trait]
    impl PageComponentHandler for Broken {
        async fn handle(&self, _click: &ComponentContext, _page: usize) -> Result<HandlerOutcome, Error> {
            Err("lookup failed".into())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_handler_error_disables_and_ends_quietly() {
        let platform = RecordingPlatform::new();
        let registry = Arc::new(CollectorRegistry::new(Timeouts::default()));
        let task = spawn_paginate(&registry, &platform, pages(3), Some(Arc::new(Broken) as Arc<dyn PageComponentHandler>));

        click(&registry, &platform, 2, "next").await;
        wait_for_collector(&registry).await;
        registry
            .verify(platform.click(3, 10, ORIGINAL_MESSAGE_ID, "details"))
            .await;

        task.await.unwrap().unwrap();
        let disabled = disabled_render(&platform).expect("components were not disabled");
        assert_eq!(disabled.content.as_deref(), Some("page 1"));
        assert!(disabled.components.iter().flat_map(|r| &r.buttons).all(|b| b.disabled));
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_failure_disables_and_ends() {
        let platform = RecordingPlatform::new();
        let registry = Arc::new(CollectorRegistry::new(Timeouts::default()));
        let task = spawn_paginate(&registry, &platform, pages(2), None);

        wait_for_collector(&registry).await;
        platform.fail_edits(true);
        registry
            .verify(platform.click(2, 10, ORIGINAL_MESSAGE_ID, "next"))
            .await;

        // Disabling also fails here; that is only logged
        task.await.unwrap().unwrap();
        assert_eq!(registry.active_count(), 0);
    }
}
