//! Household context injection
//!
//! [`ContextFeed`] turns change-feed rows into proposed [`ContextUpdate`]s.
//! [`ContextThrottle`] decides which proposals are delivered: at most one per
//! window, everything else is dropped without queueing.

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use voice_orchestrator_config::ContextSettings;
use voice_orchestrator_core::{
    ChangeEvent, ChangeFeed, ChangeOp, ContextKind, ContextUpdate, FeedFilter, FeedTable,
};
use voice_orchestrator_pipeline::{EventSink, MonitorTask};

/// Fixed-window rate limit on context delivery
#[derive(Debug, Clone)]
pub struct ContextThrottle {
    window: Duration,
    last_emitted_at: Option<Instant>,
}

impl ContextThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_emitted_at: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admit an update proposed at `at`, recording it as the last emission
    pub fn admit(&mut self, at: Instant) -> bool {
        if let Some(last) = self.last_emitted_at {
            if at.saturating_duration_since(last) < self.window {
                return false;
            }
        }
        self.last_emitted_at = Some(at);
        true
    }

    pub fn reset(&mut self) {
        self.last_emitted_at = None;
    }
}

/// Filter for the tables enabled in settings; `None` when nothing is watched
pub fn feed_filter(settings: &ContextSettings) -> Option<FeedFilter> {
    let mut tables = Vec::new();
    if settings.watch_inventory {
        tables.push(FeedTable::Inventory);
    }
    if settings.watch_shopping_list {
        tables.push(FeedTable::ShoppingList);
    }
    if tables.is_empty() {
        return None;
    }

    let filter = FeedFilter::tables(tables);
    Some(match &settings.household_id {
        Some(household) => filter.with_household(household.clone()),
        None => filter,
    })
}

/// Context update describing one changed row
pub fn describe_change(event: &ChangeEvent) -> ContextUpdate {
    let verb = match event.op {
        ChangeOp::Insert => "added",
        ChangeOp::Update => "updated",
        ChangeOp::Delete => "removed",
    };
    match event.table {
        FeedTable::Inventory => ContextUpdate::new(
            ContextKind::InventoryDelta,
            format!("Inventory {}: {}", verb, event.summary),
        ),
        FeedTable::ShoppingList => ContextUpdate::new(
            ContextKind::CartSnapshot,
            format!("Shopping list {}: {}", verb, event.summary),
        ),
    }
}

/// Change-feed subscription that proposes context updates
///
/// The current snapshot, when the feed provides one, is proposed first as an
/// `Initial` update.
pub struct ContextFeed {
    feed: Arc<dyn ChangeFeed>,
    filter: FeedFilter,
    task: MonitorTask,
}

impl ContextFeed {
    pub fn new(feed: Arc<dyn ChangeFeed>, filter: FeedFilter) -> Self {
        Self {
            feed,
            filter,
            task: MonitorTask::new("context_feed"),
        }
    }

    pub fn start(&self, on_update: EventSink<ContextUpdate>) -> bool {
        let feed = self.feed.clone();
        let filter = self.filter.clone();
        self.task
            .spawn(move |cancel| async move {
                tokio::select! {
                    _ = cancel.cancelled() => {},
                    _ = follow(feed, filter, on_update) => {},
                }
            })
    }

    pub fn is_active(&self) -> bool {
        self.task.is_active()
    }

    /// Unsubscribe; safe when not started
    pub async fn stop(&self) {
        self.task.stop().await;
    }
}

async fn follow(feed: Arc<dyn ChangeFeed>, filter: FeedFilter, on_update: EventSink<ContextUpdate>) {
    match feed.snapshot(&filter).await {
        Ok(Some(snapshot)) => on_update(ContextUpdate::new(ContextKind::Initial, snapshot)),
        Ok(None) => {},
        Err(e) => tracing::warn!(error = %e, "Failed to read initial household context"),
    }

    let mut changes = match feed.subscribe(filter.clone()).await {
        Ok(changes) => changes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to subscribe to household changes");
            return;
        }
    };

    while let Some(change) = changes.next().await {
        if filter.matches(&change) {
            on_update(describe_change(&change));
        }
    }
    tracing::debug!("Household change feed ended");
}
