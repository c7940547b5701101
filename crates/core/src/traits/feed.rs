//! Live household change feed

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::PersistenceError;

/// Tables the orchestrator watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedTable {
    Inventory,
    ShoppingList,
}

impl FeedTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inventory => "inventory",
            Self::ShoppingList => "shopping_list",
        }
    }
}

/// Row-level operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// One change delivered by the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: FeedTable,
    pub op: ChangeOp,
    pub row_id: String,
    /// Human-readable description of the row after the change
    pub summary: String,
}

/// Subscription filter
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeedFilter {
    pub tables: Vec<FeedTable>,
    pub household_id: Option<String>,
}

impl FeedFilter {
    pub fn tables(tables: impl IntoIterator<Item = FeedTable>) -> Self {
        Self {
            tables: tables.into_iter().collect(),
            household_id: None,
        }
    }

    pub fn with_household(mut self, household_id: impl Into<String>) -> Self {
        self.household_id = Some(household_id.into());
        self
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        self.tables.contains(&event.table)
    }
}

/// Change stream; dropping it unsubscribes
pub type ChangeStream = Pin<Box<dyn Stream<Item = ChangeEvent> + Send>>;

/// External change-feed (inventory rows, shopping-list rows)
#[async_trait]
pub trait ChangeFeed: Send + Sync + 'static {
    async fn subscribe(&self, filter: FeedFilter) -> Result<ChangeStream, PersistenceError>;

    /// Current state summary used as the initial context of a session
    async fn snapshot(&self, _filter: &FeedFilter) -> Result<Option<String>, PersistenceError> {
        Ok(None)
    }
}
