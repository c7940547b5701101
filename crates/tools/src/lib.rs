//! Agent-invokable tools
//!
//! The [`ToolRegistry`] maps tool names to handlers with explicit parameter
//! schemas and implements the dispatch contract: every call produces a
//! string, failures included. Household tools act on the integrations in
//! [`integrations`]; in-memory implementations back development and tests.

pub mod household;
pub mod integrations;
pub mod registry;

pub use household::{
    create_household_registry, AddToCartTool, CheckInventoryTool, CheckSafetyTool,
    HouseholdIntegrations, NavigateToTool, StateChange, StateChangeCallback, UpdateProfileTool,
};
pub use integrations::{
    CartItem, CartStore, InMemoryHousehold, IntegrationError, InventoryItem, InventoryStore,
    Navigator, Profile, ProfileField, ProfileStore, SafetyChecker, SafetySubject, SafetyVerdict,
    Screen,
};
pub use registry::{RegistryError, ToolRegistry, DEFAULT_TOOL_TIMEOUT_SECS};
