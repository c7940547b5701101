//! Household Tools
//!
//! Tools the remote agent calls to read and change household state. Each
//! tool performs its mutation itself and then reports it through the
//! optional [`StateChangeCallback`] so the UI can refresh.
//!
//! - `check_inventory`: what is in the fridge, pantry or freezer
//! - `update_profile`: diet, allergies and other member preferences
//! - `add_to_cart`: shopping cart inserts
//! - `check_safety`: allergen and pet-toxicity checks
//! - `navigate_to`: switch the app to a screen

mod cart;
mod inventory;
mod navigation;
mod profile;
mod safety;

pub use cart::AddToCartTool;
pub use inventory::CheckInventoryTool;
pub use navigation::NavigateToTool;
pub use profile::UpdateProfileTool;
pub use safety::CheckSafetyTool;

use std::sync::Arc;
use voice_orchestrator_config::ToolSettings;
use voice_orchestrator_core::{ToolError, ToolParameters};

use crate::integrations::{
    CartStore, InMemoryHousehold, InventoryStore, Navigator, ProfileStore, SafetyChecker, Screen,
};
use crate::{RegistryError, ToolRegistry};

/// Household state a tool just changed
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    Profile { member: String },
    Cart,
    Navigation { screen: Screen },
}

pub type StateChangeCallback = Arc<dyn Fn(StateChange) + Send + Sync>;

/// Collaborators shared by the household tools
#[derive(Clone)]
pub struct HouseholdIntegrations {
    pub inventory: Arc<dyn InventoryStore>,
    pub cart: Arc<dyn CartStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub safety: Arc<dyn SafetyChecker>,
    pub navigator: Arc<dyn Navigator>,
    pub on_change: Option<StateChangeCallback>,
}

impl HouseholdIntegrations {
    /// Back every integration with one in-memory household
    pub fn in_memory(household: Arc<InMemoryHousehold>) -> Self {
        Self {
            inventory: household.clone(),
            cart: household.clone(),
            profiles: household.clone(),
            safety: household.clone(),
            navigator: household,
            on_change: None,
        }
    }

    pub fn with_change_callback(mut self, callback: StateChangeCallback) -> Self {
        self.on_change = Some(callback);
        self
    }

    pub(crate) fn notify(&self, change: StateChange) {
        if let Some(callback) = &self.on_change {
            callback(change);
        }
    }
}

/// Registry with every household tool registered
pub fn create_household_registry(
    integrations: &HouseholdIntegrations,
    settings: &ToolSettings,
) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new().with_default_timeout(settings.timeout_secs);
    registry.register(CheckInventoryTool::new(integrations.clone()))?;
    registry.register(UpdateProfileTool::new(integrations.clone()))?;
    registry.register(AddToCartTool::new(
        integrations.clone(),
        settings.max_cart_quantity,
    ))?;
    registry.register(CheckSafetyTool::new(integrations.clone()))?;
    registry.register(NavigateToTool::new(integrations.clone()))?;

    tracing::info!(tools = registry.len(), "Household tool registry created");
    Ok(registry)
}

/// Required, non-blank string parameter
pub(crate) fn required_str<'a>(params: &'a ToolParameters, name: &str) -> Result<&'a str, ToolError> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::invalid_params(format!("{} is required", name)))
}

/// Whole-number parameter; `2.0` counts, values outside `i64` are rejected
pub(crate) fn optional_int(params: &ToolParameters, name: &str) -> Result<Option<i64>, ToolError> {
    let Some(value) = params.get(name).filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    if let Some(n) = value.as_i64() {
        return Ok(Some(n));
    }
    match value.as_f64() {
        Some(n) if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 => {
            Ok(Some(n as i64))
        }
        _ => Err(ToolError::invalid_params(format!(
            "{} must be a whole number in range",
            name
        ))),
    }
}

pub(crate) fn optional_str<'a>(params: &'a ToolParameters, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
