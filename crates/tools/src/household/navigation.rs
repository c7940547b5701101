//! App navigation tool

use async_trait::async_trait;
use voice_orchestrator_core::{
    InputSchema, PropertySchema, Tool, ToolError, ToolParameters, ToolSchema,
};

use super::{required_str, HouseholdIntegrations, StateChange};
use crate::integrations::Screen;

/// Switches the app to a named screen
pub struct NavigateToTool {
    integrations: HouseholdIntegrations,
}

impl NavigateToTool {
    pub fn new(integrations: HouseholdIntegrations) -> Self {
        Self { integrations }
    }
}

#[async_trait]
impl Tool for NavigateToTool {
    fn name(&self) -> &str {
        "navigate_to"
    }

    fn description(&self) -> &str {
        "Open a screen of the household app"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: InputSchema::object().property(
                "screen",
                PropertySchema::enumeration("Screen to open", &Screen::ALL),
                true,
            ),
        }
    }

    async fn execute(&self, params: ToolParameters) -> Result<String, ToolError> {
        let screen: Screen = required_str(&params, "screen")?.parse()?;
        self.integrations.navigator.navigate(screen).await?;
        self.integrations.notify(StateChange::Navigation { screen });
        Ok(format!("Opened the {} screen.", screen))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::InMemoryHousehold;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_navigates() {
        let household = Arc::new(InMemoryHousehold::new());
        let tool = NavigateToTool::new(HouseholdIntegrations::in_memory(household.clone()));
        let params = json!({"screen": "shopping_list"});

        let result = tool
            .execute(params.as_object().cloned().unwrap())
            .await
            .unwrap();

        assert_eq!(result, "Opened the shopping list screen.");
        assert_eq!(household.current_screen(), Some(Screen::ShoppingList));
    }
}
