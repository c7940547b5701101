//! Allergen and pet-toxicity check tool

use async_trait::async_trait;
use serde_json::json;
use voice_orchestrator_core::{
    InputSchema, PropertySchema, Tool, ToolError, ToolParameters, ToolSchema,
};

use super::{optional_str, required_str, HouseholdIntegrations};
use crate::integrations::SafetySubject;

/// Checks a food or product against household allergies or pet toxicity
pub struct CheckSafetyTool {
    integrations: HouseholdIntegrations,
}

impl CheckSafetyTool {
    pub fn new(integrations: HouseholdIntegrations) -> Self {
        Self { integrations }
    }
}

#[async_trait]
impl Tool for CheckSafetyTool {
    fn name(&self) -> &str {
        "check_safety"
    }

    fn description(&self) -> &str {
        "Check whether an item is safe for the household's allergies or for a pet"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: InputSchema::object()
                .property("item", PropertySchema::string("Food or product to check"), true)
                .property(
                    "subject",
                    PropertySchema::enumeration("Who the item is for", &SafetySubject::ALL)
                        .with_default(json!("household")),
                    false,
                ),
        }
    }

    async fn execute(&self, params: ToolParameters) -> Result<String, ToolError> {
        let item = required_str(&params, "item")?;
        let subject: SafetySubject = optional_str(&params, "subject")
            .unwrap_or("household")
            .parse()?;

        let verdict = self.integrations.safety.check(subject, item).await?;

        let audience = match subject {
            SafetySubject::Household => "the household".to_string(),
            pet => format!("a {}", pet.as_str()),
        };
        if verdict.is_safe() {
            Ok(format!("No known concerns with {} for {}.", item, audience))
        } else {
            Ok(format!(
                "Caution: {} may not be safe for {}: {}.",
                item,
                audience,
                verdict.concerns.join("; ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::{InMemoryHousehold, Profile};
    use std::sync::Arc;

    fn tool() -> CheckSafetyTool {
        let household = InMemoryHousehold::new().with_profile(Profile {
            allergies: vec!["shellfish".into()],
            ..Profile::new("alex")
        });
        CheckSafetyTool::new(HouseholdIntegrations::in_memory(Arc::new(household)))
    }

    fn params(value: serde_json::Value) -> ToolParameters {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_pet_toxicity() {
        let result = tool()
            .execute(params(json!({"item": "grapes", "subject": "dog"})))
            .await
            .unwrap();
        assert_eq!(
            result,
            "Caution: grapes may not be safe for a dog: grape can cause kidney failure."
        );
    }

    #[tokio::test]
    async fn test_household_default_subject() {
        let result = tool()
            .execute(params(json!({"item": "shellfish soup"})))
            .await
            .unwrap();
        assert!(result.contains("alex is allergic to shellfish"));

        let safe = tool().execute(params(json!({"item": "rice"}))).await.unwrap();
        assert_eq!(safe, "No known concerns with rice for the household.");
    }
}
