//! Profile update tool

use async_trait::async_trait;
use voice_orchestrator_core::{
    InputSchema, PropertySchema, Tool, ToolError, ToolParameters, ToolSchema,
};

use super::{optional_str, required_str, HouseholdIntegrations, StateChange};
use crate::integrations::ProfileField;

const DEFAULT_MEMBER: &str = "primary";

/// Records a preference, allergy or household detail for a member
pub struct UpdateProfileTool {
    integrations: HouseholdIntegrations,
}

impl UpdateProfileTool {
    pub fn new(integrations: HouseholdIntegrations) -> Self {
        Self { integrations }
    }
}

#[async_trait]
impl Tool for UpdateProfileTool {
    fn name(&self) -> &str {
        "update_profile"
    }

    fn description(&self) -> &str {
        "Save a household member's diet, allergy, dislike, name or household size"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: InputSchema::object()
                .property(
                    "field",
                    PropertySchema::enumeration("Profile field to change", &ProfileField::ALL),
                    true,
                )
                .property("value", PropertySchema::string("New value or item to add"), true)
                .property(
                    "member",
                    PropertySchema::string("Household member; defaults to the speaker")
                        .with_default(serde_json::json!(DEFAULT_MEMBER)),
                    false,
                ),
        }
    }

    async fn execute(&self, params: ToolParameters) -> Result<String, ToolError> {
        let field: ProfileField = required_str(&params, "field")?.parse()?;
        let value = required_str(&params, "value")?;
        let member = optional_str(&params, "member").unwrap_or(DEFAULT_MEMBER);

        let profile = self
            .integrations
            .profiles
            .update_profile(member, field, value)
            .await?;

        self.integrations.notify(StateChange::Profile {
            member: profile.member.clone(),
        });

        let message = match field {
            ProfileField::Allergy => format!(
                "Noted. {}'s allergies are now: {}.",
                profile.member,
                profile.allergies.join(", ")
            ),
            ProfileField::Dislike => format!(
                "Noted. {} doesn't like: {}.",
                profile.member,
                profile.dislikes.join(", ")
            ),
            _ => format!(
                "Updated {} for {} to {}.",
                field.as_str().replace('_', " "),
                profile.member,
                value
            ),
        };
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::InMemoryHousehold;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_update_notifies_after_mutation() {
        let household = Arc::new(InMemoryHousehold::new());
        let changes = Arc::new(Mutex::new(Vec::new()));
        let seen = changes.clone();
        let integrations = HouseholdIntegrations::in_memory(household.clone())
            .with_change_callback(Arc::new(move |c: StateChange| seen.lock().push(c)));
        let tool = UpdateProfileTool::new(integrations);

        let params = json!({"field": "allergy", "value": "Peanuts", "member": "sam"});
        let result = tool
            .execute(params.as_object().cloned().unwrap())
            .await
            .unwrap();

        assert_eq!(result, "Noted. sam's allergies are now: peanuts.");
        assert_eq!(
            changes.lock().as_slice(),
            &[StateChange::Profile {
                member: "sam".into()
            }]
        );
        let profiles = crate::ProfileStore::profiles(household.as_ref()).await.unwrap();
        assert_eq!(profiles[0].allergies, vec!["peanuts".to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_value_is_reported() {
        let tool = UpdateProfileTool::new(HouseholdIntegrations::in_memory(Arc::new(
            InMemoryHousehold::new(),
        )));
        let params = json!({"field": "household_size", "value": "lots"});
        let err = tool
            .execute(params.as_object().cloned().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParams(_)));
    }
}
