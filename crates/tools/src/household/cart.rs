//! Shopping cart tool

use async_trait::async_trait;
use serde_json::json;
use voice_orchestrator_core::{
    InputSchema, PropertySchema, Tool, ToolError, ToolParameters, ToolSchema,
};

use super::{optional_int, optional_str, required_str, HouseholdIntegrations, StateChange};
use crate::integrations::CartItem;

/// Adds an item to the shopping cart
pub struct AddToCartTool {
    integrations: HouseholdIntegrations,
    max_quantity: u32,
}

impl AddToCartTool {
    pub fn new(integrations: HouseholdIntegrations, max_quantity: u32) -> Self {
        Self {
            integrations,
            max_quantity: max_quantity.max(1),
        }
    }
}

#[async_trait]
impl Tool for AddToCartTool {
    fn name(&self) -> &str {
        "add_to_cart"
    }

    fn description(&self) -> &str {
        "Add an item to the household shopping cart"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: InputSchema::object()
                .property("item", PropertySchema::string("Item to buy"), true)
                .property(
                    "quantity",
                    PropertySchema::integer("How many to add").with_default(json!(1)),
                    false,
                )
                .property("unit", PropertySchema::string("Unit such as kg or pack"), false),
        }
    }

    async fn execute(&self, params: ToolParameters) -> Result<String, ToolError> {
        let name = required_str(&params, "item")?;
        let quantity = optional_int(&params, "quantity")?.unwrap_or(1);
        if quantity < 1 || quantity > self.max_quantity as i64 {
            return Err(ToolError::invalid_params(format!(
                "quantity must be between 1 and {}",
                self.max_quantity
            )));
        }
        let unit = optional_str(&params, "unit").map(str::to_string);

        let line = self
            .integrations
            .cart
            .add_item(CartItem {
                name: name.to_string(),
                quantity: quantity as u32,
                unit,
            })
            .await?;

        self.integrations.notify(StateChange::Cart);

        let unit = line.unit.as_deref().map(|u| format!(" {}", u)).unwrap_or_default();
        Ok(format!(
            "Added {} {} to the cart. The cart now has {}{} of {}.",
            quantity, name, line.quantity, unit, line.name
        ))
    }
}
