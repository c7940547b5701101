//! Inventory lookup tool

use async_trait::async_trait;
use voice_orchestrator_core::{
    InputSchema, PropertySchema, Tool, ToolError, ToolParameters, ToolSchema,
};

use super::{optional_str, required_str, HouseholdIntegrations};
use crate::integrations::InventoryItem;

/// Reports what the household has in stock
pub struct CheckInventoryTool {
    integrations: HouseholdIntegrations,
}

impl CheckInventoryTool {
    pub fn new(integrations: HouseholdIntegrations) -> Self {
        Self { integrations }
    }
}

#[async_trait]
impl Tool for CheckInventoryTool {
    fn name(&self) -> &str {
        "check_inventory"
    }

    fn description(&self) -> &str {
        "Check whether the household has an item in stock and where it is kept"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: InputSchema::object()
                .property("query", PropertySchema::string("Item name to look for"), true)
                .property(
                    "location",
                    PropertySchema::string("Storage location such as fridge or pantry"),
                    false,
                ),
        }
    }

    async fn execute(&self, params: ToolParameters) -> Result<String, ToolError> {
        let query = required_str(&params, "query")?;
        let location = optional_str(&params, "location");

        let items = self.integrations.inventory.search(query, location).await?;
        Ok(describe(query, location, &items))
    }
}

fn describe(query: &str, location: Option<&str>, items: &[InventoryItem]) -> String {
    let place = location.map(|l| format!(" in the {}", l)).unwrap_or_default();
    if items.is_empty() {
        return format!("No items found matching '{}'{}.", query, place);
    }

    let listed: Vec<String> = items
        .iter()
        .map(|item| {
            let mut line = format!(
                "{} ({} {}, {}",
                item.name,
                format_quantity(item.quantity),
                item.unit,
                item.location
            );
            if let Some(date) = item.expires_on {
                line.push_str(&format!(", expires {}", date));
            }
            line.push(')');
            line
        })
        .collect();

    let noun = if items.len() == 1 { "item" } else { "items" };
    format!(
        "Found {} {} matching '{}'{}: {}.",
        items.len(),
        noun,
        query,
        place,
        listed.join("; ")
    )
}

fn format_quantity(quantity: f64) -> String {
    if quantity.fract() == 0.0 {
        format!("{}", quantity as i64)
    } else {
        format!("{:.1}", quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::InMemoryHousehold;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::sync::Arc;

    fn tool() -> CheckInventoryTool {
        let household = InMemoryHousehold::new().with_items([
            InventoryItem::new("Whole milk", 2.0, "litre", "fridge"),
            InventoryItem::new("Oat milk", 0.5, "carton", "pantry")
                .expiring(NaiveDate::from_ymd_opt(2026, 10, 20).unwrap()),
        ]);
        CheckInventoryTool::new(HouseholdIntegrations::in_memory(Arc::new(household)))
    }

    fn params(value: serde_json::Value) -> ToolParameters {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_no_items_found_is_not_an_error() {
        let result = tool().execute(params(json!({"query": "saffron"}))).await.unwrap();
        assert_eq!(result, "No items found matching 'saffron'.");
    }

    #[tokio::test]
    async fn test_lists_matches() {
        let result = tool().execute(params(json!({"query": "milk"}))).await.unwrap();
        assert_eq!(
            result,
            "Found 2 items matching 'milk': Whole milk (2 litre, fridge); \
             Oat milk (0.5 carton, pantry, expires 2026-10-20)."
        );
    }

    #[tokio::test]
    async fn test_location_filter() {
        let result = tool()
            .execute(params(json!({"query": "milk", "location": "fridge"})))
            .await
            .unwrap();
        assert!(result.starts_with("Found 1 item matching 'milk' in the fridge"));
    }
}
