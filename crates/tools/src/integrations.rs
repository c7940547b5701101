//! Household integrations
//!
//! Collaborators the household tools act on: inventory, cart, member
//! profiles, allergen/toxicity checks and app navigation. Production
//! deployments back these with the managed data store; [`InMemoryHousehold`]
//! implements all of them for development and tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use voice_orchestrator_core::ToolError;

/// Integration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrationError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<IntegrationError> for ToolError {
    fn from(err: IntegrationError) -> Self {
        match err {
            IntegrationError::NotFound(msg) => ToolError::internal(format!("{} not found", msg)),
            IntegrationError::InvalidRequest(msg) => ToolError::invalid_params(msg),
            IntegrationError::RateLimited => {
                ToolError::internal("Rate limited - please retry later")
            }
            _ => ToolError::internal(err.to_string()),
        }
    }
}

// ============================================================================
// Inventory
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    /// Storage location (fridge, pantry, freezer, ...)
    pub location: String,
    #[serde(default)]
    pub expires_on: Option<NaiveDate>,
}

impl InventoryItem {
    pub fn new(name: &str, quantity: f64, unit: &str, location: &str) -> Self {
        Self {
            id: slug(name),
            name: name.to_string(),
            quantity,
            unit: unit.to_string(),
            location: location.to_string(),
            expires_on: None,
        }
    }

    pub fn expiring(mut self, date: NaiveDate) -> Self {
        self.expires_on = Some(date);
        self
    }
}

#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Items whose name contains `query`, optionally limited to a location
    async fn search(
        &self,
        query: &str,
        location: Option<&str>,
    ) -> Result<Vec<InventoryItem>, IntegrationError>;
}

// ============================================================================
// Cart
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub name: String,
    pub quantity: u32,
    #[serde(default)]
    pub unit: Option<String>,
}

#[async_trait]
pub trait CartStore: Send + Sync {
    /// Add to the cart, merging with an existing line; returns the merged line
    async fn add_item(&self, item: CartItem) -> Result<CartItem, IntegrationError>;

    async fn items(&self) -> Result<Vec<CartItem>, IntegrationError>;
}

// ============================================================================
// Profiles
// ============================================================================

/// Editable profile attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    DisplayName,
    Diet,
    Allergy,
    Dislike,
    HouseholdSize,
}

impl ProfileField {
    pub const ALL: [&'static str; 5] = ["display_name", "diet", "allergy", "dislike", "household_size"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DisplayName => "display_name",
            Self::Diet => "diet",
            Self::Allergy => "allergy",
            Self::Dislike => "dislike",
            Self::HouseholdSize => "household_size",
        }
    }
}

impl FromStr for ProfileField {
    type Err = IntegrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "display_name" => Ok(Self::DisplayName),
            "diet" => Ok(Self::Diet),
            "allergy" => Ok(Self::Allergy),
            "dislike" => Ok(Self::Dislike),
            "household_size" => Ok(Self::HouseholdSize),
            other => Err(IntegrationError::InvalidRequest(format!(
                "unknown profile field '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub member: String,
    pub display_name: Option<String>,
    pub diet: Option<String>,
    pub allergies: Vec<String>,
    pub dislikes: Vec<String>,
    pub household_size: Option<u32>,
}

impl Profile {
    pub fn new(member: &str) -> Self {
        Self {
            member: member.to_string(),
            ..Default::default()
        }
    }

    /// Set scalar fields, append to list fields (deduplicated)
    pub fn apply(&mut self, field: ProfileField, value: &str) -> Result<(), IntegrationError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(IntegrationError::InvalidRequest("value is empty".into()));
        }
        match field {
            ProfileField::DisplayName => self.display_name = Some(value.to_string()),
            ProfileField::Diet => self.diet = Some(value.to_lowercase()),
            ProfileField::Allergy => push_unique(&mut self.allergies, value),
            ProfileField::Dislike => push_unique(&mut self.dislikes, value),
            ProfileField::HouseholdSize => {
                let size: u32 = value.parse().map_err(|_| {
                    IntegrationError::InvalidRequest(format!(
                        "household_size must be a whole number, got '{}'",
                        value
                    ))
                })?;
                if size == 0 {
                    return Err(IntegrationError::InvalidRequest(
                        "household_size must be at least 1".into(),
                    ));
                }
                self.household_size = Some(size);
            }
        }
        Ok(())
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    let value = value.to_lowercase();
    if !list.contains(&value) {
        list.push(value);
    }
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn update_profile(
        &self,
        member: &str,
        field: ProfileField,
        value: &str,
    ) -> Result<Profile, IntegrationError>;

    async fn profiles(&self) -> Result<Vec<Profile>, IntegrationError>;
}

// ============================================================================
// Safety
// ============================================================================

/// Who an item is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetySubject {
    /// Allergies recorded in member profiles
    Household,
    Dog,
    Cat,
}

impl SafetySubject {
    pub const ALL: [&'static str; 3] = ["household", "dog", "cat"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Household => "household",
            Self::Dog => "dog",
            Self::Cat => "cat",
        }
    }
}

impl FromStr for SafetySubject {
    type Err = IntegrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "household" => Ok(Self::Household),
            "dog" => Ok(Self::Dog),
            "cat" => Ok(Self::Cat),
            other => Err(IntegrationError::InvalidRequest(format!(
                "unknown subject '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub concerns: Vec<String>,
}

impl SafetyVerdict {
    pub fn is_safe(&self) -> bool {
        self.concerns.is_empty()
    }
}

#[async_trait]
pub trait SafetyChecker: Send + Sync {
    async fn check(
        &self,
        subject: SafetySubject,
        item: &str,
    ) -> Result<SafetyVerdict, IntegrationError>;
}

// ============================================================================
// Navigation
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Home,
    Pantry,
    ShoppingList,
    Cart,
    Recipes,
    Pets,
    Profile,
}

impl Screen {
    pub const ALL: [&'static str; 7] = [
        "home",
        "pantry",
        "shopping_list",
        "cart",
        "recipes",
        "pets",
        "profile",
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Pantry => "pantry",
            Self::ShoppingList => "shopping_list",
            Self::Cart => "cart",
            Self::Recipes => "recipes",
            Self::Pets => "pets",
            Self::Profile => "profile",
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().replace('_', " "))
    }
}

impl FromStr for Screen {
    type Err = IntegrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "home" => Ok(Self::Home),
            "pantry" => Ok(Self::Pantry),
            "shopping_list" => Ok(Self::ShoppingList),
            "cart" => Ok(Self::Cart),
            "recipes" => Ok(Self::Recipes),
            "pets" => Ok(Self::Pets),
            "profile" => Ok(Self::Profile),
            other => Err(IntegrationError::InvalidRequest(format!(
                "unknown screen '{}'",
                other
            ))),
        }
    }
}

#[async_trait]
pub trait Navigator: Send + Sync {
    async fn navigate(&self, screen: Screen) -> Result<(), IntegrationError>;
}

// ============================================================================
// In-memory household
// ============================================================================

const DOG_TOXIC: &[(&str, &str)] = &[
    ("chocolate", "contains theobromine"),
    ("grape", "can cause kidney failure"),
    ("raisin", "can cause kidney failure"),
    ("onion", "damages red blood cells"),
    ("garlic", "damages red blood cells"),
    ("xylitol", "causes a dangerous insulin spike"),
    ("macadamia", "causes weakness and tremors"),
];

const CAT_TOXIC: &[(&str, &str)] = &[
    ("lily", "causes acute kidney failure"),
    ("onion", "damages red blood cells"),
    ("garlic", "damages red blood cells"),
    ("chocolate", "contains theobromine"),
    ("grape", "can cause kidney failure"),
];

#[derive(Default)]
struct HouseholdData {
    items: Vec<InventoryItem>,
    cart: Vec<CartItem>,
    profiles: HashMap<String, Profile>,
    /// Item name -> allergens it contains
    allergens: HashMap<String, Vec<String>>,
    screen: Option<Screen>,
}

/// In-memory implementation of every household integration
#[derive(Default)]
pub struct InMemoryHousehold {
    data: RwLock<HouseholdData>,
}

impl InMemoryHousehold {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(self, items: impl IntoIterator<Item = InventoryItem>) -> Self {
        self.data.write().items.extend(items);
        self
    }

    pub fn with_profile(self, profile: Profile) -> Self {
        self.data
            .write()
            .profiles
            .insert(profile.member.clone(), profile);
        self
    }

    /// Declare the allergens an item contains
    pub fn with_allergens(self, item: &str, allergens: &[&str]) -> Self {
        self.data.write().allergens.insert(
            item.to_lowercase(),
            allergens.iter().map(|a| a.to_lowercase()).collect(),
        );
        self
    }

    pub fn current_screen(&self) -> Option<Screen> {
        self.data.read().screen
    }

    pub fn cart_snapshot(&self) -> Vec<CartItem> {
        self.data.read().cart.clone()
    }
}

#[async_trait]
impl InventoryStore for InMemoryHousehold {
    async fn search(
        &self,
        query: &str,
        location: Option<&str>,
    ) -> Result<Vec<InventoryItem>, IntegrationError> {
        let query = query.trim().to_lowercase();
        let location = location.map(|l| l.trim().to_lowercase());
        let data = self.data.read();
        Ok(data
            .items
            .iter()
            .filter(|item| item.name.to_lowercase().contains(&query))
            .filter(|item| match &location {
                Some(loc) => item.location.to_lowercase() == *loc,
                None => true,
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CartStore for InMemoryHousehold {
    async fn add_item(&self, item: CartItem) -> Result<CartItem, IntegrationError> {
        let mut data = self.data.write();
        let key = item.name.to_lowercase();
        if let Some(line) = data
            .cart
            .iter_mut()
            .find(|line| line.name.to_lowercase() == key && line.unit == item.unit)
        {
            line.quantity = line.quantity.saturating_add(item.quantity);
            return Ok(line.clone());
        }
        data.cart.push(item.clone());
        Ok(item)
    }

    async fn items(&self) -> Result<Vec<CartItem>, IntegrationError> {
        Ok(self.data.read().cart.clone())
    }
}

#[async_trait]
impl ProfileStore for InMemoryHousehold {
    async fn update_profile(
        &self,
        member: &str,
        field: ProfileField,
        value: &str,
    ) -> Result<Profile, IntegrationError> {
        let mut data = self.data.write();
        let profile = data
            .profiles
            .entry(member.to_string())
            .or_insert_with(|| Profile::new(member));
        profile.apply(field, value)?;
        Ok(profile.clone())
    }

    async fn profiles(&self) -> Result<Vec<Profile>, IntegrationError> {
        let mut profiles: Vec<Profile> = self.data.read().profiles.values().cloned().collect();
        profiles.sort_by(|a, b| a.member.cmp(&b.member));
        Ok(profiles)
    }
}

#[async_trait]
impl SafetyChecker for InMemoryHousehold {
    async fn check(
        &self,
        subject: SafetySubject,
        item: &str,
    ) -> Result<SafetyVerdict, IntegrationError> {
        let item = item.trim().to_lowercase();
        let concerns = match subject {
            SafetySubject::Dog => toxic_concerns(DOG_TOXIC, &item),
            SafetySubject::Cat => toxic_concerns(CAT_TOXIC, &item),
            SafetySubject::Household => {
                let data = self.data.read();
                let contained: Vec<String> = data
                    .allergens
                    .iter()
                    .filter(|(name, _)| item.contains(name.as_str()))
                    .flat_map(|(_, allergens)| allergens.iter().cloned())
                    .chain(std::iter::once(item.clone()))
                    .collect();

                let mut members: Vec<&Profile> = data.profiles.values().collect();
                members.sort_by(|a, b| a.member.cmp(&b.member));

                let mut concerns = Vec::new();
                for profile in members {
                    for allergy in &profile.allergies {
                        if contained.iter().any(|c| c.contains(allergy.as_str())) {
                            concerns.push(format!("{} is allergic to {}", profile.member, allergy));
                        }
                    }
                }
                concerns
            }
        };
        Ok(SafetyVerdict { concerns })
    }
}

fn toxic_concerns(table: &[(&str, &str)], item: &str) -> Vec<String> {
    table
        .iter()
        .filter(|(name, _)| item.contains(name))
        .map(|(name, why)| format!("{} {}", name, why))
        .collect()
}

#[async_trait]
impl Navigator for InMemoryHousehold {
    async fn navigate(&self, screen: Screen) -> Result<(), IntegrationError> {
        self.data.write().screen = Some(screen);
        Ok(())
    }
}

fn slug(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}
