use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::Path;
use tokio::fs;
use tracing::warn;

use crate::optim::targets::DailyTargets;

/// One ingredient row of a recipe, stored at the recipe's baseline (unscaled) quantities.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Ingredient {
    #[serde(default)]
    pub name: String,
    /// Grams.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub calories: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub protein: f64,
    #[serde(rename = "fats", alias = "fat", default, deserialize_with = "lenient_f64")]
    pub fat: f64,
    #[serde(rename = "carbohydrates", alias = "carbs", default, deserialize_with = "lenient_f64")]
    pub carbs: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct FullRecipe {
    #[serde(alias = "title", default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_calories: f64,
    #[serde(default, deserialize_with = "lenient_opt_f64", skip_serializing_if = "Option::is_none")]
    pub total_protein: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64", skip_serializing_if = "Option::is_none")]
    pub total_fats: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64", skip_serializing_if = "Option::is_none")]
    pub total_carbohydrates: Option<f64>,
    /// `None` when the source row had no usable ingredient array.
    #[serde(default, deserialize_with = "lenient_ingredients")]
    pub ingredients: Option<Vec<Ingredient>>,
}

/// Portion state of one selected recipe. Only the result applier writes to it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecipeScaleState {
    #[serde(alias = "recipeId", default)]
    pub name: String,
    #[serde(default = "default_scale_factor", deserialize_with = "lenient_scale_factor")]
    pub scale_factor: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub original_calories: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub adjusted_calories: f64,
}

impl RecipeScaleState {
    pub fn new(name: impl Into<String>, scale_factor: f64, original_calories: f64) -> Self {
        RecipeScaleState {
            name: name.into(),
            scale_factor,
            original_calories,
            adjusted_calories: original_calories * scale_factor,
        }
    }
}

/// Everything the grocery-list renderer hands over for one optimization pass.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrocerySnapshot {
    #[serde(default)]
    pub recipes: Vec<FullRecipe>,
    #[serde(default, alias = "adjustedRecipesData")]
    pub adjusted_recipes: Vec<RecipeScaleState>,
    #[serde(flatten)]
    pub targets: DailyTargets,
}

fn default_scale_factor() -> f64 {
    1.0
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_f64(&value).unwrap_or(0.0))
}

fn lenient_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_f64(&value))
}

fn lenient_scale_factor<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_f64(&value).unwrap_or_else(default_scale_factor))
}

fn lenient_ingredients<'de, D>(deserializer: D) -> Result<Option<Vec<Ingredient>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Array(items) => {
            let mut ingredients = Vec::with_capacity(items.len());
            for (idx, item) in items.into_iter().enumerate() {
                if !item.is_object() {
                    warn!("Dropping ingredient #{}: expected an object, got {}", idx, item);
                    continue;
                }
                match serde_json::from_value::<Ingredient>(item) {
                    Ok(ingredient) => ingredients.push(ingredient),
                    Err(e) => warn!("Dropping ingredient #{}: {}", idx, e),
                }
            }
            Ok(Some(ingredients))
        }
        Value::Null => Ok(None),
        other => {
            warn!("Ingredient list is not an array ({}), treating as missing", other);
            Ok(None)
        }
    }
}

pub fn parse_snapshot(json: &str) -> Result<GrocerySnapshot> {
    serde_json::from_str(json).context("Failed to decode grocery snapshot JSON")
}

pub async fn load_snapshot(path: &Path) -> Result<GrocerySnapshot> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read grocery snapshot from {:?}", path))?;
    parse_snapshot(&content).with_context(|| format!("Invalid grocery snapshot in {:?}", path))
}

pub async fn save_scale_states(path: &Path, states: &[RecipeScaleState]) -> Result<()> {
    let json = serde_json::to_string_pretty(states).context("Failed to encode recipe scale states")?;
    fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write recipe scale states to {:?}", path))
}
