use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::recipe_snapshot::{FullRecipe, RecipeScaleState};

pub const PROTEIN_KCAL_PER_GRAM: f64 = 4.0;
pub const FAT_KCAL_PER_GRAM: f64 = 9.0;
pub const CARB_KCAL_PER_GRAM: f64 = 4.0;

// Share of calories assumed for each macro when a recipe has no macro totals.
const ESTIMATED_PROTEIN_SHARE: f64 = 0.15;
const ESTIMATED_FAT_SHARE: f64 = 0.30;
const ESTIMATED_CARB_SHARE: f64 = 0.55;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct MacroTotals {
    pub calories: f64,
    pub protein_g: f64,
    pub fat_g: f64,
    pub carbohydrate_g: f64,
}

impl MacroTotals {
    pub fn plus(&self, other: &MacroTotals) -> MacroTotals {
        MacroTotals {
            calories: self.calories + other.calories,
            protein_g: self.protein_g + other.protein_g,
            fat_g: self.fat_g + other.fat_g,
            carbohydrate_g: self.carbohydrate_g + other.carbohydrate_g,
        }
    }
}

/// A full recipe paired with the portion it is currently selected at.
#[derive(Debug, Clone, Copy)]
pub struct SelectedRecipe<'a> {
    pub index: usize,
    pub recipe: &'a FullRecipe,
    pub scale_factor: f64,
    pub scaled_calories: f64,
}

/// The factor a recipe is actually portioned at: its stored factor when that
/// is positive and finite, otherwise 1.
pub fn resolve_scale_factor(recipe: &FullRecipe, state: Option<&RecipeScaleState>) -> f64 {
    match state.map(|s| s.scale_factor) {
        Some(f) if f.is_finite() && f > 0.0 => f,
        Some(f) => {
            warn!("Recipe '{}' has unusable scale factor {}, using 1", recipe.name, f);
            1.0
        }
        None => 1.0,
    }
}

/// Pairs each full recipe with its scale state from the parallel list.
///
/// A recipe without a usable scale state is taken at factor 1.
pub fn select_recipes<'a>(
    recipes: &'a [FullRecipe],
    scale_states: &[RecipeScaleState],
) -> Vec<SelectedRecipe<'a>> {
    recipes
        .iter()
        .enumerate()
        .map(|(index, recipe)| {
            let state = scale_states.get(index);
            let scale_factor = resolve_scale_factor(recipe, state);
            let scaled_calories = match state {
                Some(s) if s.scale_factor == scale_factor && s.adjusted_calories.is_finite() && s.adjusted_calories > 0.0 => {
                    s.adjusted_calories
                }
                _ => recipe.total_calories * scale_factor,
            };
            SelectedRecipe {
                index,
                recipe,
                scale_factor,
                scaled_calories,
            }
        })
        .collect()
}

/// Sums calories and macros over all selected recipes at their current scale.
///
/// A missing or zero macro total falls back to an estimate from the scaled
/// calories (15% protein, 30% fat, 55% carbohydrate).
pub fn calculate_current_totals(selected: &[SelectedRecipe<'_>]) -> MacroTotals {
    let mut totals = MacroTotals::default();

    for entry in selected {
        let recipe = entry.recipe;
        totals.calories += entry.scaled_calories;

        macro_rules! add_scaled_or_estimate {
            ($field:ident, $total:ident, $share:expr, $kcal_per_g:expr) => {
                totals.$field += match recipe.$total {
                    Some(value) if value != 0.0 => value * entry.scale_factor,
                    _ => entry.scaled_calories * $share / $kcal_per_g,
                };
            };
        }
        add_scaled_or_estimate!(protein_g, total_protein, ESTIMATED_PROTEIN_SHARE, PROTEIN_KCAL_PER_GRAM);
        add_scaled_or_estimate!(fat_g, total_fats, ESTIMATED_FAT_SHARE, FAT_KCAL_PER_GRAM);
        add_scaled_or_estimate!(carbohydrate_g, total_carbohydrates, ESTIMATED_CARB_SHARE, CARB_KCAL_PER_GRAM);

        debug!(
            "Aggregated '{}' x{:.3}: running totals {:.1} kcal, P {:.1}g, F {:.1}g, C {:.1}g",
            recipe.name, entry.scale_factor, totals.calories, totals.protein_g, totals.fat_g, totals.carbohydrate_g
        );
    }

    totals
}
