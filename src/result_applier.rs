use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::optim::optimizer::OptimizationEntry;
use crate::recipe_aggregator::resolve_scale_factor;
use crate::recipe_snapshot::{FullRecipe, RecipeScaleState};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ScaleFactorChange {
    pub recipe: String,
    pub ingredient_name: String,
    pub old_scale_factor: f64,
    pub new_scale_factor: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UnknownRecipe,
    IngredientNotFound,
    NonPositiveAmount,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SkippedEntry {
    pub recipe: String,
    pub ingredient_name: String,
    pub reason: SkipReason,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ApplyReport {
    pub changes: Vec<ScaleFactorChange>,
    pub skipped: Vec<SkippedEntry>,
}

/// Turns accepted increases into new recipe scale factors.
///
/// Each entry rescales its whole recipe so that the ingredient reaches
/// `current + increase` grams; ingredient baselines are left untouched. Entries
/// are applied in order, so a second entry for the same recipe builds on the
/// factor written by the first. The current factor is read the same way the
/// optimizer read it, and recipes without a scale state get one.
pub fn apply_optimizations(
    recipes: &[FullRecipe],
    scale_states: &mut Vec<RecipeScaleState>,
    entries: &[OptimizationEntry],
) -> ApplyReport {
    let mut report = ApplyReport::default();

    for entry in entries {
        let recipe_index = entry.recipe_ref.index;
        let skip = |reason: SkipReason| SkippedEntry {
            recipe: entry.recipe_ref.name.clone(),
            ingredient_name: entry.ingredient_name.clone(),
            reason,
        };

        let Some(recipe) = recipes.get(recipe_index) else {
            warn!("Could not find recipe '{}' (#{}) to apply to", entry.recipe_ref.name, recipe_index);
            report.skipped.push(skip(SkipReason::UnknownRecipe));
            continue;
        };

        let Some(ingredient) = recipe
            .ingredients
            .as_deref()
            .and_then(|list| list.get(entry.ingredient_index))
            .filter(|i| i.name == entry.ingredient_name)
        else {
            warn!(
                "Could not find ingredient '{}' (#{}) in recipe '{}'",
                entry.ingredient_name, entry.ingredient_index, recipe.name
            );
            report.skipped.push(skip(SkipReason::IngredientNotFound));
            continue;
        };

        let original_amount = ingredient.amount;
        if !(original_amount > 0.0) {
            warn!(
                "Ingredient '{}' in '{}' has no base amount ({}), cannot rescale",
                ingredient.name, recipe.name, original_amount
            );
            report.skipped.push(skip(SkipReason::NonPositiveAmount));
            continue;
        }

        let missing_from = scale_states.len();
        if let Some(missing) = recipes.get(missing_from..=recipe_index) {
            for unscaled in missing {
                debug!("Recipe '{}' had no scale state, starting it at 1", unscaled.name);
                scale_states.push(RecipeScaleState::new(unscaled.name.clone(), 1.0, unscaled.total_calories));
            }
        }
        let old_scale_factor = resolve_scale_factor(recipe, scale_states.get(recipe_index));
        let Some(state) = scale_states.get_mut(recipe_index) else {
            report.skipped.push(skip(SkipReason::UnknownRecipe));
            continue;
        };

        let current_scaled_amount = original_amount * old_scale_factor;
        let new_scaled_amount = current_scaled_amount + entry.suggested_increase;
        let new_scale_factor = new_scaled_amount / original_amount;

        if !(state.original_calories > 0.0) {
            state.original_calories = recipe.total_calories;
        }
        state.scale_factor = new_scale_factor;
        state.adjusted_calories = state.original_calories * new_scale_factor;

        info!(
            "Scale factor update for '{}' via '{}': {:.1}g -> {:.1}g (scale {:.3} -> {:.3})",
            recipe.name, ingredient.name, current_scaled_amount, new_scaled_amount, old_scale_factor, new_scale_factor
        );

        report.changes.push(ScaleFactorChange {
            recipe: recipe.name.clone(),
            ingredient_name: ingredient.name.clone(),
            old_scale_factor,
            new_scale_factor,
        });
    }

    report
}
