use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::optim::targets::{DailyTargets, DeficitReport};
use crate::recipe_aggregator::SelectedRecipe;

/// The macro an ingredient is increased for.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationType {
    Protein,
    Fat,
    /// Fallback bucket: spend leftover calories.
    Carbs,
}

impl fmt::Display for OptimizationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizationType::Protein => write!(f, "protein"),
            OptimizationType::Fat => write!(f, "fat"),
            OptimizationType::Carbs => write!(f, "carbs"),
        }
    }
}

/// Points back at the recipe an ingredient came from.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RecipeRef {
    /// Position in the snapshot's recipe list (and its parallel scale-state list).
    pub index: usize,
    pub name: String,
}

/// An ingredient at its recipe's current scale, with its macro-per-calorie ratios.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RankedIngredient {
    pub name: String,
    /// Position in its recipe's ingredient list.
    pub ingredient_index: usize,
    pub amount: f64,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub protein_ratio: f64,
    pub fat_ratio: f64,
    pub carb_ratio: f64,
    pub optimization_type: OptimizationType,
    pub primary_ratio: f64,
    pub recipe_ref: RecipeRef,
}

/// Picks the macro every ingredient of this pass is classified under.
///
/// With both a protein and a fat deficit, the larger deficit relative to its
/// target wins (protein on a tie).
pub fn classify(deficits: &DeficitReport, targets: &DailyTargets) -> OptimizationType {
    let needs_protein = deficits.protein_deficit > 0.0;
    let needs_fat = deficits.fat_deficit > 0.0;

    match (needs_protein, needs_fat) {
        (true, true) => {
            let protein_share = deficits.protein_deficit / targets.protein_target;
            let fat_share = deficits.fat_deficit / targets.fat_target;
            if protein_share >= fat_share {
                OptimizationType::Protein
            } else {
                OptimizationType::Fat
            }
        }
        (true, false) => OptimizationType::Protein,
        (false, true) => OptimizationType::Fat,
        (false, false) => OptimizationType::Carbs,
    }
}

/// Flattens every ingredient of the selected recipes, scaled, and orders them
/// by how much of the needed macro they carry per calorie (highest first).
///
/// Ingredients without positive calories or amount are left out. The sort is
/// stable, so equal ratios keep their encounter order.
pub fn rank_ingredients(
    selected: &[SelectedRecipe<'_>],
    deficits: &DeficitReport,
    targets: &DailyTargets,
) -> Vec<RankedIngredient> {
    let optimization_type = classify(deficits, targets);
    let mut ranked = Vec::new();

    for entry in selected {
        let recipe = entry.recipe;
        let Some(ingredients) = recipe.ingredients.as_ref() else {
            warn!("Recipe '{}' (#{}) has no ingredient list, skipping", recipe.name, entry.index);
            continue;
        };

        for (ingredient_index, ingredient) in ingredients.iter().enumerate() {
            let scale = entry.scale_factor;
            let amount = ingredient.amount * scale;
            let calories = ingredient.calories * scale;
            let protein = ingredient.protein * scale;
            let fat = ingredient.fat * scale;
            let carbs = ingredient.carbs * scale;

            if !(calories > 0.0) {
                debug!("Skipping '{}' from '{}': no calories ({:.1})", ingredient.name, recipe.name, calories);
                continue;
            }
            if !(amount > 0.0) || ![amount, calories, protein, fat, carbs].iter().all(|v| v.is_finite()) {
                warn!(
                    "Skipping '{}' from '{}': unusable quantities (amount {:.1}g, {:.1} kcal)",
                    ingredient.name, recipe.name, amount, calories
                );
                continue;
            }

            let protein_ratio = protein / calories;
            let fat_ratio = fat / calories;
            let carb_ratio = carbs / calories;
            let primary_ratio = match optimization_type {
                OptimizationType::Protein => protein_ratio,
                OptimizationType::Fat => fat_ratio,
                OptimizationType::Carbs => carb_ratio,
            };

            debug!(
                "Ingredient '{}': P {:.1}g, F {:.1}g, C {:.1}g, {:.1} kcal, type {}, ratio {:.3}",
                ingredient.name, protein, fat, carbs, calories, optimization_type, primary_ratio
            );

            ranked.push(RankedIngredient {
                name: ingredient.name.clone(),
                ingredient_index,
                amount,
                calories,
                protein,
                fat,
                carbs,
                protein_ratio,
                fat_ratio,
                carb_ratio,
                optimization_type,
                primary_ratio,
                recipe_ref: RecipeRef {
                    index: entry.index,
                    name: recipe.name.clone(),
                },
            });
        }
    }

    ranked.sort_by(|a, b| b.primary_ratio.total_cmp(&a.primary_ratio));
    ranked
}
