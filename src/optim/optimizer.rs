use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::optim::ranker::{rank_ingredients, OptimizationType, RankedIngredient, RecipeRef};
use crate::optim::targets::{calculate_deficits, DeficitReport, OptimizerSettings};
use crate::recipe_aggregator::{calculate_current_totals, select_recipes, MacroTotals};
use crate::recipe_snapshot::GrocerySnapshot;

/// Running needs and budget of one allocation pass.
///
/// Needs and budget only ever decrease; `total_calorie_increase` only grows.
/// Every increase is sized to fit under the pass's calorie ceiling.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct DeficitState {
    pub protein_needed: f64,
    pub fat_needed: f64,
    pub calorie_budget_remaining: f64,
    pub total_calorie_increase: f64,
}

impl DeficitState {
    pub fn from_deficits(deficits: &DeficitReport) -> Self {
        DeficitState {
            protein_needed: deficits.protein_deficit,
            fat_needed: deficits.fat_deficit,
            calorie_budget_remaining: deficits.calorie_ceiling,
            total_calorie_increase: 0.0,
        }
    }
}

/// Which bound decided the size of an increase.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LimitingFactor {
    /// The remaining protein or fat need.
    MacroNeed,
    /// What is left of the calorie ceiling.
    CalorieCeiling,
}

/// An accepted increase of one ingredient's quantity.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OptimizationEntry {
    pub ingredient_name: String,
    pub ingredient_index: usize,
    pub recipe_ref: RecipeRef,
    /// Grams at the recipe's current scale.
    pub current_amount: f64,
    pub suggested_increase: f64,
    pub new_amount: f64,
    pub protein_increase: f64,
    pub fat_increase: f64,
    pub carb_increase: f64,
    pub calorie_increase: f64,
    pub optimization_type: OptimizationType,
    pub limiting_factor: LimitingFactor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationOutcome {
    pub entries: Vec<OptimizationEntry>,
    pub final_state: DeficitState,
}

/// Snapshot plus settings: the whole input of one optimization pass.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct OptimizationRequest {
    pub snapshot: GrocerySnapshot,
    #[serde(default)]
    pub settings: OptimizerSettings,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct OptimizationResult {
    pub current_totals: MacroTotals,
    pub deficits: DeficitReport,
    /// False when the trigger rule said there was nothing to optimize.
    pub triggered: bool,
    pub entries: Vec<OptimizationEntry>,
    /// Needs left after allocation; equals the initial state when not triggered.
    pub final_state: DeficitState,
}

/// Walks the ranked ingredients once, greedily increasing each one as far as
/// its macro need and the remaining calorie ceiling allow.
///
/// Decisions are never revisited. In the carbs bucket the first qualifying
/// ingredient takes everything left under the ceiling.
pub fn allocate(
    ranked: &[RankedIngredient],
    deficits: &DeficitReport,
    settings: &OptimizerSettings,
) -> AllocationOutcome {
    let ceiling = deficits.calorie_ceiling;
    let mut state = DeficitState::from_deficits(deficits);
    let mut entries = Vec::new();

    info!(
        "Allocating over {} ingredients: need P {:.1}g, F {:.1}g, ceiling {:.1} kcal",
        ranked.len(),
        state.protein_needed,
        state.fat_needed,
        ceiling
    );

    for ingredient in ranked {
        if state.total_calorie_increase >= ceiling
            || (state.protein_needed <= 0.0
                && state.fat_needed <= 0.0
                && state.calorie_budget_remaining <= settings.min_calorie_headroom)
        {
            debug!("Skipping '{}': needs met or calorie ceiling reached", ingredient.name);
            continue;
        }

        let protein_per_gram = ingredient.protein / ingredient.amount;
        let fat_per_gram = ingredient.fat / ingredient.amount;
        let carb_per_gram = ingredient.carbs / ingredient.amount;
        let calories_per_gram = ingredient.calories / ingredient.amount;
        let max_by_calories = (ceiling - state.total_calorie_increase) / calories_per_gram;

        let bounded_by_need = |need: f64, per_gram: f64| {
            let max_by_need = need / per_gram;
            if max_by_need < max_by_calories {
                (max_by_need, LimitingFactor::MacroNeed)
            } else {
                (max_by_calories, LimitingFactor::CalorieCeiling)
            }
        };

        let (increase, limiting_factor) = match ingredient.optimization_type {
            OptimizationType::Protein if state.protein_needed > 0.0 => {
                bounded_by_need(state.protein_needed, protein_per_gram)
            }
            OptimizationType::Fat if state.fat_needed > 0.0 => bounded_by_need(state.fat_needed, fat_per_gram),
            OptimizationType::Carbs if state.calorie_budget_remaining > settings.min_calorie_headroom => {
                (max_by_calories, LimitingFactor::CalorieCeiling)
            }
            OptimizationType::Protein | OptimizationType::Fat | OptimizationType::Carbs => {
                (0.0, LimitingFactor::MacroNeed)
            }
        };

        if increase <= settings.min_increase_grams {
            debug!("Skipping '{}': increase too small ({:.2}g)", ingredient.name, increase);
            continue;
        }

        let protein_increase = increase * protein_per_gram;
        let fat_increase = increase * fat_per_gram;
        let carb_increase = increase * carb_per_gram;
        let calorie_increase = increase * calories_per_gram;

        state.protein_needed = (state.protein_needed - protein_increase).max(0.0);
        state.fat_needed = (state.fat_needed - fat_increase).max(0.0);
        state.calorie_budget_remaining = (state.calorie_budget_remaining - calorie_increase).max(0.0);
        state.total_calorie_increase += calorie_increase;

        debug!(
            "Accepted '{}' ({}): +{:.1}g -> +{:.1} kcal, +{:.1}g P, +{:.1}g F, +{:.1}g C, limited by {:?}",
            ingredient.name,
            ingredient.optimization_type,
            increase,
            calorie_increase,
            protein_increase,
            fat_increase,
            carb_increase,
            limiting_factor
        );

        entries.push(OptimizationEntry {
            ingredient_name: ingredient.name.clone(),
            ingredient_index: ingredient.ingredient_index,
            recipe_ref: ingredient.recipe_ref.clone(),
            current_amount: ingredient.amount,
            suggested_increase: increase,
            new_amount: ingredient.amount + increase,
            protein_increase,
            fat_increase,
            carb_increase,
            calorie_increase,
            optimization_type: ingredient.optimization_type,
            limiting_factor,
        });
    }

    info!(
        "Allocation done: {} entries, +{:.1} kcal, still need P {:.1}g, F {:.1}g",
        entries.len(),
        state.total_calorie_increase,
        state.protein_needed,
        state.fat_needed
    );

    AllocationOutcome {
        entries,
        final_state: state,
    }
}

/// Runs aggregation, deficit calculation, ranking and allocation over one snapshot.
///
/// Pure: the same snapshot always yields the same result, and nothing in the
/// snapshot is modified.
pub fn optimize_grocery_list(request: &OptimizationRequest) -> OptimizationResult {
    let snapshot = &request.snapshot;
    let settings = &request.settings;
    let targets = &snapshot.targets;

    let selected = select_recipes(&snapshot.recipes, &snapshot.adjusted_recipes);
    let current_totals = calculate_current_totals(&selected);
    let deficits = calculate_deficits(&current_totals, targets, settings);

    info!(
        "Current totals: {:.1} kcal, P {:.1}g, F {:.1}g, C {:.1}g (targets {:.0} kcal, P {:.0}g, F {:.0}g)",
        current_totals.calories,
        current_totals.protein_g,
        current_totals.fat_g,
        current_totals.carbohydrate_g,
        targets.calorie_target,
        targets.protein_target,
        targets.fat_target
    );

    if !deficits.should_optimize(targets, settings) {
        info!("No optimization needed: targets met or no macro targets set");
        return OptimizationResult {
            current_totals,
            deficits,
            triggered: false,
            entries: Vec::new(),
            final_state: DeficitState::from_deficits(&deficits),
        };
    }

    let ranked = rank_ingredients(&selected, &deficits, targets);
    let outcome = allocate(&ranked, &deficits, settings);

    OptimizationResult {
        current_totals,
        deficits,
        triggered: true,
        entries: outcome.entries,
        final_state: outcome.final_state,
    }
}
