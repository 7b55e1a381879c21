use serde::{Deserialize, Serialize};

use crate::optim::optimizer::{OptimizationEntry, OptimizationResult};
use crate::optim::targets::DailyTargets;
use crate::recipe_aggregator::MacroTotals;

/// How far a set of totals gets towards the daily targets, in percent.
/// A field is `None` when its target is not set.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct TargetProgress {
    pub calories_pct: Option<f64>,
    pub protein_pct: Option<f64>,
    pub fat_pct: Option<f64>,
}

/// Before/after view of one optimization pass, as shown next to the entry table.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct OptimizationSummary {
    pub before: MacroTotals,
    pub increase: MacroTotals,
    pub after: MacroTotals,
    pub before_progress: TargetProgress,
    pub after_progress: TargetProgress,
    pub remaining_protein_deficit: f64,
    pub remaining_fat_deficit: f64,
}

fn percent_of(value: f64, target: f64) -> Option<f64> {
    if target > 0.0 {
        Some(value / target * 100.0)
    } else {
        None
    }
}

pub fn progress_towards(totals: &MacroTotals, targets: &DailyTargets) -> TargetProgress {
    TargetProgress {
        calories_pct: percent_of(totals.calories, targets.calorie_target),
        protein_pct: percent_of(totals.protein_g, targets.protein_target),
        fat_pct: percent_of(totals.fat_g, targets.fat_target),
    }
}

/// Sums the macro and calorie deltas of the accepted entries.
pub fn total_increase(entries: &[OptimizationEntry]) -> MacroTotals {
    entries.iter().fold(MacroTotals::default(), |acc, entry| MacroTotals {
        calories: acc.calories + entry.calorie_increase,
        protein_g: acc.protein_g + entry.protein_increase,
        fat_g: acc.fat_g + entry.fat_increase,
        carbohydrate_g: acc.carbohydrate_g + entry.carb_increase,
    })
}

pub fn summarize(result: &OptimizationResult, targets: &DailyTargets) -> OptimizationSummary {
    let before = result.current_totals;
    let increase = total_increase(&result.entries);
    let after = before.plus(&increase);

    OptimizationSummary {
        before,
        increase,
        after,
        before_progress: progress_towards(&before, targets),
        after_progress: progress_towards(&after, targets),
        remaining_protein_deficit: result.final_state.protein_needed,
        remaining_fat_deficit: result.final_state.fat_needed,
    }
}
