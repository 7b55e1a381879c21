use serde::{Deserialize, Serialize};

use crate::recipe_aggregator::MacroTotals;
use crate::recipe_snapshot::lenient_f64;

/// Daily goals the grocery list is optimized towards.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyTargets {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub calorie_target: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub protein_target: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub fat_target: f64,
}

/// Tunables of a single optimization pass. The defaults are the production values.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct OptimizerSettings {
    /// Cap on total calorie growth, as a fraction of the daily calorie target.
    pub max_calorie_increase_fraction: f64,
    /// Calorie headroom (kcal) below which there is nothing worth filling.
    pub min_calorie_headroom: f64,
    /// Increases at or below this many grams are discarded.
    pub min_increase_grams: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        OptimizerSettings {
            max_calorie_increase_fraction: 0.10,
            min_calorie_headroom: 50.0,
            min_increase_grams: 0.1,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct DeficitReport {
    pub protein_deficit: f64,
    pub fat_deficit: f64,
    pub remaining_calories: f64,
    /// Hard cap on the calories this pass may add.
    pub calorie_ceiling: f64,
}

impl DeficitReport {
    /// Whether an optimization pass is worth running for these deficits.
    ///
    /// Requires something to close (a macro deficit or meaningful calorie
    /// headroom) and at least one macro target to aim for.
    pub fn should_optimize(&self, targets: &DailyTargets, settings: &OptimizerSettings) -> bool {
        let has_gap = self.protein_deficit > 0.0
            || self.fat_deficit > 0.0
            || self.remaining_calories > settings.min_calorie_headroom;
        let has_macro_target = targets.protein_target > 0.0 || targets.fat_target > 0.0;
        has_gap && has_macro_target
    }
}

/// Derives the deficits and the calorie ceiling from current totals and daily targets.
pub fn calculate_deficits(
    current: &MacroTotals,
    targets: &DailyTargets,
    settings: &OptimizerSettings,
) -> DeficitReport {
    let protein_deficit = (targets.protein_target - current.protein_g).max(0.0);
    let fat_deficit = (targets.fat_target - current.fat_g).max(0.0);
    let remaining_calories = (targets.calorie_target - current.calories).max(0.0);
    let calorie_ceiling = (targets.calorie_target * settings.max_calorie_increase_fraction)
        .min(remaining_calories)
        .max(0.0);

    DeficitReport {
        protein_deficit,
        fat_deficit,
        remaining_calories,
        calorie_ceiling,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(calories: f64, protein_g: f64, fat_g: f64) -> MacroTotals {
        MacroTotals {
            calories,
            protein_g,
            fat_g,
            carbohydrate_g: 0.0,
        }
    }

    #[test]
    fn test_deficits_and_ceiling_capped_by_ten_percent() {
        let targets = DailyTargets {
            calorie_target: 2000.0,
            protein_target: 150.0,
            fat_target: 60.0,
        };
        let report = calculate_deficits(&totals(1500.0, 100.0, 70.0), &targets, &OptimizerSettings::default());
        assert_eq!(report.protein_deficit, 50.0);
        assert_eq!(report.fat_deficit, 0.0); // surplus is floored
        assert_eq!(report.remaining_calories, 500.0);
        assert_eq!(report.calorie_ceiling, 200.0);
    }

    #[test]
    fn test_ceiling_capped_by_remaining_calories() {
        let targets = DailyTargets {
            calorie_target: 2000.0,
            protein_target: 100.0,
            fat_target: 0.0,
        };
        let report = calculate_deficits(&totals(1950.0, 90.0, 0.0), &targets, &OptimizerSettings::default());
        assert_eq!(report.remaining_calories, 50.0);
        assert_eq!(report.calorie_ceiling, 50.0);
    }

    #[test]
    fn test_over_target_leaves_no_ceiling() {
        let targets = DailyTargets {
            calorie_target: 1800.0,
            protein_target: 120.0,
            fat_target: 50.0,
        };
        let report = calculate_deficits(&totals(2100.0, 80.0, 40.0), &targets, &OptimizerSettings::default());
        assert_eq!(report.remaining_calories, 0.0);
        assert_eq!(report.calorie_ceiling, 0.0);
        assert!(report.should_optimize(&targets, &OptimizerSettings::default()));
    }

    #[test]
    fn test_no_macro_targets_never_triggers() {
        let targets = DailyTargets {
            calorie_target: 2000.0,
            protein_target: 0.0,
            fat_target: 0.0,
        };
        let report = calculate_deficits(&totals(500.0, 10.0, 5.0), &targets, &OptimizerSettings::default());
        assert!(report.remaining_calories > 50.0);
        assert!(!report.should_optimize(&targets, &OptimizerSettings::default()));
    }

    #[test]
    fn test_small_headroom_alone_does_not_trigger() {
        let targets = DailyTargets {
            calorie_target: 2000.0,
            protein_target: 100.0,
            fat_target: 50.0,
        };
        let report = calculate_deficits(&totals(1960.0, 120.0, 60.0), &targets, &OptimizerSettings::default());
        assert_eq!(report.remaining_calories, 40.0);
        assert!(!report.should_optimize(&targets, &OptimizerSettings::default()));
    }

    #[test]
    fn test_settings_deserialize_with_defaults() {
        let settings: OptimizerSettings = serde_json::from_str(r#"{"min_increase_grams": 1.0}"#).unwrap();
        assert_eq!(settings.min_increase_grams, 1.0);
        assert_eq!(settings.max_calorie_increase_fraction, 0.10);
        assert_eq!(settings.min_calorie_headroom, 50.0);
    }
}
