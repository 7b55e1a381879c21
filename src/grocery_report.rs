use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

use crate::optim::nutri_eval::{OptimizationSummary, TargetProgress};
use crate::optim::optimizer::{LimitingFactor, OptimizationEntry};
use crate::recipe_aggregator::MacroTotals;

const RECIPE_COLUMN_WIDTH: usize = 15;

/// Flat CSV row for one optimization entry.
#[derive(Debug, Serialize)]
struct EntryRow<'a> {
    recipe: &'a str,
    ingredient: &'a str,
    optimization_type: String,
    limiting_factor: &'static str,
    current_amount_g: f64,
    suggested_increase_g: f64,
    new_amount_g: f64,
    protein_increase_g: f64,
    fat_increase_g: f64,
    carb_increase_g: f64,
    calorie_increase: f64,
}

fn truncate_recipe_name(name: &str) -> String {
    if name.chars().count() > RECIPE_COLUMN_WIDTH {
        let head: String = name.chars().take(RECIPE_COLUMN_WIDTH).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}

fn opt_pct(pct: Option<f64>) -> String {
    pct.map_or_else(|| "no target".to_string(), |p| format!("{:.1}%", p))
}

fn status_block(out: &mut String, title: &str, totals: &MacroTotals, progress: &TargetProgress) {
    let _ = writeln!(out, "{}:", title);
    let _ = writeln!(out, "  Calories: {:.1} ({})", totals.calories, opt_pct(progress.calories_pct));
    let _ = writeln!(out, "  Fat:      {:.1}g ({})", totals.fat_g, opt_pct(progress.fat_pct));
    let _ = writeln!(out, "  Protein:  {:.1}g ({})", totals.protein_g, opt_pct(progress.protein_pct));
    let _ = writeln!(out, "  Carbs:    {:.1}g", totals.carbohydrate_g);
}

/// Renders the before/after status and the table of suggested changes.
pub fn render_comparison_table(entries: &[OptimizationEntry], summary: &OptimizationSummary) -> String {
    let mut out = String::new();

    status_block(&mut out, "Current Status", &summary.before, &summary.before_progress);
    if entries.is_empty() {
        let _ = writeln!(out, "\nNo optimizations available: targets already met or no suitable ingredients.");
        return out;
    }
    status_block(&mut out, "After Optimization", &summary.after, &summary.after_progress);

    let _ = writeln!(
        out,
        "\n{:<24} {:<20} {:>10} {:>10} {:>10} {:>10}  {}",
        "Ingredient", "Amount Change", "+Protein", "+Fat", "+Carbs", "+Calories", "Recipe"
    );
    for entry in entries {
        let change = format!("{:.1}g -> {:.1}g", entry.current_amount, entry.new_amount);
        let _ = writeln!(
            out,
            "{:<24} {:<20} {:>10.1} {:>10.1} {:>10.1} {:>10.1}  {}",
            entry.ingredient_name,
            change,
            entry.protein_increase,
            entry.fat_increase,
            entry.carb_increase,
            entry.calorie_increase,
            truncate_recipe_name(&entry.recipe_ref.name)
        );
    }
    let _ = writeln!(
        out,
        "{:<24} {:<20} {:>10.1} {:>10.1} {:>10.1} {:>10.1}",
        "Total",
        "",
        summary.increase.protein_g,
        summary.increase.fat_g,
        summary.increase.carbohydrate_g,
        summary.increase.calories
    );
    if summary.remaining_protein_deficit > 0.0 || summary.remaining_fat_deficit > 0.0 {
        let _ = writeln!(
            out,
            "\nStill short: {:.1}g protein, {:.1}g fat",
            summary.remaining_protein_deficit, summary.remaining_fat_deficit
        );
    }

    out
}

pub fn write_entries_csv(path: &Path, entries: &[OptimizationEntry]) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to create CSV report at {:?}", path))?;

    for entry in entries {
        writer
            .serialize(EntryRow {
                recipe: &entry.recipe_ref.name,
                ingredient: &entry.ingredient_name,
                optimization_type: entry.optimization_type.to_string(),
                limiting_factor: match entry.limiting_factor {
                    LimitingFactor::MacroNeed => "macro_need",
                    LimitingFactor::CalorieCeiling => "calorie_ceiling",
                },
                current_amount_g: entry.current_amount,
                suggested_increase_g: entry.suggested_increase,
                new_amount_g: entry.new_amount,
                protein_increase_g: entry.protein_increase,
                fat_increase_g: entry.fat_increase,
                carb_increase_g: entry.carb_increase,
                calorie_increase: entry.calorie_increase,
            })
            .with_context(|| format!("Failed to write CSV row for '{}'", entry.ingredient_name))?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to flush CSV report at {:?}", path))
}
