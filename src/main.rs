use anyhow::{anyhow, Context, Result};
use grocery_optim::cli::parse_args;
use grocery_optim::grocery_report::{render_comparison_table, write_entries_csv};
use grocery_optim::optim::nutri_eval::summarize;
use grocery_optim::optim::OptimizerSettings;
use grocery_optim::recipe_snapshot::{load_snapshot, save_scale_states};
use grocery_optim::session::{GroceryOptimizationSession, SessionError};
use std::path::Path;
use tracing_subscriber::EnvFilter;

// Environment variable holding the default snapshot path
const SNAPSHOT_ENV_VAR: &str = "GROCERY_SNAPSHOT_PATH";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("grocery_optim=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli_args = parse_args();
    let snapshot_path = match cli_args.snapshot_file.clone() {
        Some(path) => path,
        None => std::env::var(SNAPSHOT_ENV_VAR)
            .map_err(|_| anyhow!("No --snapshot-file given and {} is not set", SNAPSHOT_ENV_VAR))?,
    };

    if !(cli_args.max_increase_percent >= 0.0) {
        return Err(anyhow!(
            "--max-increase-percent must be a non-negative number, got {}",
            cli_args.max_increase_percent
        ));
    }
    let settings = OptimizerSettings {
        max_calorie_increase_fraction: cli_args.max_increase_percent / 100.0,
        ..OptimizerSettings::default()
    };

    println!("Reading grocery snapshot: {}", snapshot_path);
    let snapshot = load_snapshot(Path::new(&snapshot_path)).await?;
    println!(
        "Loaded {} recipes (targets: {:.0} kcal, {:.0}g protein, {:.0}g fat)",
        snapshot.recipes.len(),
        snapshot.targets.calorie_target,
        snapshot.targets.protein_target,
        snapshot.targets.fat_target
    );

    let mut session = GroceryOptimizationSession::new(snapshot, settings);
    let summary = summarize(session.result(), &session.snapshot().targets);

    println!("\n{}", render_comparison_table(&session.result().entries, &summary));

    if let Some(csv_path) = &cli_args.csv_out {
        write_entries_csv(Path::new(csv_path), &session.result().entries)?;
        println!("Wrote {} entries to {}", session.result().entries.len(), csv_path);
    }

    if cli_args.apply {
        match session.apply() {
            Ok(report) => {
                for change in &report.changes {
                    println!(
                        "{} ({}): scale {:.3} -> {:.3}",
                        change.recipe, change.ingredient_name, change.old_scale_factor, change.new_scale_factor
                    );
                }
                for skipped in &report.skipped {
                    eprintln!(
                        "Skipped {} in {}: {:?}",
                        skipped.ingredient_name, skipped.recipe, skipped.reason
                    );
                }
            }
            Err(SessionError::NothingToApply) => {
                println!("Nothing to apply.");
                return Ok(());
            }
            Err(e) => return Err(e).context("Failed to apply grocery optimization"),
        }

        match &cli_args.output {
            Some(output_path) => {
                save_scale_states(Path::new(output_path), session.scale_states()).await?;
                println!("Updated recipe scale states written to {}", output_path);
            }
            None => {
                let json = serde_json::to_string_pretty(session.scale_states())
                    .context("Failed to encode recipe scale states")?;
                println!("\nUpdated recipe scale states:\n{}", json);
            }
        }
    }

    Ok(())
}
