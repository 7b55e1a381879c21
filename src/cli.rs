use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Close protein/fat gaps in a grocery list by scaling recipes", long_about = None)]
pub struct Cli {
    /// Path to the grocery snapshot JSON (falls back to GROCERY_SNAPSHOT_PATH)
    #[arg(short, long)]
    pub snapshot_file: Option<String>,

    /// Apply the suggested increases to the recipe scale factors
    #[arg(short, long)]
    pub apply: bool,

    /// Where to write the updated recipe scale states (JSON) after --apply
    #[arg(short, long)]
    pub output: Option<String>,

    /// Write the suggested increases as CSV
    #[arg(long)]
    pub csv_out: Option<String>,

    /// Cap on total calorie growth, in percent of the daily calorie target
    #[arg(long, default_value_t = 10.0)]
    pub max_increase_percent: f64,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
