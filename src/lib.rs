pub mod cli;
pub mod grocery_report;
pub mod optim;
pub mod recipe_aggregator;
pub mod recipe_snapshot;
pub mod result_applier;
pub mod session;
