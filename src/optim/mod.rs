pub mod nutri_eval;
pub mod optimizer;
pub mod ranker;
pub mod targets;

pub use optimizer::{optimize_grocery_list, OptimizationEntry, OptimizationRequest, OptimizationResult};
pub use targets::{DailyTargets, OptimizerSettings};
