use thiserror::Error;
use tracing::info;

use crate::optim::optimizer::{optimize_grocery_list, OptimizationRequest, OptimizationResult};
use crate::optim::targets::OptimizerSettings;
use crate::recipe_snapshot::{GrocerySnapshot, RecipeScaleState};
use crate::result_applier::{apply_optimizations, ApplyReport};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("optimization already applied to this grocery snapshot; regenerate the grocery list first")]
    AlreadyApplied,
    #[error("no grocery list optimizations to apply")]
    NothingToApply,
}

/// Owns one grocery snapshot, its optimization result, and the
/// "already applied" flag that keeps the result from being applied twice.
#[derive(Debug, Clone)]
pub struct GroceryOptimizationSession {
    request: OptimizationRequest,
    result: OptimizationResult,
    applied: bool,
}

impl GroceryOptimizationSession {
    pub fn new(snapshot: GrocerySnapshot, settings: OptimizerSettings) -> Self {
        let request = OptimizationRequest { snapshot, settings };
        let result = optimize_grocery_list(&request);
        GroceryOptimizationSession {
            request,
            result,
            applied: false,
        }
    }

    pub fn snapshot(&self) -> &GrocerySnapshot {
        &self.request.snapshot
    }

    pub fn result(&self) -> &OptimizationResult {
        &self.result
    }

    pub fn is_applied(&self) -> bool {
        self.applied
    }

    /// Current scale states; reflects the applied optimization once `apply` succeeded.
    pub fn scale_states(&self) -> &[RecipeScaleState] {
        &self.request.snapshot.adjusted_recipes
    }

    pub fn apply(&mut self) -> Result<ApplyReport, SessionError> {
        if self.applied {
            return Err(SessionError::AlreadyApplied);
        }
        if self.result.entries.is_empty() {
            return Err(SessionError::NothingToApply);
        }

        let snapshot = &mut self.request.snapshot;
        let report = apply_optimizations(&snapshot.recipes, &mut snapshot.adjusted_recipes, &self.result.entries);
        self.applied = true;
        info!(
            "Applied {} optimizations ({} skipped)",
            report.changes.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Starts over on a freshly generated snapshot.
    pub fn refresh(&mut self, snapshot: GrocerySnapshot) {
        self.request.snapshot = snapshot;
        self.result = optimize_grocery_list(&self.request);
        self.applied = false;
    }
}
