// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Waterfall Simulation Engine - Conservation Logic

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_CONSERVATION_TOLERANCE;

/// Income accounting error of a single flow step.
///
/// In a closed waterfall every unit of income is either retained by some
/// block or leaked through shares summing to less than one:
///   income = retained + leaked
pub fn compute_conservation(income: f64, retained: f64, leaked: f64) -> f64 {
    (income - (retained + leaked)).abs()
}

// ---------------------------------------------------------------------------
// Conservation result
// ---------------------------------------------------------------------------

/// Outcome of checking one flow step.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ConservationResult {
    pub balanced: bool,
    pub error: f64,
    pub expected: f64,
    pub actual: f64,
}

// ---------------------------------------------------------------------------
// Conservation law
// ---------------------------------------------------------------------------

/// Running income-accounting check over a whole simulation.
///
/// `leaked` is predicted from the global rates computed before the step,
/// `retained` is measured from the balances after it, so a step that
/// disagrees with its own rate pass shows up here.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ConservationLaw {
    /// Relative tolerance, scaled by `max(1, income)`.
    pub tolerance: f64,
    /// Sum of the errors of every unbalanced step.
    pub cumulative_error: f64,
    pub violations: u32,
    pub checks: u32,
}

impl ConservationLaw {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            cumulative_error: 0.0,
            violations: 0,
            checks: 0,
        }
    }

    /// Verify `income == retained + leaked` for one flow step.
    pub fn verify_step(&mut self, income: f64, retained: f64, leaked: f64) -> ConservationResult {
        self.checks += 1;
        let actual = retained + leaked;
        let error = compute_conservation(income, retained, leaked);
        let balanced = error <= self.tolerance * income.max(1.0);

        if !balanced {
            self.cumulative_error += error;
            self.violations += 1;
        }

        ConservationResult {
            balanced,
            error,
            expected: income,
            actual,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.violations == 0
    }
}

impl Default for ConservationLaw {
    fn default() -> Self {
        Self::new(DEFAULT_CONSERVATION_TOLERANCE)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
