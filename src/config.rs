// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Waterfall Simulation Engine - Configuration

use serde::{Deserialize, Serialize};

/// Maximum recursion depth of the rate and flow passes.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Relative tolerance of the per-step conservation check.
pub const DEFAULT_CONSERVATION_TOLERANCE: f64 = 1e-6;

/// Knobs of a [`Waterfall`](crate::Waterfall) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Recursion guard. A cyclic `children` graph fails with
    /// [`DepthExceeded`](crate::WaterfallError::DepthExceeded) instead of
    /// overflowing the stack.
    pub max_depth: usize,
    /// Relative error allowed between flowed income and retained + leaked.
    pub conservation_tolerance: f64,
    /// Fail the run on a conservation violation instead of logging it.
    pub strict_conservation: bool,
    /// Decimal places of payout statements (2 = cents).
    pub minor_units: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            conservation_tolerance: DEFAULT_CONSERVATION_TOLERANCE,
            strict_conservation: false,
            minor_units: 2,
        }
    }
}

impl SimulationConfig {
    pub fn strict() -> Self {
        Self { strict_conservation: true, ..Self::default() }
    }
}
