// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Waterfall Simulation Engine - Simulation Core

use tracing::{debug, info, warn};

use crate::condition::{self, Condition};
use crate::config::SimulationConfig;
use crate::conservation::ConservationLaw;
use crate::error::WaterfallError;
use crate::flow;
use crate::rates;
use crate::types::*;

// ─── Observer ────────────────────────────────────────────────────────────────

/// Receives a report after every flow step of [`Waterfall::run_income`].
pub trait FlowObserver {
    fn on_step(&mut self, report: &StepReport);
}

impl<F: FnMut(&StepReport)> FlowObserver for F {
    fn on_step(&mut self, report: &StepReport) {
        self(report)
    }
}

/// Observer that ignores every step.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl FlowObserver for NoopObserver {
    fn on_step(&mut self, _report: &StepReport) {}
}

/// Observer that keeps every report.
#[derive(Debug, Default, Clone)]
pub struct StepRecorder {
    pub steps: Vec<StepReport>,
}

impl FlowObserver for StepRecorder {
    fn on_step(&mut self, report: &StepReport) {
        self.steps.push(report.clone());
    }
}

// ─── Waterfall ───────────────────────────────────────────────────────────────

/// A fixed arena of blocks plus the conditions that reshape it.
#[derive(Debug, Clone)]
pub struct Waterfall {
    pub(crate) blocks: Vec<Block>,
    pub(crate) conditions: Vec<Condition>,
    pub(crate) config: SimulationConfig,
    pub(crate) conservation: ConservationLaw,
    /// Revenue the blocks held before any income was run.
    pub(crate) opening_revenue: f64,
    /// All root income injected so far, across runs.
    pub(crate) income_injected: f64,
}

impl Waterfall {
    pub(crate) fn new(
        blocks: Vec<Block>,
        conditions: Vec<Condition>,
        config: SimulationConfig,
    ) -> Self {
        let opening_revenue = blocks.iter().map(|b| b.revenue).sum();
        let conservation = ConservationLaw::new(config.conservation_tolerance);
        Self {
            blocks,
            conditions,
            config,
            conservation,
            opening_revenue,
            income_injected: 0.0,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.index())
    }

    pub fn block_by_name(&self, name: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.name == name)
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn conservation(&self) -> &ConservationLaw {
        &self.conservation
    }

    pub fn income_injected(&self) -> f64 {
        self.income_injected
    }

    pub fn opening_revenue(&self) -> f64 {
        self.opening_revenue
    }

    pub fn total_revenue(&self) -> f64 {
        self.blocks.iter().map(|b| b.revenue).sum()
    }

    pub fn snapshot(&self) -> Vec<BlockSnapshot> {
        self.blocks.iter().map(Block::snapshot).collect()
    }

    /// Recompute every block's global rates for unit income at `root`.
    pub fn compute_rates(&mut self, root: BlockId) -> Result<(), WaterfallError> {
        rates::compute_rates(&mut self.blocks, root, self.config.max_depth)
    }

    /// Nearest unsatisfied condition under the current rates, with the root
    /// income it needs. Call [`compute_rates`](Self::compute_rates) first.
    pub fn find_first_condition(&self) -> Option<(usize, f64)> {
        condition::find_first_condition(&self.conditions, &self.blocks)
    }

    /// Flow `income` from `root` under the current parameters, with no
    /// condition handling.
    pub fn flow(&mut self, root: BlockId, income: f64) -> Result<(), WaterfallError> {
        flow::flow(&mut self.blocks, root, income, self.config.max_depth)?;
        self.income_injected += income;
        Ok(())
    }

    /// Run `initial_income` through the waterfall, firing conditions as
    /// their thresholds are reached.
    ///
    /// Each round recomputes rates, flows either the income the nearest
    /// condition needs or everything that is left, and reports to `observer`.
    /// A fired condition installs its parameter updates before the next
    /// round; rates from before the update are never reused.
    pub fn run_income<O: FlowObserver + ?Sized>(
        &mut self,
        root: BlockId,
        initial_income: f64,
        observer: &mut O,
    ) -> Result<RunSummary, WaterfallError> {
        if !initial_income.is_finite() || initial_income < 0.0 {
            return Err(WaterfallError::NegativeIncome(initial_income));
        }
        if self.block(root).is_none() {
            return Err(WaterfallError::UnknownBlock(root.to_string()));
        }

        let mut summary = RunSummary::new(initial_income);
        let mut income = initial_income;
        let mut step = 0u32;

        while income > 0.0 {
            self.compute_rates(root)?;

            let (amount, fired) = match self.find_first_condition() {
                Some((idx, needed)) if needed <= income => (needed, Some(idx)),
                _ => (income, None),
            };

            let (retained, leaked) = self.flow_step(root, amount)?;
            income = if fired.is_some() { income - amount } else { 0.0 };

            let report = StepReport {
                step,
                amount,
                remaining: income,
                fired,
                fired_label: fired.map(|idx| self.conditions[idx].describe()),
                leaked,
                blocks: self.snapshot(),
            };
            observer.on_step(&report);
            summary.record(&report, retained);
            step += 1;

            match fired {
                Some(idx) => self.fire_condition(idx),
                None => break,
            }
        }

        info!(
            steps = summary.steps,
            fired = summary.fired.len(),
            retained = summary.retained,
            leakage = summary.leakage,
            "income run complete"
        );
        Ok(summary)
    }

    /// Flow one bounded amount and check it against the current rates.
    fn flow_step(&mut self, root: BlockId, amount: f64) -> Result<(f64, f64), WaterfallError> {
        let before = self.total_revenue();
        let leaked = amount * (1.0 - rates::retained_rate(&self.blocks));
        self.flow(root, amount)?;
        let retained = self.total_revenue() - before;

        let check = self.conservation.verify_step(amount, retained, leaked);
        if !check.balanced {
            if self.config.strict_conservation {
                return Err(WaterfallError::ConservationViolated {
                    expected: check.expected,
                    actual: check.actual,
                });
            }
            warn!(
                amount,
                retained,
                leaked,
                error = check.error,
                "flow step does not conserve income"
            );
        }
        debug!(amount, retained, leaked, "flowed");
        Ok((retained, leaked))
    }

    /// Mark condition `idx` satisfied and install its updates.
    fn fire_condition(&mut self, idx: usize) {
        let Some(condition) = self.conditions.get_mut(idx) else {
            return;
        };
        condition.mark_satisfied();
        for (id, params) in &condition.updates {
            if let Some(block) = self.blocks.get_mut(id.index()) {
                block.install_params(params.clone());
            }
        }
        info!(condition = %condition.describe(), updates = condition.updates.len(), "condition fired");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
