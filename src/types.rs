// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Waterfall Simulation Engine - Type Definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ─── BlockId ─────────────────────────────────────────────────────────────────

/// Stable handle of a block: its index in the waterfall's block arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u32);

impl BlockId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ─── BlockParams ─────────────────────────────────────────────────────────────

/// Split parameters of a block, replaced wholesale when a condition fires.
///
/// `local_rate` is the fraction of incoming turnover kept as revenue. The
/// remainder goes to `children` in proportion to each share. Shares are not
/// normalised: whatever they leave undistributed is lost.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockParams {
    pub local_rate: f64,
    #[serde(default)]
    pub children: Vec<(BlockId, f64)>,
}

impl BlockParams {
    pub fn new(local_rate: f64) -> Self {
        Self { local_rate, children: Vec::new() }
    }

    pub fn with_children(local_rate: f64, children: Vec<(BlockId, f64)>) -> Self {
        Self { local_rate, children }
    }

    /// One child receiving the whole remainder.
    pub fn single_child(local_rate: f64, child: BlockId) -> Self {
        Self::with_children(local_rate, vec![(child, 1.0)])
    }

    /// Same children, different local rate.
    pub fn with_local_rate(&self, local_rate: f64) -> Self {
        Self { local_rate, children: self.children.clone() }
    }

    pub fn share_total(&self) -> f64 {
        self.children.iter().map(|(_, share)| share).sum()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

// ─── Block ───────────────────────────────────────────────────────────────────

/// A node of the waterfall.
///
/// `revenue` and `turnover` are cumulative and never decrease. The two global
/// rates are scratch values owned by the rate pass and are only meaningful
/// right after [`compute_rates`](crate::rates::compute_rates).
#[derive(Debug, Clone)]
pub struct Block {
    pub id: BlockId,
    pub name: String,
    pub revenue: f64,
    pub turnover: f64,
    pub global_revenue_rate: f64,
    pub global_turnover_rate: f64,
    pub(crate) params: Arc<BlockParams>,
}

impl Block {
    pub fn new(id: BlockId, name: impl Into<String>, params: BlockParams) -> Self {
        Self {
            id,
            name: name.into(),
            revenue: 0.0,
            turnover: 0.0,
            global_revenue_rate: 0.0,
            global_turnover_rate: 0.0,
            params: Arc::new(params),
        }
    }

    pub fn params(&self) -> &BlockParams {
        &self.params
    }

    /// Shared handle on the current parameter snapshot.
    pub fn params_snapshot(&self) -> Arc<BlockParams> {
        Arc::clone(&self.params)
    }

    /// Swap in a new parameter snapshot. Readers holding the old `Arc` keep
    /// seeing the old split.
    pub fn install_params(&mut self, params: Arc<BlockParams>) {
        self.params = params;
    }

    pub(crate) fn reset_rates(&mut self) {
        self.global_revenue_rate = 0.0;
        self.global_turnover_rate = 0.0;
    }

    pub fn snapshot(&self) -> BlockSnapshot {
        BlockSnapshot {
            id: self.id,
            name: self.name.clone(),
            revenue: self.revenue,
            turnover: self.turnover,
        }
    }
}

// ─── CondKind ────────────────────────────────────────────────────────────────

/// Which cumulative amount a condition watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CondKind {
    Revenue,
    Turnover,
}

impl CondKind {
    /// Current marginal rate of `block` for this kind.
    pub fn rate(self, block: &Block) -> f64 {
        match self {
            Self::Revenue => block.global_revenue_rate,
            Self::Turnover => block.global_turnover_rate,
        }
    }

    /// Cumulative amount of `block` for this kind.
    pub fn amount(self, block: &Block) -> f64 {
        match self {
            Self::Revenue => block.revenue,
            Self::Turnover => block.turnover,
        }
    }
}

impl fmt::Display for CondKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Revenue => write!(f, "revenue"),
            Self::Turnover => write!(f, "turnover"),
        }
    }
}

// ─── BlockSnapshot ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSnapshot {
    pub id: BlockId,
    pub name: String,
    pub revenue: f64,
    pub turnover: f64,
}

// ─── StepReport ──────────────────────────────────────────────────────────────

/// What happened in one round of [`Waterfall::run_income`](crate::Waterfall::run_income).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub step: u32,
    /// Root income flowed in this round.
    pub amount: f64,
    /// Root income still waiting after this round.
    pub remaining: f64,
    /// Index of the condition that fired at the end of the round, if any.
    pub fired: Option<usize>,
    #[serde(default)]
    pub fired_label: Option<String>,
    /// Part of `amount` that no block retained.
    pub leaked: f64,
    pub blocks: Vec<BlockSnapshot>,
}

// ─── RunSummary ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub steps: u32,
    /// Conditions fired, in firing order.
    pub fired: Vec<usize>,
    pub income: f64,
    pub retained: f64,
    pub leakage: f64,
}

impl RunSummary {
    pub fn new(income: f64) -> Self {
        Self { income, ..Self::default() }
    }

    pub(crate) fn record(&mut self, report: &StepReport, retained: f64) {
        self.steps += 1;
        self.retained += retained;
        self.leakage += report.leaked;
        if let Some(idx) = report.fired {
            self.fired.push(idx);
        }
    }
}
