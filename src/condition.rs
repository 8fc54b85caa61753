// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Waterfall Simulation Engine - Conditions & Scheduling

use std::sync::Arc;

use tracing::debug;

use crate::types::{Block, BlockId, BlockParams, CondKind};

/// `income_needed` result for a condition no further income can move.
pub const UNREACHABLE: f64 = -1.0;

/// One-shot threshold rule on the summed revenue or turnover of some blocks.
///
/// Once the sum reaches `threshold`, every `(block, params)` pair in
/// `updates` is installed and the condition stays satisfied forever.
#[derive(Debug, Clone)]
pub struct Condition {
    pub kind: CondKind,
    pub threshold: f64,
    pub targets: Vec<BlockId>,
    pub updates: Vec<(BlockId, Arc<BlockParams>)>,
    pub label: Option<String>,
    satisfied: bool,
}

impl Condition {
    pub fn new(
        kind: CondKind,
        threshold: f64,
        targets: Vec<BlockId>,
        updates: Vec<(BlockId, BlockParams)>,
    ) -> Self {
        Self {
            kind,
            threshold,
            targets,
            updates: updates
                .into_iter()
                .map(|(id, params)| (id, Arc::new(params)))
                .collect(),
            label: None,
            satisfied: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn is_satisfied(&self) -> bool {
        self.satisfied
    }

    pub(crate) fn mark_satisfied(&mut self) {
        self.satisfied = true;
    }

    /// Root income still needed for this condition to be met exactly, under
    /// the rates of the last [`compute_rates`](crate::rates::compute_rates).
    pub fn income_needed(&self, blocks: &[Block]) -> f64 {
        income_needed(self.kind, self.threshold, &self.targets, blocks)
    }

    /// Human-readable name for logs: the label, or the condition's shape.
    pub fn describe(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => format!("{} >= {}", self.kind, self.threshold),
        }
    }
}

/// `(threshold - done) / rate` summed over `targets`, or [`UNREACHABLE`] when
/// the combined rate is zero.
///
/// The result is negative when the threshold has already been passed.
pub fn income_needed(kind: CondKind, threshold: f64, targets: &[BlockId], blocks: &[Block]) -> f64 {
    let (cond_rate, amount_done) = targets
        .iter()
        .filter_map(|id| blocks.get(id.index()))
        .fold((0.0, 0.0), |(rate, done), block| {
            (rate + kind.rate(block), done + kind.amount(block))
        });

    if cond_rate == 0.0 {
        UNREACHABLE
    } else {
        (threshold - amount_done) / cond_rate
    }
}

/// The unsatisfied condition needing the least strictly positive income, and
/// that income. Ties go to the earliest condition.
pub fn find_first_condition(conditions: &[Condition], blocks: &[Block]) -> Option<(usize, f64)> {
    let mut first: Option<(usize, f64)> = None;
    for (idx, condition) in conditions.iter().enumerate() {
        if condition.is_satisfied() {
            continue;
        }
        let needed = condition.income_needed(blocks);
        if needed.is_nan() || needed <= 0.0 {
            continue;
        }
        match first {
            Some((_, best)) if needed >= best => {}
            _ => first = Some((idx, needed)),
        }
    }
    debug!(min_income_needed = ?first.map(|(_, n)| n), "scheduled next condition");
    first
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn rated(id: u32, revenue_rate: f64, turnover_rate: f64) -> Block {
        let mut b = Block::new(BlockId(id), format!("b{id}"), BlockParams::new(0.0));
        b.global_revenue_rate = revenue_rate;
        b.global_turnover_rate = turnover_rate;
        b
    }

    fn revenue_condition(threshold: f64, targets: &[u32]) -> Condition {
        Condition::new(
            CondKind::Revenue,
            threshold,
            targets.iter().map(|&t| BlockId(t)).collect(),
            Vec::new(),
        )
    }

    #[test]
    fn needed_sums_targets() {
        let mut blocks = vec![rated(0, 0.1, 1.0), rated(1, 0.3, 0.9)];
        blocks[0].revenue = 10.0;
        blocks[1].revenue = 30.0;

        let needed = income_needed(CondKind::Revenue, 100.0, &[BlockId(0), BlockId(1)], &blocks);
        assert!((needed - 150.0).abs() < 1e-9, "got {needed}");
    }

    #[test]
    fn needed_uses_turnover_for_turnover_kind() {
        let mut blocks = vec![rated(0, 0.0, 0.25)];
        blocks[0].turnover = 50.0;
        let needed = income_needed(CondKind::Turnover, 100.0, &[BlockId(0)], &blocks);
        assert!((needed - 200.0).abs() < 1e-9);
    }

    #[test]
    fn zero_rate_is_unreachable() {
        let blocks = vec![rated(0, 0.0, 0.0)];
        assert_eq!(
            income_needed(CondKind::Revenue, 10.0, &[BlockId(0)], &blocks),
            UNREACHABLE
        );
    }

    #[test]
    fn passed_threshold_is_negative() {
        let mut blocks = vec![rated(0, 0.5, 1.0)];
        blocks[0].revenue = 80.0;
        assert!(income_needed(CondKind::Revenue, 60.0, &[BlockId(0)], &blocks) < 0.0);
    }

    #[test]
    fn scheduler_picks_smallest_positive() {
        let blocks = vec![rated(0, 0.5, 1.0)];
        let conditions = vec![
            revenue_condition(40.0, &[0]),
            revenue_condition(10.0, &[0]),
            revenue_condition(25.0, &[0]),
        ];
        let (idx, needed) = find_first_condition(&conditions, &blocks).expect("test: some");
        assert_eq!(idx, 1);
        assert!((needed - 20.0).abs() < 1e-9);
    }

    #[test]
    fn scheduler_skips_sentinel_and_non_positive() {
        let mut blocks = vec![rated(0, 0.5, 1.0), rated(1, 0.0, 0.0)];
        blocks[0].revenue = 50.0;
        let conditions = vec![
            revenue_condition(10.0, &[1]), // unreachable
            revenue_condition(50.0, &[0]), // exactly met already
            revenue_condition(20.0, &[0]), // passed
        ];
        assert!(find_first_condition(&conditions, &blocks).is_none());
    }

    #[test]
    fn scheduler_skips_nan_need() {
        let blocks = vec![rated(0, 0.5, 1.0)];
        let conditions = vec![revenue_condition(f64::NAN, &[0])];
        assert!(find_first_condition(&conditions, &blocks).is_none());
    }

    #[test]
    fn scheduler_skips_satisfied() {
        let blocks = vec![rated(0, 0.5, 1.0)];
        let mut conditions = vec![revenue_condition(10.0, &[0]), revenue_condition(30.0, &[0])];
        conditions[0].mark_satisfied();
        let (idx, _) = find_first_condition(&conditions, &blocks).expect("test: some");
        assert_eq!(idx, 1);
    }

    #[test]
    fn scheduler_ties_go_to_first() {
        let blocks = vec![rated(0, 0.5, 1.0), rated(1, 0.5, 1.0)];
        let conditions = vec![revenue_condition(10.0, &[1]), revenue_condition(10.0, &[0])];
        let (idx, _) = find_first_condition(&conditions, &blocks).expect("test: some");
        assert_eq!(idx, 0);
    }

    #[test]
    fn describe_prefers_label() {
        let plain = revenue_condition(100.0, &[0]);
        assert_eq!(plain.describe(), "revenue >= 100");
        assert_eq!(plain.with_label("recoup").describe(), "recoup");
    }
}
