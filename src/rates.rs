// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Waterfall Simulation Engine - Global Rate Pass

//! Marginal rates: for one unit of income injected at the root, how much ends
//! up as each block's revenue and how much passes through it as turnover.

use tracing::debug;

use crate::error::WaterfallError;
use crate::types::{Block, BlockId};

/// Reset every block's global rates, then propagate a unit rate from `root`.
///
/// Blocks unreachable from `root` under the current parameters keep rate 0.
/// Cumulative revenue and turnover are not touched.
pub fn compute_rates(
    blocks: &mut [Block],
    root: BlockId,
    max_depth: usize,
) -> Result<(), WaterfallError> {
    for block in blocks.iter_mut() {
        block.reset_rates();
    }
    local_compute_rates(blocks, root, 1.0, 0, max_depth)
}

fn local_compute_rates(
    blocks: &mut [Block],
    id: BlockId,
    incoming_rate: f64,
    depth: usize,
    max_depth: usize,
) -> Result<(), WaterfallError> {
    if depth > max_depth {
        return Err(WaterfallError::DepthExceeded { depth: max_depth });
    }
    let block = blocks
        .get_mut(id.index())
        .ok_or_else(|| WaterfallError::UnknownBlock(id.to_string()))?;

    block.global_revenue_rate = incoming_rate * block.params.local_rate;
    block.global_turnover_rate = incoming_rate;
    let remaining = incoming_rate - block.global_revenue_rate;
    debug!(
        block = %block.name,
        revenue_rate = block.global_revenue_rate,
        turnover_rate = block.global_turnover_rate,
        "computed global rates"
    );

    // Hold the snapshot, not the block, while recursing into the arena.
    let params = block.params_snapshot();
    for &(child, share) in &params.children {
        local_compute_rates(blocks, child, share * remaining, depth + 1, max_depth)?;
    }
    Ok(())
}

/// Fraction of one unit of root income retained somewhere in the tree.
pub fn retained_rate(blocks: &[Block]) -> f64 {
    blocks.iter().map(|b| b.global_revenue_rate).sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
