// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Flow -- pushing a concrete amount of income down the block tree.
//!
//! No value is created here. Each block keeps `local_rate` of what reaches it
//! and splits the rest among its children by share. Shares that sum to less
//! than one leave part of the remainder undistributed.

use crate::error::WaterfallError;
use crate::types::{Block, BlockId};

/// Distribute `income` from `id` downwards, adding to cumulative turnover and
/// revenue of every block it reaches.
pub fn flow(
    blocks: &mut [Block],
    id: BlockId,
    income: f64,
    max_depth: usize,
) -> Result<(), WaterfallError> {
    if !income.is_finite() || income < 0.0 {
        return Err(WaterfallError::NegativeIncome(income));
    }
    flow_at_depth(blocks, id, income, 0, max_depth)
}

fn flow_at_depth(
    blocks: &mut [Block],
    id: BlockId,
    income: f64,
    depth: usize,
    max_depth: usize,
) -> Result<(), WaterfallError> {
    if depth > max_depth {
        return Err(WaterfallError::DepthExceeded { depth: max_depth });
    }
    let block = blocks
        .get_mut(id.index())
        .ok_or_else(|| WaterfallError::UnknownBlock(id.to_string()))?;

    block.turnover += income;
    let to_take = income * block.params.local_rate;
    block.revenue += to_take;
    let remains = income - to_take;

    let params = block.params_snapshot();
    for &(child, share) in &params.children {
        flow_at_depth(blocks, child, share * remains, depth + 1, max_depth)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
