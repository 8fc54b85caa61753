// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Errors raised while building or running a waterfall.

use crate::types::BlockId;

/// Errors from waterfall construction and simulation.
///
/// Division by zero in the condition scheduler is *not* an error: an
/// unreachable condition reports the `-1` sentinel and is skipped.
#[derive(Debug, thiserror::Error)]
pub enum WaterfallError {
    #[error("unknown block: {0}")]
    UnknownBlock(String),

    #[error("duplicate block name: {0}")]
    DuplicateBlock(String),

    #[error("invalid rate {value} on block {block} (expected a finite value in [0, 1])")]
    InvalidRate { block: String, value: f64 },

    #[error("invalid share {value} from {parent} to {child} (expected a finite, non-negative value)")]
    InvalidShare { parent: BlockId, child: BlockId, value: f64 },

    #[error("block {child} would have two parents ({first} and {second})")]
    SharedChild { child: BlockId, first: BlockId, second: BlockId },

    #[error("condition threshold must be finite, got {0}")]
    InvalidThreshold(f64),

    #[error("income must be finite and non-negative, got {0}")]
    NegativeIncome(f64),

    #[error("tree deeper than {depth} levels -- cycle in block children?")]
    DepthExceeded { depth: usize },

    #[error("conservation violated: expected {expected}, got {actual}")]
    ConservationViolated { expected: f64, actual: f64 },

    #[error("invalid scenario: {0}")]
    InvalidScenario(String),
}
