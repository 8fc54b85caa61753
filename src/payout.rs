// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Payout statements -- final balances in currency minor units.
//!
//! The engine runs on `f64`. Statements convert each block's cumulative
//! revenue and turnover to `Decimal`, round them to the configured number of
//! decimal places (banker's rounding), and account for everything the
//! rounded lines do not cover: share leakage plus rounding residue.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::adapter::try_to_decimal;
use crate::simulation::Waterfall;
use crate::types::BlockId;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from building a payout statement.
#[derive(Debug, thiserror::Error)]
pub enum PayoutError {
    #[error("block {block} holds a non-finite amount ({value})")]
    NonFinite { block: String, value: f64 },
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// One block's line in a statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutLine {
    pub block: BlockId,
    pub name: String,
    pub revenue: Decimal,
    pub turnover: Decimal,
}

/// Rounded balances of every block after a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutStatement {
    pub lines: Vec<PayoutLine>,
    /// Root income injected over the waterfall's lifetime.
    pub income: Decimal,
    /// Revenue the blocks held before any income, rounded like the lines.
    pub opening_revenue: Decimal,
    /// Sum of the rounded revenue lines.
    pub total_revenue: Decimal,
    /// `income - (total_revenue - opening_revenue)`.
    pub unallocated: Decimal,
}

impl PayoutStatement {
    /// Build a statement rounded to `minor_units` decimal places.
    pub fn from_waterfall(waterfall: &Waterfall, minor_units: u32) -> Result<Self, PayoutError> {
        let round = |d: Decimal| {
            d.round_dp_with_strategy(minor_units, RoundingStrategy::MidpointNearestEven)
        };
        let convert = |name: &str, value: f64| {
            try_to_decimal(value).map(&round).ok_or_else(|| PayoutError::NonFinite {
                block: name.to_string(),
                value,
            })
        };

        let lines = waterfall
            .blocks()
            .iter()
            .map(|b| {
                Ok(PayoutLine {
                    block: b.id,
                    name: b.name.clone(),
                    revenue: convert(&b.name, b.revenue)?,
                    turnover: convert(&b.name, b.turnover)?,
                })
            })
            .collect::<Result<Vec<_>, PayoutError>>()?;

        let income = convert("<root income>", waterfall.income_injected())?;
        let opening_revenue = convert("<opening revenue>", waterfall.opening_revenue())?;
        let total_revenue: Decimal = lines.iter().map(|l| l.revenue).sum();

        Ok(Self {
            lines,
            income,
            opening_revenue,
            total_revenue,
            unallocated: income - (total_revenue - opening_revenue),
        })
    }

    pub fn line(&self, name: &str) -> Option<&PayoutLine> {
        self.lines.iter().find(|l| l.name == name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
