// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Waterfall Simulation Engine - Waterfall Builder

use std::collections::HashMap;
use std::sync::Arc;

use crate::condition::Condition;
use crate::config::SimulationConfig;
use crate::error::WaterfallError;
use crate::simulation::Waterfall;
use crate::types::{Block, BlockId, BlockParams, CondKind};

/// Assembles the block arena and its conditions.
///
/// Blocks are added first, by name; children and conditions refer to the
/// returned [`BlockId`]s and are checked against the arena as they are added.
#[derive(Debug, Default)]
pub struct WaterfallBuilder {
    blocks: Vec<Block>,
    names: HashMap<String, BlockId>,
    conditions: Vec<Condition>,
    config: SimulationConfig,
}

impl WaterfallBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: SimulationConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a leaf block retaining `local_rate` of its turnover.
    pub fn add_block(&mut self, name: &str, local_rate: f64) -> Result<BlockId, WaterfallError> {
        if self.names.contains_key(name) {
            return Err(WaterfallError::DuplicateBlock(name.to_string()));
        }
        check_rate(name, local_rate)?;

        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block::new(id, name, BlockParams::new(local_rate)));
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Replace the children of `parent`, keeping its local rate.
    pub fn set_children(
        &mut self,
        parent: BlockId,
        children: Vec<(BlockId, f64)>,
    ) -> Result<(), WaterfallError> {
        let local_rate = self.block(parent)?.params().local_rate;
        let params = BlockParams::with_children(local_rate, children);
        self.check_params(parent, &params, &[])?;
        let block = self.block_mut(parent)?;
        block.install_params(params.into());
        Ok(())
    }

    /// Start `id` with amounts it already holds, e.g. revenue recouped before
    /// the simulated period.
    pub fn seed(&mut self, id: BlockId, revenue: f64, turnover: f64) -> Result<(), WaterfallError> {
        let block = self.block_mut(id)?;
        block.revenue = revenue;
        block.turnover = turnover;
        Ok(())
    }

    pub fn id(&self, name: &str) -> Result<BlockId, WaterfallError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| WaterfallError::UnknownBlock(name.to_string()))
    }

    /// Current parameters of `id`, as installed so far.
    pub fn params(&self, id: BlockId) -> Result<&BlockParams, WaterfallError> {
        Ok(self.block(id)?.params())
    }

    /// Register a condition after checking every block it mentions.
    pub fn add_condition(&mut self, condition: Condition) -> Result<usize, WaterfallError> {
        if !condition.threshold.is_finite() {
            return Err(WaterfallError::InvalidThreshold(condition.threshold));
        }
        for &target in &condition.targets {
            self.block(target)?;
        }
        for (id, params) in &condition.updates {
            self.check_params(*id, params, &condition.updates)?;
        }
        self.conditions.push(condition);
        Ok(self.conditions.len() - 1)
    }

    /// A condition whose updates only change local rates.
    ///
    /// Each updated block keeps the children it has *now*, so call this after
    /// the tree is wired.
    pub fn condition_with_rates(
        &self,
        kind: CondKind,
        threshold: f64,
        targets: Vec<BlockId>,
        rates: &[(BlockId, f64)],
    ) -> Result<Condition, WaterfallError> {
        let updates = rates
            .iter()
            .map(|&(id, rate)| Ok((id, self.block(id)?.params().with_local_rate(rate))))
            .collect::<Result<Vec<_>, WaterfallError>>()?;
        Ok(Condition::new(kind, threshold, targets, updates))
    }

    pub fn build(self) -> Waterfall {
        Waterfall::new(self.blocks, self.conditions, self.config)
    }

    fn block(&self, id: BlockId) -> Result<&Block, WaterfallError> {
        self.blocks
            .get(id.index())
            .ok_or_else(|| WaterfallError::UnknownBlock(id.to_string()))
    }

    fn block_mut(&mut self, id: BlockId) -> Result<&mut Block, WaterfallError> {
        self.blocks
            .get_mut(id.index())
            .ok_or_else(|| WaterfallError::UnknownBlock(id.to_string()))
    }

    /// Check `params` as the parameters of `owner`, alongside every snapshot
    /// already installed or registered and the `pending` updates of the
    /// condition being added.
    ///
    /// A block has at most one parent across all of those snapshots, so each
    /// block is reached by a single path whichever updates have fired.
    fn check_params(
        &self,
        owner: BlockId,
        params: &BlockParams,
        pending: &[(BlockId, Arc<BlockParams>)],
    ) -> Result<(), WaterfallError> {
        let name = &self.block(owner)?.name;
        check_rate(name, params.local_rate)?;
        for (i, &(child, share)) in params.children.iter().enumerate() {
            self.block(child)?;
            if !share.is_finite() || share < 0.0 {
                return Err(WaterfallError::InvalidShare { parent: owner, child, value: share });
            }
            if params.children[..i].iter().any(|&(c, _)| c == child) {
                return Err(WaterfallError::SharedChild { child, first: owner, second: owner });
            }
            if let Some(other) = self.other_parent(owner, child, pending) {
                return Err(WaterfallError::SharedChild { child, first: other, second: owner });
            }
        }
        Ok(())
    }

    /// A block other than `owner` listing `child` in any known snapshot.
    fn other_parent(
        &self,
        owner: BlockId,
        child: BlockId,
        pending: &[(BlockId, Arc<BlockParams>)],
    ) -> Option<BlockId> {
        let installed = self.blocks.iter().map(|b| (b.id, b.params()));
        let registered = self
            .conditions
            .iter()
            .flat_map(|c| c.updates.iter())
            .chain(pending)
            .map(|(id, p)| (*id, &**p));

        installed
            .chain(registered)
            .find(|(id, p)| *id != owner && p.children.iter().any(|&(c, _)| c == child))
            .map(|(id, _)| id)
    }
}

fn check_rate(name: &str, value: f64) -> Result<(), WaterfallError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(WaterfallError::InvalidRate { block: name.to_string(), value });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
