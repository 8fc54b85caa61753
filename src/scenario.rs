// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Waterfall Simulation Engine - Scenario Definitions

//! Serde data model of a complete waterfall, referring to blocks by name.
//!
//! This is what the WASM surface receives from JS and what the bench runner
//! loads from JSON; [`ScenarioSpec::build`] turns it into a [`Waterfall`]
//! through the [`WaterfallBuilder`] so every reference is checked.

use serde::{Deserialize, Serialize};

use crate::builder::WaterfallBuilder;
use crate::condition::Condition;
use crate::config::SimulationConfig;
use crate::error::WaterfallError;
use crate::simulation::{NoopObserver, Waterfall};
use crate::types::{BlockId, BlockParams, CondKind, RunSummary};

fn full_share() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildSpec {
    pub block: String,
    #[serde(default = "full_share")]
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSpec {
    pub name: String,
    pub local_rate: f64,
    #[serde(default)]
    pub children: Vec<ChildSpec>,
    /// Revenue already held before the run.
    #[serde(default)]
    pub revenue: f64,
    #[serde(default)]
    pub turnover: f64,
}

/// New parameters for one block. Without `children` the block keeps the
/// children it has when the scenario is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateSpec {
    pub block: String,
    pub local_rate: f64,
    #[serde(default)]
    pub children: Option<Vec<ChildSpec>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSpec {
    pub kind: CondKind,
    pub threshold: f64,
    pub targets: Vec<String>,
    #[serde(default)]
    pub updates: Vec<UpdateSpec>,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    /// Name of the block receiving root income.
    pub root: String,
    /// Income run by [`ScenarioSpec::run`]; optional for callers that drive
    /// the waterfall themselves.
    #[serde(default)]
    pub income: f64,
    pub blocks: Vec<BlockSpec>,
    #[serde(default)]
    pub conditions: Vec<ConditionSpec>,
    #[serde(default)]
    pub config: SimulationConfig,
}

impl ScenarioSpec {
    pub fn from_json(json: &str) -> Result<Self, WaterfallError> {
        serde_json::from_str(json).map_err(|e| WaterfallError::InvalidScenario(e.to_string()))
    }

    /// Build the waterfall and resolve the root block.
    pub fn build(&self) -> Result<(Waterfall, BlockId), WaterfallError> {
        let mut builder = WaterfallBuilder::new().with_config(self.config.clone());

        for spec in &self.blocks {
            let id = builder.add_block(&spec.name, spec.local_rate)?;
            if spec.revenue != 0.0 || spec.turnover != 0.0 {
                builder.seed(id, spec.revenue, spec.turnover)?;
            }
        }
        for spec in &self.blocks {
            if spec.children.is_empty() {
                continue;
            }
            let parent = builder.id(&spec.name)?;
            let children = resolve_children(&builder, &spec.children)?;
            builder.set_children(parent, children)?;
        }
        for spec in &self.conditions {
            let condition = build_condition(&builder, spec)?;
            builder.add_condition(condition)?;
        }

        let root = builder.id(&self.root)?;
        Ok((builder.build(), root))
    }

    /// Build a fresh waterfall and run the declared income through it.
    pub fn run(&self) -> Result<(Waterfall, RunSummary), WaterfallError> {
        let (mut waterfall, root) = self.build()?;
        let summary = waterfall.run_income(root, self.income, &mut NoopObserver)?;
        Ok((waterfall, summary))
    }
}

fn resolve_children(
    builder: &WaterfallBuilder,
    children: &[ChildSpec],
) -> Result<Vec<(BlockId, f64)>, WaterfallError> {
    children
        .iter()
        .map(|c| Ok((builder.id(&c.block)?, c.share)))
        .collect()
}

fn build_condition(
    builder: &WaterfallBuilder,
    spec: &ConditionSpec,
) -> Result<Condition, WaterfallError> {
    let targets = spec
        .targets
        .iter()
        .map(|name| builder.id(name))
        .collect::<Result<Vec<_>, _>>()?;

    let mut updates = Vec::with_capacity(spec.updates.len());
    for update in &spec.updates {
        let id = builder.id(&update.block)?;
        let params = match &update.children {
            Some(children) => {
                BlockParams::with_children(update.local_rate, resolve_children(builder, children)?)
            }
            None => builder.params(id)?.with_local_rate(update.local_rate),
        };
        updates.push((id, params));
    }

    let condition = Condition::new(spec.kind, spec.threshold, targets, updates);
    Ok(match &spec.label {
        Some(label) => condition.with_label(label.clone()),
        None => condition,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const RECOUP: &str = r#"{
        "root": "label",
        "income": 1000,
        "blocks": [
            { "name": "label", "local_rate": 0.2, "children": [{ "block": "artist" }] },
            { "name": "artist", "local_rate": 1.0 }
        ],
        "conditions": [
            {
                "kind": "revenue",
                "threshold": 10,
                "targets": ["label"],
                "updates": [{ "block": "label", "local_rate": 0.5 }],
                "label": "label recouped"
            }
        ]
    }"#;

    #[test]
    fn parses_and_builds() {
        let spec = ScenarioSpec::from_json(RECOUP).expect("test: parse");
        assert_eq!(spec.config, SimulationConfig::default());

        let (w, root) = spec.build().expect("test: build");
        assert_eq!(root, BlockId(0));
        assert_eq!(w.blocks().len(), 2);
        assert_eq!(w.blocks()[0].params().children, vec![(BlockId(1), 1.0)]);

        let cond = &w.conditions()[0];
        assert_eq!(cond.describe(), "label recouped");
        // rate-only update keeps the wiring
        assert_eq!(cond.updates[0].1.children, vec![(BlockId(1), 1.0)]);
    }

    #[test]
    fn explicit_update_children_replace_wiring() {
        let mut spec = ScenarioSpec::from_json(RECOUP).expect("test: parse");
        spec.conditions[0].updates[0].children = Some(Vec::new());
        let (w, _) = spec.build().expect("test: build");
        assert!(w.conditions()[0].updates[0].1.is_leaf());
    }

    #[test]
    fn run_uses_declared_income() {
        let spec = ScenarioSpec::from_json(RECOUP).expect("test: parse");
        let (w, summary) = spec.run().expect("test: run");
        assert_eq!(summary.fired, vec![0]);
        assert!((w.blocks()[0].revenue - 485.0).abs() < 1e-9);
        assert!((w.blocks()[1].revenue - 515.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_child_rejected() {
        let mut spec = ScenarioSpec::from_json(RECOUP).expect("test: parse");
        spec.blocks[0].children[0].block = "ghost".into();
        assert!(matches!(spec.build(), Err(WaterfallError::UnknownBlock(name)) if name == "ghost"));
    }

    #[test]
    fn malformed_json_is_invalid_scenario() {
        assert!(matches!(
            ScenarioSpec::from_json("{ \"root\": 3 }"),
            Err(WaterfallError::InvalidScenario(_))
        ));
    }
}
