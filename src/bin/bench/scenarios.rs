// Scenario Definitions - canned waterfalls with known final balances
// Each scenario builds its own tree; pass criteria are exact expected revenues

use waterfall_engine::*;

// ─── Scenario Configuration ─────────────────────────────────────────────────

pub struct Scenario {
    pub name: &'static str,
    pub label: &'static str,
    pub category: &'static str,
    pub income: f64,
    pub build: fn() -> Result<(Waterfall, BlockId), WaterfallError>,
    pub criteria: PassCriteria,
}

pub struct PassCriteria {
    /// Final revenue per block name.
    pub expected_revenue: Vec<(&'static str, f64)>,
    pub expected_fired: Option<usize>,
    pub expected_leakage: Option<f64>,
    pub tolerance: f64,
}

impl Default for PassCriteria {
    fn default() -> Self {
        Self {
            expected_revenue: Vec::new(),
            expected_fired: None,
            expected_leakage: None,
            tolerance: 1e-6,
        }
    }
}

// ─── Builders ───────────────────────────────────────────────────────────────

fn single_block() -> Result<(Waterfall, BlockId), WaterfallError> {
    let mut b = WaterfallBuilder::new();
    let root = b.add_block("root", 1.0)?;
    Ok((b.build(), root))
}

fn parent_child() -> Result<(Waterfall, BlockId), WaterfallError> {
    let mut b = WaterfallBuilder::new();
    let root = b.add_block("root", 0.5)?;
    let child = b.add_block("child", 1.0)?;
    b.set_children(root, vec![(child, 1.0)])?;
    Ok((b.build(), root))
}

fn recoup_step_up() -> Result<(Waterfall, BlockId), WaterfallError> {
    let mut b = WaterfallBuilder::new();
    let root = b.add_block("root", 0.2)?;
    let cond = b
        .condition_with_rates(CondKind::Revenue, 10.0, vec![root], &[(root, 0.5)])?
        .with_label("root recouped 10");
    b.add_condition(cond)?;
    Ok((b.build(), root))
}

/// Three-level chain where the head already holds 50 of revenue. Conditions
/// watch the head and the tail together.
fn chain_with_opening_balance() -> Result<(Waterfall, BlockId), WaterfallError> {
    let mut b = WaterfallBuilder::new();
    let b1 = b.add_block("b1", 0.0)?;
    let b2 = b.add_block("b2", 0.2)?;
    let b3 = b.add_block("b3", 0.2)?;
    b.set_children(b1, vec![(b2, 1.0)])?;
    b.set_children(b2, vec![(b3, 1.0)])?;
    b.seed(b1, 50.0, 0.0)?;

    let tail_off = b
        .condition_with_rates(CondKind::Revenue, 100.0, vec![b1, b3], &[(b3, 0.0)])?
        .with_label("b1+b3 reach 100: b3 stops retaining");
    let head_on = b
        .condition_with_rates(CondKind::Revenue, 60.0, vec![b1, b3], &[(b1, 0.1)])?
        .with_label("b1+b3 reach 60: b1 retains 10%");
    b.add_condition(tail_off)?;
    b.add_condition(head_on)?;
    Ok((b.build(), b1))
}

fn leaky_split() -> Result<(Waterfall, BlockId), WaterfallError> {
    let mut b = WaterfallBuilder::new();
    let root = b.add_block("root", 0.0)?;
    let half = b.add_block("half", 1.0)?;
    b.set_children(root, vec![(half, 0.5)])?;
    Ok((b.build(), root))
}

/// Even split until `a` has seen 100 of turnover, then 20/80.
fn turnover_corridor() -> Result<(Waterfall, BlockId), WaterfallError> {
    let mut b = WaterfallBuilder::new();
    let root = b.add_block("root", 0.5)?;
    let a = b.add_block("a", 1.0)?;
    let c = b.add_block("b", 1.0)?;
    b.set_children(root, vec![(a, 0.5), (c, 0.5)])?;
    let cond = Condition::new(
        CondKind::Turnover,
        100.0,
        vec![a],
        vec![(root, BlockParams::with_children(0.5, vec![(a, 0.2), (c, 0.8)]))],
    )
    .with_label("corridor: a turned over 100");
    b.add_condition(cond)?;
    Ok((b.build(), root))
}

fn unreachable_condition() -> Result<(Waterfall, BlockId), WaterfallError> {
    let mut b = WaterfallBuilder::new();
    let root = b.add_block("root", 1.0)?;
    let orphan = b.add_block("orphan", 1.0)?;
    let cond = b.condition_with_rates(CondKind::Revenue, 10.0, vec![orphan], &[(root, 0.0)])?;
    b.add_condition(cond)?;
    Ok((b.build(), root))
}

const RECOUP_JSON: &str = r#"{
    "root": "distributor",
    "income": 2000,
    "blocks": [
        { "name": "distributor", "local_rate": 0.3,
          "children": [{ "block": "producer", "share": 0.6 }, { "block": "artist", "share": 0.4 }] },
        { "name": "producer", "local_rate": 1.0 },
        { "name": "artist", "local_rate": 1.0 }
    ],
    "conditions": [{
        "kind": "revenue",
        "threshold": 300,
        "targets": ["distributor"],
        "updates": [{ "block": "distributor", "local_rate": 0.1 }],
        "label": "distributor fee capped"
    }]
}"#;

fn from_json() -> Result<(Waterfall, BlockId), WaterfallError> {
    ScenarioSpec::from_json(RECOUP_JSON)?.build()
}

// ─── Registry ───────────────────────────────────────────────────────────────

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "SINGLE_BLOCK",
            label: "Single block keeps everything",
            category: "basic",
            income: 100.0,
            build: single_block,
            criteria: PassCriteria {
                expected_revenue: vec![("root", 100.0)],
                expected_fired: Some(0),
                expected_leakage: Some(0.0),
                ..PassCriteria::default()
            },
        },
        Scenario {
            name: "PARENT_CHILD",
            label: "Half retained, half passed down",
            category: "basic",
            income: 100.0,
            build: parent_child,
            criteria: PassCriteria {
                expected_revenue: vec![("root", 50.0), ("child", 50.0)],
                expected_fired: Some(0),
                ..PassCriteria::default()
            },
        },
        Scenario {
            name: "RECOUP_STEP_UP",
            label: "Rate steps up after recoup",
            category: "conditions",
            income: 1000.0,
            build: recoup_step_up,
            criteria: PassCriteria {
                expected_revenue: vec![("root", 485.0)],
                expected_fired: Some(1),
                ..PassCriteria::default()
            },
        },
        Scenario {
            name: "CHAIN_OPENING_BALANCE",
            label: "Chained conditions over a seeded head",
            category: "conditions",
            income: 1000.0,
            build: chain_with_opening_balance,
            criteria: PassCriteria {
                expected_revenue: vec![
                    ("b1", 143.75),
                    ("b2", 181.25),
                    ("b3", 33.606_557_377_049_18),
                ],
                expected_fired: Some(2),
                ..PassCriteria::default()
            },
        },
        Scenario {
            name: "LEAKY_SPLIT",
            label: "Shares below one leak",
            category: "leakage",
            income: 100.0,
            build: leaky_split,
            criteria: PassCriteria {
                expected_revenue: vec![("root", 0.0), ("half", 50.0)],
                expected_leakage: Some(50.0),
                ..PassCriteria::default()
            },
        },
        Scenario {
            name: "TURNOVER_CORRIDOR",
            label: "Split changes on child turnover",
            category: "conditions",
            income: 1000.0,
            build: turnover_corridor,
            criteria: PassCriteria {
                expected_revenue: vec![("root", 500.0), ("a", 160.0), ("b", 340.0)],
                expected_fired: Some(1),
                expected_leakage: Some(0.0),
                ..PassCriteria::default()
            },
        },
        Scenario {
            name: "UNREACHABLE_CONDITION",
            label: "Condition on a detached block never fires",
            category: "conditions",
            income: 100.0,
            build: unreachable_condition,
            criteria: PassCriteria {
                expected_revenue: vec![("root", 100.0), ("orphan", 0.0)],
                expected_fired: Some(0),
                ..PassCriteria::default()
            },
        },
        Scenario {
            name: "JSON_FEE_CAP",
            label: "Scenario loaded from JSON",
            category: "scenario",
            income: 2000.0,
            build: from_json,
            criteria: PassCriteria {
                // 1000 at 30%, then 1000 at 10%
                expected_revenue: vec![
                    ("distributor", 400.0),
                    ("producer", 960.0),
                    ("artist", 640.0),
                ],
                expected_fired: Some(1),
                expected_leakage: Some(0.0),
                ..PassCriteria::default()
            },
        },
    ]
}
