// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Waterfall Simulation Engine

pub mod types;
pub mod error;
pub mod config;
pub mod rates;
pub mod condition;
pub mod flow;
pub mod simulation;
pub mod builder;
pub mod scenario;
pub mod conservation;
pub mod payout;
pub mod adapter;

pub use types::*;
pub use builder::WaterfallBuilder;
pub use condition::{Condition, UNREACHABLE};
pub use config::SimulationConfig;
pub use error::WaterfallError;
pub use payout::{PayoutError, PayoutStatement};
pub use scenario::ScenarioSpec;
pub use simulation::{FlowObserver, NoopObserver, StepRecorder, Waterfall};

use serde::Serialize;
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

// ─── WASM Interface ──────────────────────────────────────────────────────────

/// JS handle on one waterfall scenario.
#[wasm_bindgen]
pub struct WaterfallSimulation {
    spec: ScenarioSpec,
    waterfall: Waterfall,
    root: BlockId,
}

#[derive(Serialize)]
struct RunResult {
    summary: RunSummary,
    steps: Vec<StepReport>,
}

fn to_js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[wasm_bindgen]
impl WaterfallSimulation {
    /// Build from a scenario object (same shape as the JSON scenario format).
    #[wasm_bindgen(constructor)]
    pub fn new(spec: JsValue) -> Result<WaterfallSimulation, JsValue> {
        #[cfg(target_arch = "wasm32")]
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));

        let spec: ScenarioSpec = serde_wasm_bindgen::from_value(spec).map_err(to_js_error)?;
        let (waterfall, root) = spec.build().map_err(to_js_error)?;

        #[cfg(target_arch = "wasm32")]
        log(&format!(
            "waterfall: {} blocks, {} conditions",
            waterfall.blocks().len(),
            waterfall.conditions().len()
        ));

        Ok(Self { spec, waterfall, root })
    }

    /// Run `income` from the root; returns the summary and every step report.
    pub fn run_income(&mut self, income: f64) -> Result<JsValue, JsValue> {
        let mut recorder = StepRecorder::default();
        let summary = self
            .waterfall
            .run_income(self.root, income, &mut recorder)
            .map_err(to_js_error)?;
        let result = RunResult { summary, steps: recorder.steps };
        Ok(serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL))
    }

    /// Run the income declared in the scenario.
    pub fn run_scenario(&mut self) -> Result<JsValue, JsValue> {
        self.run_income(self.spec.income)
    }

    pub fn get_blocks(&self) -> JsValue {
        serde_wasm_bindgen::to_value(&self.waterfall.snapshot()).unwrap_or(JsValue::NULL)
    }

    pub fn get_statement(&self) -> Result<JsValue, JsValue> {
        let statement =
            PayoutStatement::from_waterfall(&self.waterfall, self.waterfall.config().minor_units)
                .map_err(to_js_error)?;
        Ok(serde_wasm_bindgen::to_value(&statement).unwrap_or(JsValue::NULL))
    }

    /// Conditions fired so far, by index.
    pub fn get_fired(&self) -> Vec<u32> {
        self.waterfall
            .conditions()
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_satisfied())
            .map(|(i, _)| i as u32)
            .collect()
    }

    /// Reset balances, parameters and conditions to the scenario's start.
    pub fn reset(&mut self) -> Result<(), JsValue> {
        let (waterfall, root) = self.spec.build().map_err(to_js_error)?;
        self.waterfall = waterfall;
        self.root = root;
        Ok(())
    }
}

impl WaterfallSimulation {
    /// Native constructor for callers outside JS.
    pub fn from_spec(spec: ScenarioSpec) -> Result<Self, WaterfallError> {
        let (waterfall, root) = spec.build()?;
        Ok(Self { spec, waterfall, root })
    }

    pub fn waterfall(&self) -> &Waterfall {
        &self.waterfall
    }

    pub fn root(&self) -> BlockId {
        self.root
    }
}
