// Per-Step JSONL Time Series Recorder
// Outputs one JSON line per flow step for independent analysis

use serde::Serialize;
use std::io::Write;
use waterfall_engine::{FlowObserver, StepReport};

#[derive(Debug, Serialize)]
pub struct StepSnapshot {
    pub scenario: String,
    pub step: u32,
    pub amount: f64,
    pub remaining: f64,
    pub fired: Option<String>,
    pub leaked: f64,
    pub revenue: Vec<f64>,
    pub turnover: Vec<f64>,
}

impl StepSnapshot {
    pub fn from_report(scenario: &str, report: &StepReport) -> Self {
        Self {
            scenario: scenario.to_string(),
            step: report.step,
            amount: report.amount,
            remaining: report.remaining,
            fired: report.fired_label.clone(),
            leaked: report.leaked,
            revenue: report.blocks.iter().map(|b| b.revenue).collect(),
            turnover: report.blocks.iter().map(|b| b.turnover).collect(),
        }
    }
}

/// Observer that accumulates step snapshots and writes JSONL.
pub struct TimeSeriesRecorder {
    scenario: String,
    snapshots: Vec<StepSnapshot>,
}

impl TimeSeriesRecorder {
    pub fn new(scenario: &str) -> Self {
        Self { scenario: scenario.to_string(), snapshots: Vec::new() }
    }

    /// Write all snapshots to a JSONL file
    pub fn write_jsonl(&self, path: &std::path::Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(path)?;
        for snapshot in &self.snapshots {
            let line = serde_json::to_string(snapshot)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            writeln!(file, "{}", line)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }
}

impl FlowObserver for TimeSeriesRecorder {
    fn on_step(&mut self, report: &StepReport) {
        self.snapshots.push(StepSnapshot::from_report(&self.scenario, report));
    }
}
