// Benchmark Report Types
// Structured output for canned scenarios and the random-tree Monte Carlo

use serde::Serialize;

// ─── Statistics (per-metric Monte Carlo aggregation) ────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub mean: f64,
    pub std_dev: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub min: f64,
    pub max: f64,
    pub n: usize,
}

impl Stats {
    pub fn from_samples(samples: &[f64]) -> Self {
        let n = samples.len();
        if n == 0 {
            return Self { mean: 0.0, std_dev: 0.0, ci_lower: 0.0, ci_upper: 0.0, min: 0.0, max: 0.0, n: 0 };
        }
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = if n > 1 {
            samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };
        let std_dev = variance.sqrt();
        let stderr = std_dev / (n as f64).sqrt();
        let z = 1.96; // 95% CI
        Self {
            mean,
            std_dev,
            ci_lower: mean - z * stderr,
            ci_upper: mean + z * stderr,
            min: samples.iter().cloned().fold(f64::INFINITY, f64::min),
            max: samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            n,
        }
    }
}

// ─── Canned Scenario Result ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub scenario: String,
    pub label: String,
    pub category: String,
    pub pass: bool,
    pub steps: u32,
    pub fired: usize,
    pub leakage: f64,
    /// Statement income not covered by rounded revenue lines.
    pub unallocated: f64,
    pub max_revenue_error: f64,
    pub conservation_violations: u32,
    /// Why the scenario failed, empty on pass.
    pub failures: Vec<String>,
    pub elapsed_us: u128,
}

// ─── Random Tree Run ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct RandomRunResult {
    pub seed: u64,
    pub blocks: usize,
    pub conditions: usize,
    pub income: f64,
    pub steps: u32,
    pub fired: usize,
    pub normalized_conservation_error: f64,
    pub monotone: bool,
    pub rates_match_flow: bool,
    pub pass: bool,
}

// ─── Monte Carlo Report ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct MonteCarloReport {
    pub n_runs: usize,
    pub base_seed: u64,
    pub pass_rate: f64,
    pub blocks: Stats,
    pub steps: Stats,
    pub fired: Stats,
    pub normalized_conservation_error: Stats,
    pub failed_runs: Vec<RandomRunResult>,
}

// ─── Top-Level Report ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct BenchReport {
    pub timestamp: String,
    pub version: &'static str,
    pub prng: &'static str,
    pub summary: Summary,
    pub scenarios: Vec<ScenarioResult>,
    pub monte_carlo: Option<MonteCarloReport>,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f64,
}
