// Waterfall Benchmark Runner v0.1.0
// Canned scenarios with known balances, then a seeded random-tree Monte Carlo
//
// Usage:
//   cargo run --release --bin bench                     # All scenarios + 200 random trees
//   cargo run --release --bin bench -- --runs 20        # Quick mode
//   cargo run --release --bin bench -- CHAIN            # Filter by name
//   cargo run --release --bin bench -- --time-series    # Enable JSONL output
//   cargo run --release --bin bench -- --seed 42        # Custom base seed
//
// Log level follows RUST_LOG (default: warn).

mod report;
mod scenarios;
mod monte_carlo;
mod time_series;

use report::*;
use scenarios::*;
use std::path::Path;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use time_series::TimeSeriesRecorder;
use tracing_subscriber::EnvFilter;
use waterfall_engine::adapter::from_decimal;
use waterfall_engine::{FlowObserver, NoopObserver, PayoutStatement};

// ─── CLI Parsing ────────────────────────────────────────────────────────────

struct CliArgs {
    runs: usize,
    seed: u64,
    time_series: bool,
    filter: Option<String>,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut cli = CliArgs {
        runs: 200,
        seed: 0,
        time_series: false,
        filter: None,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--runs" => {
                i += 1;
                if i < args.len() {
                    cli.runs = args[i].parse().unwrap_or(200);
                }
            }
            "--seed" => {
                i += 1;
                if i < args.len() {
                    cli.seed = args[i].parse().unwrap_or(0);
                }
            }
            "--time-series" => {
                cli.time_series = true;
            }
            arg if !arg.starts_with('-') => {
                cli.filter = Some(arg.to_string());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
            }
        }
        i += 1;
    }

    cli
}

// ─── Scenario Evaluation ────────────────────────────────────────────────────

fn evaluate(scenario: &Scenario, ts_dir: Option<&Path>) -> ScenarioResult {
    let start = Instant::now();
    let mut failures = Vec::new();
    let mut recorder = ts_dir.map(|_| TimeSeriesRecorder::new(scenario.name));

    let mut noop = NoopObserver;
    let outcome = (scenario.build)().and_then(|(mut waterfall, root)| {
        let observer: &mut dyn FlowObserver = match recorder.as_mut() {
            Some(r) => r,
            None => &mut noop,
        };
        let summary = waterfall.run_income(root, scenario.income, observer)?;
        Ok((waterfall, summary))
    });

    let mut result = ScenarioResult {
        scenario: scenario.name.to_string(),
        label: scenario.label.to_string(),
        category: scenario.category.to_string(),
        pass: false,
        steps: 0,
        fired: 0,
        leakage: 0.0,
        unallocated: 0.0,
        max_revenue_error: 0.0,
        conservation_violations: 0,
        failures: Vec::new(),
        elapsed_us: 0,
    };

    match outcome {
        Ok((waterfall, summary)) => {
            let criteria = &scenario.criteria;
            for &(name, expected) in &criteria.expected_revenue {
                match waterfall.block_by_name(name) {
                    Some(block) => {
                        let err = (block.revenue - expected).abs();
                        result.max_revenue_error = result.max_revenue_error.max(err);
                        if err > criteria.tolerance {
                            failures.push(format!("{name}: revenue {} != {expected}", block.revenue));
                        }
                    }
                    None => failures.push(format!("{name}: no such block")),
                }
            }
            if let Some(expected) = criteria.expected_fired {
                if summary.fired.len() != expected {
                    failures.push(format!("fired {} != {expected}", summary.fired.len()));
                }
            }
            if let Some(expected) = criteria.expected_leakage {
                if (summary.leakage - expected).abs() > criteria.tolerance {
                    failures.push(format!("leakage {} != {expected}", summary.leakage));
                }
            }
            if !waterfall.conservation().is_clean() {
                failures.push("conservation violated".to_string());
            }

            match PayoutStatement::from_waterfall(&waterfall, waterfall.config().minor_units) {
                Ok(statement) => result.unallocated = from_decimal(statement.unallocated),
                Err(e) => failures.push(e.to_string()),
            }

            result.steps = summary.steps;
            result.fired = summary.fired.len();
            result.leakage = summary.leakage;
            result.conservation_violations = waterfall.conservation().violations;
        }
        Err(e) => failures.push(e.to_string()),
    }

    if let (Some(recorder), Some(dir)) = (&recorder, ts_dir) {
        let path = dir.join(format!("{}.jsonl", scenario.name));
        match recorder.write_jsonl(&path) {
            Ok(()) => tracing::debug!(steps = recorder.len(), path = %path.display(), "time series written"),
            Err(e) => eprintln!("  Failed to write {}: {e}", path.display()),
        }
    }

    result.pass = failures.is_empty();
    result.failures = failures;
    result.elapsed_us = start.elapsed().as_micros();
    result
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args();
    let all_scenarios = scenarios();

    let to_run: Vec<&Scenario> = match &cli.filter {
        Some(f) => {
            let f_lower = f.to_lowercase();
            all_scenarios.iter()
                .filter(|s| s.name.to_lowercase().contains(&f_lower)
                          || s.label.to_lowercase().contains(&f_lower)
                          || s.category.to_lowercase().contains(&f_lower))
                .collect()
        }
        None => all_scenarios.iter().collect(),
    };

    if to_run.is_empty() {
        eprintln!("No scenarios match filter: {:?}", cli.filter);
        std::process::exit(1);
    }

    let ts_dir = if cli.time_series {
        Some(Path::new("benchmark-results/time-series").to_path_buf())
    } else {
        None
    };

    println!("\n  Waterfall Benchmark Runner v0.1.0");
    println!("  PRNG: ChaCha8Rng | Random trees: {} | Base seed: {}", cli.runs, cli.seed);
    println!("  Running {} scenario(s)...\n", to_run.len());
    println!("  {:<44} {:>5} {:>5} {:>10} {:>10} {:>8}",
        "Scenario", "Steps", "Fired", "Leakage", "MaxErr", "Time");
    println!("  {}", "-".repeat(92));

    let suite_start = Instant::now();
    let mut results = Vec::new();

    for scenario in &to_run {
        let result = evaluate(scenario, ts_dir.as_deref());
        println!("  {:<44} {:>5} {:>5} {:>10.4} {:>10.2e} {:>6}us  {}",
            result.label,
            result.steps,
            result.fired,
            result.leakage,
            result.max_revenue_error,
            result.elapsed_us,
            if result.pass { "PASS" } else { "FAIL" },
        );
        for failure in &result.failures {
            println!("      - {failure}");
        }
        results.push(result);
    }

    // ─── Random Trees ───────────────────────────────────────────────────

    let monte_carlo = if cli.runs > 0 {
        let mc = monte_carlo::run_monte_carlo(cli.runs, cli.seed);
        println!("  {}", "-".repeat(92));
        println!("  Random trees: {} runs, pass {:.1}%, blocks {:.1}, steps {:.1}, max norm conservation {:.2e}",
            mc.n_runs,
            mc.pass_rate * 100.0,
            mc.blocks.mean,
            mc.steps.mean,
            mc.normalized_conservation_error.max,
        );
        for run in &mc.failed_runs {
            println!("      - seed {} failed (monotone: {}, rates match flow: {})",
                run.seed, run.monotone, run.rates_match_flow);
        }
        Some(mc)
    } else {
        None
    };

    let suite_elapsed = suite_start.elapsed();

    // ─── Summary ────────────────────────────────────────────────────────

    let total = results.len();
    let passed = results.iter().filter(|r| r.pass).count();
    let failed = total - passed;
    let mc_failed = monte_carlo.as_ref().map(|m| m.pass_rate < 1.0).unwrap_or(false);

    println!("  {}", "-".repeat(92));
    println!("  Total: {}  Passed: {}  Failed: {}  Suite time: {:.1}s\n",
        total, passed, failed, suite_elapsed.as_secs_f64());

    // ─── Write JSON Report ──────────────────────────────────────────────

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let timestamp = format!("{}", ts);

    let report = BenchReport {
        timestamp: timestamp.clone(),
        version: env!("CARGO_PKG_VERSION"),
        prng: "ChaCha8Rng",
        summary: Summary {
            total,
            passed,
            failed,
            pass_rate: passed as f64 / total as f64,
        },
        scenarios: results,
        monte_carlo,
    };

    if let Err(e) = write_report(&report, &timestamp) {
        eprintln!("  Failed to write report: {e}");
        std::process::exit(2);
    }

    if failed > 0 || mc_failed {
        std::process::exit(1);
    }
}

fn write_report(report: &BenchReport, timestamp: &str) -> std::io::Result<()> {
    let dir = Path::new("benchmark-results");
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("bench-{}.json", timestamp));
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    std::fs::write(&path, json)?;
    println!("  Results saved to: {}\n", path.display());
    Ok(())
}
