// Monte Carlo Infrastructure - random waterfalls checked against engine invariants
// Run i uses seed base_seed + i, so any failing tree can be replayed alone

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use waterfall_engine::*;

use crate::report::*;

const MAX_BLOCKS: usize = 12;
const MAX_CONDITIONS: usize = 4;
const NORMALIZED_TOLERANCE: f64 = 1e-9;

/// A random tree rooted at block 0, a handful of rate-only conditions and an
/// income to run through it.
fn random_waterfall(rng: &mut ChaCha8Rng) -> Result<(Waterfall, BlockId, f64), WaterfallError> {
    let n = rng.gen_range(2..=MAX_BLOCKS);
    let mut b = WaterfallBuilder::new();
    let mut ids = Vec::with_capacity(n);
    for i in 0..n {
        ids.push(b.add_block(&format!("n{i}"), rng.gen_range(0.0..=1.0))?);
    }

    let mut children: Vec<Vec<(BlockId, f64)>> = vec![Vec::new(); n];
    for (i, &id) in ids.iter().enumerate().skip(1) {
        let parent = rng.gen_range(0..i);
        children[parent].push((id, rng.gen_range(0.05..1.0)));
    }
    // Most trees split exactly; some keep raw shares and leak.
    let normalise = rng.gen_bool(0.7);
    for (parent, mut kids) in children.into_iter().enumerate() {
        if kids.is_empty() {
            continue;
        }
        let total: f64 = kids.iter().map(|(_, share)| share).sum();
        let scale = if normalise { total } else { total.max(1.0) };
        for (_, share) in kids.iter_mut() {
            *share /= scale;
        }
        b.set_children(ids[parent], kids)?;
    }

    let income = rng.gen_range(100.0..10_000.0);
    for _ in 0..rng.gen_range(0..=MAX_CONDITIONS) {
        let kind = if rng.gen_bool(0.5) { CondKind::Revenue } else { CondKind::Turnover };
        let target = ids[rng.gen_range(0..n)];
        let updated = ids[rng.gen_range(0..n)];
        let threshold = rng.gen_range(0.0..income * 0.5);
        let rate = rng.gen_range(0.0..=1.0);
        let cond = b.condition_with_rates(kind, threshold, vec![target], &[(updated, rate)])?;
        b.add_condition(cond)?;
    }

    Ok((b.build(), ids[0], income))
}

/// Flow `income` once on a copy and compare each block's revenue gain with
/// its global revenue rate.
fn rates_match_flow(waterfall: &Waterfall, root: BlockId, income: f64) -> Result<bool, WaterfallError> {
    let mut probe = waterfall.clone();
    probe.compute_rates(root)?;
    let before: Vec<f64> = probe.blocks().iter().map(|b| b.revenue).collect();
    probe.flow(root, income)?;
    Ok(probe.blocks().iter().zip(before).all(|(b, prev)| {
        ((b.revenue - prev) - income * b.global_revenue_rate).abs() <= NORMALIZED_TOLERANCE * income
    }))
}

/// Run one random waterfall with a specific seed.
pub fn run_single(seed: u64) -> Result<RandomRunResult, WaterfallError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let (mut waterfall, root, income) = random_waterfall(&mut rng)?;
    let rates_ok = rates_match_flow(&waterfall, root, income)?;

    let mut previous: Vec<BlockSnapshot> = waterfall.snapshot();
    let mut monotone = true;
    let mut observer = |report: &StepReport| {
        for (now, before) in report.blocks.iter().zip(&previous) {
            if now.revenue < before.revenue || now.turnover < before.turnover {
                monotone = false;
            }
        }
        previous = report.blocks.clone();
    };
    let summary = waterfall.run_income(root, income, &mut observer)?;

    let normalized = (summary.income - (summary.retained + summary.leakage)).abs() / summary.income;
    let pass = monotone
        && rates_ok
        && normalized < NORMALIZED_TOLERANCE
        && waterfall.conservation().is_clean()
        && summary.fired.len() <= waterfall.conditions().len();

    Ok(RandomRunResult {
        seed,
        blocks: waterfall.blocks().len(),
        conditions: waterfall.conditions().len(),
        income,
        steps: summary.steps,
        fired: summary.fired.len(),
        normalized_conservation_error: normalized,
        monotone,
        rates_match_flow: rates_ok,
        pass,
    })
}

/// Run `runs` random waterfalls and aggregate.
pub fn run_monte_carlo(runs: usize, base_seed: u64) -> MonteCarloReport {
    let mut results = Vec::with_capacity(runs);
    let mut errored = 0usize;
    for i in 0..runs as u64 {
        let seed = base_seed.wrapping_add(i);
        match run_single(seed) {
            Ok(result) => results.push(result),
            Err(e) => {
                tracing::error!(seed, "random waterfall failed: {e}");
                errored += 1;
            }
        }
    }

    if errored > 0 {
        tracing::warn!(errored, "some random waterfalls could not be run");
    }

    // Errored runs count as failures.
    let passed = results.iter().filter(|r| r.pass).count();
    let collect = |f: fn(&RandomRunResult) -> f64| results.iter().map(f).collect::<Vec<_>>();

    MonteCarloReport {
        n_runs: runs,
        base_seed,
        pass_rate: if runs > 0 { passed as f64 / runs as f64 } else { 1.0 },
        blocks: Stats::from_samples(&collect(|r| r.blocks as f64)),
        steps: Stats::from_samples(&collect(|r| r.steps as f64)),
        fired: Stats::from_samples(&collect(|r| r.fired as f64)),
        normalized_conservation_error: Stats::from_samples(&collect(|r| {
            r.normalized_conservation_error
        })),
        failed_runs: results.iter().filter(|r| !r.pass).cloned().collect(),
    }
}
