#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use waterfall_engine::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn revenue(w: &Waterfall, name: &str) -> f64 {
        w.block_by_name(name).expect("test: block exists").revenue
    }

    fn turnover(w: &Waterfall, name: &str) -> f64 {
        w.block_by_name(name).expect("test: block exists").turnover
    }

    // ========== Basic Flows ==========

    #[test]
    fn test_single_block_keeps_everything() {
        let mut b = WaterfallBuilder::new();
        let root = b.add_block("root", 1.0).expect("test: root");
        let mut w = b.build();

        let summary = w.run_income(root, 100.0, &mut NoopObserver).expect("test: run");
        assert_eq!(summary.steps, 1);
        assert!(approx(revenue(&w, "root"), 100.0));
        assert!(approx(turnover(&w, "root"), 100.0));
    }

    #[test]
    fn test_parent_passes_remainder_to_child() {
        let mut b = WaterfallBuilder::new();
        let root = b.add_block("root", 0.5).expect("test: root");
        let child = b.add_block("child", 1.0).expect("test: child");
        b.set_children(root, vec![(child, 1.0)]).expect("test: wire");
        let mut w = b.build();

        w.run_income(root, 100.0, &mut NoopObserver).expect("test: run");
        assert!(approx(revenue(&w, "root"), 50.0));
        assert!(approx(turnover(&w, "root"), 100.0));
        assert!(approx(revenue(&w, "child"), 50.0));
        assert!(approx(turnover(&w, "child"), 50.0));
    }

    #[test]
    fn test_shares_below_one_leak() {
        let mut b = WaterfallBuilder::new();
        let root = b.add_block("root", 0.0).expect("test: root");
        let a = b.add_block("a", 1.0).expect("test: a");
        let c = b.add_block("c", 1.0).expect("test: c");
        b.set_children(root, vec![(a, 0.3), (c, 0.3)]).expect("test: wire");
        let mut w = b.build();

        let summary = w.run_income(root, 100.0, &mut NoopObserver).expect("test: run");
        assert!(approx(summary.retained, 60.0));
        assert!(approx(summary.leakage, 40.0));
        assert!(w.conservation().is_clean(), "Leakage must not count as a violation");
    }

    // ========== Conditions ==========

    #[test]
    fn test_rate_step_up_after_recoup() {
        let mut b = WaterfallBuilder::new();
        let root = b.add_block("root", 0.2).expect("test: root");
        let cond = b
            .condition_with_rates(CondKind::Revenue, 10.0, vec![root], &[(root, 0.5)])
            .expect("test: condition");
        b.add_condition(cond).expect("test: add");
        let mut w = b.build();

        let mut recorder = StepRecorder::default();
        let summary = w.run_income(root, 1000.0, &mut recorder).expect("test: run");

        assert_eq!(summary.fired, vec![0]);
        assert!(approx(recorder.steps[0].amount, 50.0));
        assert!(approx(recorder.steps[0].remaining, 950.0));
        assert_eq!(recorder.steps[0].fired, Some(0));
        assert!(approx(recorder.steps[1].amount, 950.0));
        assert_eq!(recorder.steps[1].fired, None);
        assert!(approx(revenue(&w, "root"), 485.0));
    }

    #[test]
    fn test_chained_conditions_over_opening_balance() {
        let mut b = WaterfallBuilder::new();
        let b1 = b.add_block("b1", 0.0).expect("test: b1");
        let b2 = b.add_block("b2", 0.2).expect("test: b2");
        let b3 = b.add_block("b3", 0.2).expect("test: b3");
        b.set_children(b1, vec![(b2, 1.0)]).expect("test: wire b1");
        b.set_children(b2, vec![(b3, 1.0)]).expect("test: wire b2");
        b.seed(b1, 50.0, 0.0).expect("test: seed");

        let tail_off = b
            .condition_with_rates(CondKind::Revenue, 100.0, vec![b1, b3], &[(b3, 0.0)])
            .expect("test: tail");
        let head_on = b
            .condition_with_rates(CondKind::Revenue, 60.0, vec![b1, b3], &[(b1, 0.1)])
            .expect("test: head");
        b.add_condition(tail_off).expect("test: add tail");
        b.add_condition(head_on).expect("test: add head");
        let mut w = b.build();

        let summary = w.run_income(b1, 1000.0, &mut NoopObserver).expect("test: run");

        // 60 is nearer than 100, so the second condition fires first
        assert_eq!(summary.fired, vec![1, 0]);
        assert_eq!(summary.steps, 3);
        assert!(approx(revenue(&w, "b1"), 143.75));
        assert!(approx(revenue(&w, "b2"), 181.25));
        assert!(approx(revenue(&w, "b3"), 33.606_557_377_049_18));
        assert!(approx(summary.retained + summary.leakage, 1000.0));
    }

    #[test]
    fn test_turnover_condition_rewires_split() {
        let mut b = WaterfallBuilder::new();
        let root = b.add_block("root", 0.5).expect("test: root");
        let a = b.add_block("a", 1.0).expect("test: a");
        let c = b.add_block("c", 1.0).expect("test: c");
        b.set_children(root, vec![(a, 0.5), (c, 0.5)]).expect("test: wire");
        let cond = Condition::new(
            CondKind::Turnover,
            100.0,
            vec![a],
            vec![(root, BlockParams::with_children(0.5, vec![(a, 0.2), (c, 0.8)]))],
        );
        b.add_condition(cond).expect("test: add");
        let mut w = b.build();

        let summary = w.run_income(root, 1000.0, &mut NoopObserver).expect("test: run");
        assert_eq!(summary.fired, vec![0]);
        assert!(approx(revenue(&w, "root"), 500.0));
        assert!(approx(revenue(&w, "a"), 160.0));
        assert!(approx(revenue(&w, "c"), 340.0));
    }

    #[test]
    fn test_already_passed_threshold_never_fires() {
        let mut b = WaterfallBuilder::new();
        let root = b.add_block("root", 0.5).expect("test: root");
        b.seed(root, 50.0, 0.0).expect("test: seed");
        let cond = b
            .condition_with_rates(CondKind::Revenue, 10.0, vec![root], &[(root, 1.0)])
            .expect("test: condition");
        b.add_condition(cond).expect("test: add");
        let mut w = b.build();

        w.compute_rates(root).expect("test: rates");
        assert!(w.conditions()[0].income_needed(w.blocks()) < 0.0);
        assert_eq!(w.find_first_condition(), None);

        let summary = w.run_income(root, 100.0, &mut NoopObserver).expect("test: run");
        assert!(summary.fired.is_empty());
        assert!(!w.conditions()[0].is_satisfied());
        assert!(approx(revenue(&w, "root"), 100.0));
    }

    #[test]
    fn test_condition_on_unreached_block_is_unreachable() {
        let mut b = WaterfallBuilder::new();
        let root = b.add_block("root", 1.0).expect("test: root");
        let orphan = b.add_block("orphan", 1.0).expect("test: orphan");
        let cond = b
            .condition_with_rates(CondKind::Revenue, 10.0, vec![orphan], &[(root, 0.0)])
            .expect("test: condition");
        b.add_condition(cond).expect("test: add");
        let mut w = b.build();

        w.compute_rates(root).expect("test: rates");
        assert_eq!(w.conditions()[0].income_needed(w.blocks()), UNREACHABLE);

        let summary = w.run_income(root, 100.0, &mut NoopObserver).expect("test: run");
        assert!(summary.fired.is_empty());
        assert!(approx(revenue(&w, "root"), 100.0));
    }

    #[test]
    fn test_equal_needs_fire_in_insertion_order() {
        let mut b = WaterfallBuilder::new();
        let root = b.add_block("root", 0.5).expect("test: root");
        let first = b
            .condition_with_rates(CondKind::Revenue, 10.0, vec![root], &[(root, 0.4)])
            .expect("test: first");
        let second = b
            .condition_with_rates(CondKind::Revenue, 10.0, vec![root], &[(root, 0.3)])
            .expect("test: second");
        b.add_condition(first).expect("test: add first");
        b.add_condition(second).expect("test: add second");
        let mut w = b.build();

        w.compute_rates(root).expect("test: rates");
        assert_eq!(w.find_first_condition(), Some((0, 20.0)));
    }

    // ========== Structural Errors ==========

    #[test]
    fn test_block_with_two_parents_is_rejected() {
        // r splits between x and l, and x also feeds l
        let spec = ScenarioSpec::from_json(
            r#"{
                "root": "r",
                "income": 100,
                "blocks": [
                    { "name": "r", "local_rate": 0.0,
                      "children": [{ "block": "x", "share": 0.5 }, { "block": "l", "share": 0.5 }] },
                    { "name": "x", "local_rate": 0.0, "children": [{ "block": "l" }] },
                    { "name": "l", "local_rate": 1.0 }
                ],
                "config": { "strict_conservation": true }
            }"#,
        )
        .expect("test: parse");

        assert!(matches!(spec.build(), Err(WaterfallError::SharedChild { .. })));
    }

    #[test]
    fn test_strict_run_on_a_tree_predicts_leakage_exactly() {
        let mut b = WaterfallBuilder::new();
        let r = b.add_block("r", 0.0).expect("test: r");
        let x = b.add_block("x", 0.0).expect("test: x");
        let l = b.add_block("l", 1.0).expect("test: l");
        let m = b.add_block("m", 1.0).expect("test: m");
        b.set_children(r, vec![(x, 0.5), (l, 0.5)]).expect("test: wire r");
        b.set_children(x, vec![(m, 0.6)]).expect("test: wire x");
        let mut w = b.with_config(SimulationConfig::strict()).build();

        let summary = w.run_income(r, 100.0, &mut NoopObserver).expect("test: run");
        assert!(approx(summary.leakage, 20.0));
        assert!(approx(revenue(&w, "l"), 50.0));
        assert!(approx(revenue(&w, "m"), 30.0));
        assert!(w.conservation().is_clean());
    }

    #[test]
    fn test_cycle_fails_with_depth_error() {
        let mut b = WaterfallBuilder::new();
        let x = b.add_block("x", 0.0).expect("test: x");
        let y = b.add_block("y", 0.0).expect("test: y");
        b.set_children(x, vec![(y, 1.0)]).expect("test: x -> y");
        b.set_children(y, vec![(x, 1.0)]).expect("test: y -> x");
        let mut w = b.build();

        assert!(matches!(
            w.run_income(x, 10.0, &mut NoopObserver),
            Err(WaterfallError::DepthExceeded { .. })
        ));
    }

    #[test]
    fn test_multiple_runs_accumulate() {
        let mut b = WaterfallBuilder::new();
        let root = b.add_block("root", 0.2).expect("test: root");
        let cond = b
            .condition_with_rates(CondKind::Revenue, 10.0, vec![root], &[(root, 0.5)])
            .expect("test: condition");
        b.add_condition(cond).expect("test: add");
        let mut w = b.build();

        w.run_income(root, 500.0, &mut NoopObserver).expect("test: first run");
        let summary = w.run_income(root, 500.0, &mut NoopObserver).expect("test: second run");
        assert!(summary.fired.is_empty(), "A satisfied condition never fires again");
        assert!(approx(revenue(&w, "root"), 485.0));
        assert!(approx(w.income_injected(), 1000.0));
    }

    // ========== Scenarios & Statements ==========

    const FEE_CAP: &str = r#"{
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
            "updates": [{ "block": "distributor", "local_rate": 0.1 }]
        }],
        "config": { "strict_conservation": true }
    }"#;

    #[test]
    fn test_json_scenario_runs() {
        let spec = ScenarioSpec::from_json(FEE_CAP).expect("test: parse");
        assert!(spec.config.strict_conservation);
        assert_eq!(spec.config.max_depth, 256);

        let (w, summary) = spec.run().expect("test: run");
        assert_eq!(summary.fired, vec![0]);
        assert!(approx(revenue(&w, "distributor"), 400.0));
        assert!(approx(revenue(&w, "producer"), 960.0));
        assert!(approx(revenue(&w, "artist"), 640.0));
    }

    #[test]
    fn test_native_simulation_handle() {
        let spec = ScenarioSpec::from_json(FEE_CAP).expect("test: parse");
        let sim = WaterfallSimulation::from_spec(spec).expect("test: build");
        assert_eq!(sim.root(), BlockId(0));
        assert_eq!(sim.waterfall().blocks().len(), 3);
        assert_eq!(sim.waterfall().conditions().len(), 1);
        assert_eq!(sim.get_fired(), Vec::<u32>::new());
    }

    #[test]
    fn test_payout_statement_rounds_to_cents() {
        let mut b = WaterfallBuilder::new();
        let root = b.add_block("root", 1.0 / 3.0).expect("test: root");
        let child = b.add_block("child", 1.0).expect("test: child");
        b.set_children(root, vec![(child, 1.0)]).expect("test: wire");
        let mut w = b.build();
        w.run_income(root, 100.0, &mut NoopObserver).expect("test: run");

        let statement = PayoutStatement::from_waterfall(&w, 2).expect("test: statement");
        assert_eq!(statement.line("root").expect("test: root line").revenue, dec!(33.33));
        assert_eq!(statement.line("child").expect("test: child line").revenue, dec!(66.67));
        assert_eq!(statement.income, dec!(100.00));
        assert_eq!(statement.unallocated, dec!(0.00));
    }
}
