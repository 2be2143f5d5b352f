//! Property-based tests over random, possibly unbalanced event streams.

use std::collections::BTreeSet;

use proftree_core::{
    AggregateCall, ContextId, ExecutionContext, MeasurementAxis, MethodIdentity, MethodPattern, ProfileConfig,
    ProfileResult, Profiler, Reading, ThreadId,
};
use proptest::prelude::*;

const NAMES: [&str; 4] = ["a", "b", "c", "d"];
const AXES: [MeasurementAxis; 2] = [MeasurementAxis::WallTime, MeasurementAxis::CpuTime];

/// `(enter, method, time step)`; a leave with only the root active becomes
/// an enter so the root is never closed early.
type Op = (bool, usize, u32);

fn ops() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec((any::<bool>(), 0..NAMES.len(), 1u32..20), 0..80)
}

fn reading(t: f64, cpu: f64) -> Reading {
    Reading::wall(t).with(MeasurementAxis::CpuTime, cpu)
}

fn record(p: &mut Profiler, context: u64, thread: u64, ops: &[Op]) {
    let ctx = ContextId(context);
    p.begin_context(ctx, ThreadId(thread)).unwrap();
    let (mut t, mut cpu) = (0.0, 0.0);
    p.record_enter(ctx, &MethodIdentity::global("main"), reading(t, cpu))
        .unwrap();
    let mut depth = 1;
    for &(enter, name, step) in ops {
        t += f64::from(step) / 4.0;
        cpu += f64::from(step) / 8.0;
        if enter || depth == 1 {
            let method = MethodIdentity::instance("App", NAMES[name]);
            p.record_enter(ctx, &method, reading(t, cpu)).unwrap();
            depth += 1;
        } else {
            p.record_leave(ctx, reading(t, cpu)).unwrap();
            depth -= 1;
        }
    }
}

fn profile(streams: &[(u64, u64, &[Op])]) -> ProfileResult {
    let mut p = Profiler::new(&ProfileConfig::new(AXES)).unwrap();
    for &(context, thread, ops) in streams {
        record(&mut p, context, thread, ops);
    }
    p.finalize_all().unwrap();
    p.into_result().unwrap()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-6 * a.abs().max(b.abs()).max(1.0)
}

/// Order-insensitive edge set: `(other end, called)` per aggregated group.
fn edges(groups: &[AggregateCall]) -> BTreeSet<(String, u64)> {
    groups
        .iter()
        .map(|g| (g.identity.full_name().to_string(), g.called()))
        .collect()
}

fn minimal_flags(ctx: &ExecutionContext) -> Vec<bool> {
    ctx.tree()
        .preorder()
        .into_iter()
        .map(|id| ctx.node(id).unwrap().is_minimal())
        .collect()
}

fn assert_partitioned(ctx: &ExecutionContext) {
    for axis in AXES {
        let self_sum: f64 = ctx.methods().map(|m| m.self_time(axis)).sum();
        assert!(
            close(self_sum, ctx.total_time(axis)),
            "{axis}: self {self_sum} vs total {}",
            ctx.total_time(axis)
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_time_is_conserved_and_partitioned(ops in ops()) {
        let result = profile(&[(1, 1, ops.as_slice())]);
        let ctx = result.context(ContextId(1)).unwrap();
        prop_assert!(ctx.check_conservation(&AXES).is_ok());
        assert_partitioned(ctx);

        for method in ctx.methods() {
            for axis in AXES {
                prop_assert!(method.wait_time(axis) <= method.self_time(axis) + 1e-9);
                prop_assert!(method.self_time(axis) <= method.total_time(axis) + 1e-9);
            }
        }
    }

    #[test]
    fn prop_minimality_is_idempotent(ops in ops()) {
        let result = profile(&[(1, 1, ops.as_slice())]);
        let mut ctx = result.context(ContextId(1)).unwrap().clone();
        let first = minimal_flags(&ctx);
        ctx.analyze_minimality();
        let second = minimal_flags(&ctx);
        ctx.analyze_minimality();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(&second, &minimal_flags(&ctx));

        for id in ctx.tree().preorder() {
            let node = ctx.node(id).unwrap();
            if node.target().is_variant() {
                prop_assert!(!node.is_minimal());
            }
        }
    }

    #[test]
    fn prop_snapshot_round_trips(ops in ops(), more in ops()) {
        let result = profile(&[(1, 1, ops.as_slice()), (2, 7, more.as_slice())]);
        let back = ProfileResult::from_json(&result.to_json().unwrap()).unwrap();
        prop_assert_eq!(&back, &result);

        for (a, b) in result.contexts().unwrap().iter().zip(back.contexts().unwrap()) {
            prop_assert_eq!(a.methods().len(), b.methods().len());
            for (ma, mb) in a.methods().zip(b.methods()) {
                prop_assert_eq!(ma.identity(), mb.identity());
                prop_assert_eq!(ma.called(), mb.called());
                prop_assert!(close(ma.total_time(MeasurementAxis::WallTime), mb.total_time(MeasurementAxis::WallTime)));
                prop_assert_eq!(
                    edges(&ma.aggregate_callers(a).unwrap()),
                    edges(&mb.aggregate_callers(b).unwrap())
                );
                prop_assert_eq!(
                    edges(&ma.aggregate_callees(a).unwrap()),
                    edges(&mb.aggregate_callees(b).unwrap())
                );
            }
        }
    }

    #[test]
    fn prop_elimination_keeps_root_totals(ops in ops(), victim in 0..NAMES.len()) {
        let mut result = profile(&[(1, 1, ops.as_slice())]);
        let before: Vec<f64> = AXES
            .iter()
            .map(|&axis| result.context(ContextId(1)).unwrap().total_time(axis))
            .collect();

        let pattern = MethodPattern::regex(&format!(r"^App#{}(-\d+)?$", NAMES[victim])).unwrap();
        result.eliminate(&pattern).unwrap();

        let ctx = result.context(ContextId(1)).unwrap();
        for (axis, total) in AXES.iter().zip(before) {
            prop_assert!(close(ctx.total_time(*axis), total));
        }
        prop_assert!(ctx.check_conservation(&AXES).is_ok());
        assert_partitioned(ctx);
        prop_assert!(ctx.methods().all(|m| !pattern.matches(m.identity())));
        for id in ctx.tree().preorder() {
            prop_assert!(!pattern.matches(ctx.node(id).unwrap().target()));
        }
    }

    #[test]
    fn prop_merge_adds_up(ops in ops(), more in ops()) {
        let mut result = profile(&[(4, 1, ops.as_slice()), (2, 1, more.as_slice())]);
        let before: f64 = result
            .contexts()
            .unwrap()
            .iter()
            .map(|c| c.total_time(MeasurementAxis::WallTime))
            .sum();

        result.merge_by_thread().unwrap();
        let contexts = result.contexts().unwrap();
        prop_assert_eq!(contexts.len(), 1);
        let ctx = &contexts[0];
        prop_assert_eq!(ctx.id(), ContextId(2));
        prop_assert!(close(ctx.total_time(MeasurementAxis::WallTime), before));
        prop_assert!(ctx.check_conservation(&AXES).is_ok());
        assert_partitioned(ctx);
    }
}
