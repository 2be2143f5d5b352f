use indexmap::IndexMap;
use serde::Serialize;

use crate::error::Result;
use crate::model::{ExecutionContext, MeasurementAxis, MethodIdentity, MethodInfo, ProfileResult};

/// A method's figures summed over every context of a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub name: String,
    #[serde(skip)]
    pub identity: MethodIdentity,
    pub self_time: f64,
    pub total_time: f64,
    pub wait_time: f64,
    pub called: u64,
}

/// Sort field for ranked method listings. Times and counts sort largest
/// first, names alphabetically; `ascending` flips the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankedSort {
    SelfTime,
    TotalTime,
    Name,
    Count,
}

impl ExecutionContext {
    /// The methods of this context ordered by `sort` on `axis`.
    pub fn ranked_methods(
        &self,
        axis: MeasurementAxis,
        sort: RankedSort,
        ascending: bool,
    ) -> Vec<&MethodInfo> {
        let mut methods: Vec<&MethodInfo> = self.methods().collect();
        match sort {
            RankedSort::SelfTime => {
                methods.sort_by(|a, b| b.self_time(axis).total_cmp(&a.self_time(axis)));
            }
            RankedSort::TotalTime => {
                methods.sort_by(|a, b| b.total_time(axis).total_cmp(&a.total_time(axis)));
            }
            RankedSort::Name => methods.sort_by(|a, b| a.full_name().cmp(b.full_name())),
            RankedSort::Count => methods.sort_by(|a, b| b.called().cmp(&a.called())),
        }
        if ascending {
            methods.reverse();
        }
        methods
    }
}

impl ProfileResult {
    /// Aggregate methods by identity across all contexts and rank them.
    pub fn ranked(
        &self,
        axis: MeasurementAxis,
        sort: RankedSort,
        ascending: bool,
    ) -> Result<Vec<RankedEntry>> {
        let mut by_identity: IndexMap<&MethodIdentity, RankedEntry> = IndexMap::new();
        for context in self.contexts()? {
            for method in context.methods() {
                let entry = by_identity
                    .entry(method.identity())
                    .or_insert_with(|| RankedEntry {
                        name: method.full_name().to_string(),
                        identity: method.identity().clone(),
                        self_time: 0.0,
                        total_time: 0.0,
                        wait_time: 0.0,
                        called: 0,
                    });
                entry.self_time += method.self_time(axis);
                entry.total_time += method.total_time(axis);
                entry.wait_time += method.wait_time(axis);
                entry.called += method.called();
            }
        }

        let mut entries: Vec<RankedEntry> = by_identity.into_values().collect();
        match sort {
            RankedSort::SelfTime => entries.sort_by(|a, b| b.self_time.total_cmp(&a.self_time)),
            RankedSort::TotalTime => entries.sort_by(|a, b| b.total_time.total_cmp(&a.total_time)),
            RankedSort::Name => entries.sort_by(|a, b| a.name.cmp(&b.name)),
            RankedSort::Count => entries.sort_by(|a, b| b.called.cmp(&a.called)),
        }
        if ascending {
            entries.reverse();
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Profiler;
    use crate::config::ProfileConfig;
    use crate::model::{ContextId, Reading, ThreadId};

    const WALL: MeasurementAxis = MeasurementAxis::WallTime;

    fn m(name: &str) -> MethodIdentity {
        MethodIdentity::global(name)
    }

    /// Two contexts: main(10) -> foo(3), bar(5), foo(1) and main(4) -> foo(2).
    fn result() -> ProfileResult {
        let mut p = Profiler::new(&ProfileConfig::default()).unwrap();
        let (one, two) = (ContextId(1), ContextId(2));
        p.begin_context(one, ThreadId(1)).unwrap();
        p.begin_context(two, ThreadId(2)).unwrap();

        p.record_enter(one, &m("main"), Reading::wall(0.0)).unwrap();
        p.record_enter(one, &m("foo"), Reading::wall(0.0)).unwrap();
        p.record_leave(one, Reading::wall(3.0)).unwrap();
        p.record_enter(one, &m("bar"), Reading::wall(3.0)).unwrap();
        p.record_leave(one, Reading::wall(8.0)).unwrap();
        p.record_enter(one, &m("foo"), Reading::wall(8.0)).unwrap();
        p.record_leave(one, Reading::wall(9.0)).unwrap();
        p.record_leave(one, Reading::wall(10.0)).unwrap();

        p.record_enter(two, &m("main"), Reading::wall(0.0)).unwrap();
        p.record_enter(two, &m("foo"), Reading::wall(1.0)).unwrap();
        p.record_leave(two, Reading::wall(3.0)).unwrap();
        p.record_leave(two, Reading::wall(4.0)).unwrap();

        p.finalize_all().unwrap();
        p.into_result().unwrap()
    }

    #[test]
    fn ranks_context_methods_by_self_time() {
        let result = result();
        let ctx = result.context(ContextId(1)).unwrap();
        let names: Vec<_> = ctx
            .ranked_methods(WALL, RankedSort::SelfTime, false)
            .iter()
            .map(|m| m.full_name())
            .collect();
        assert_eq!(names, vec!["bar", "foo", "main"]);
    }

    #[test]
    fn aggregates_across_contexts() {
        let entries = result().ranked(WALL, RankedSort::TotalTime, false).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["main", "foo", "bar"]);

        let foo = &entries[1];
        assert!((foo.total_time - 6.0).abs() < 1e-9);
        assert_eq!(foo.called, 3);
    }

    #[test]
    fn name_sort_ascending_reverses() {
        let entries = result().ranked(WALL, RankedSort::Name, true).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["main", "foo", "bar"]);

        let by_count = result().ranked(WALL, RankedSort::Count, false).unwrap();
        assert_eq!(by_count[0].name, "foo");
    }
}
