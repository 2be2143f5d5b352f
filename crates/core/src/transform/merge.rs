use indexmap::IndexMap;
use tracing::info;

use crate::error::{IntegrityError, Result};
use crate::model::{ExecutionContext, MethodIdentity, ProfileResult, ThreadId};

impl ProfileResult {
    /// Combine all contexts that share a thread id into one.
    ///
    /// The context with the lowest id represents the group and takes the
    /// group's first position; the others' trees are merged into its tree
    /// path by path. Every context of a multi-member group must satisfy
    /// time conservation and all must share one root method, otherwise
    /// nothing is changed.
    pub fn merge_by_thread(&mut self) -> Result<()> {
        self.ensure_live()?;

        let mut groups: IndexMap<ThreadId, Vec<usize>> = IndexMap::new();
        for (i, context) in self.contexts.iter().enumerate() {
            groups.entry(context.thread_id).or_default().push(i);
        }
        if groups.values().all(|group| group.len() == 1) {
            return Ok(());
        }

        let axes = self.axes.as_slice();
        for group in groups.values().filter(|group| group.len() > 1) {
            for &i in group {
                self.contexts[i].check_conservation(axes)?;
            }
            check_roots(&self.contexts, group)?;
        }

        let mut merged = Vec::with_capacity(groups.len());
        for (thread, group) in &groups {
            let mut members: Vec<&ExecutionContext> =
                group.iter().map(|&i| &self.contexts[i]).collect();
            members.sort_by_key(|c| c.id);
            let Some((first, rest)) = members.split_first() else {
                continue;
            };

            let mut target = (*first).clone();
            if !rest.is_empty() {
                merge_into(&mut target, rest)?;
                info!(
                    thread = %thread,
                    context = %target.id,
                    merged = rest.len(),
                    "merged contexts"
                );
            }
            merged.push(target);
        }

        self.contexts = merged;
        Ok(())
    }
}

fn check_roots(contexts: &[ExecutionContext], group: &[usize]) -> Result<(), IntegrityError> {
    let mut rooted = group
        .iter()
        .map(|&i| &contexts[i])
        .filter_map(|c| c.root().map(|root| (c, root.target())));
    let Some((left, left_root)) = rooted.next() else {
        return Ok(());
    };
    for (right, right_root) in rooted {
        if right_root != left_root {
            return Err(IntegrityError::RootMismatch {
                left: left.id,
                right: right.id,
                left_root: left_root.full_name().to_string(),
                right_root: right_root.full_name().to_string(),
            });
        }
    }
    Ok(())
}

fn merge_into(target: &mut ExecutionContext, others: &[&ExecutionContext]) -> Result<()> {
    let mut order: Vec<MethodIdentity> = target.methods.keys().cloned().collect();
    for other in others {
        order.extend(other.methods.keys().cloned());
        let Some(from) = other.tree.root() else {
            continue;
        };
        match target.tree.root() {
            Some(into) => target.tree.graft(into, &other.tree, from)?,
            None => {
                target.tree.import(None, &other.tree, from)?;
            }
        }
    }
    target.reindex_methods(order);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Profiler;
    use crate::config::ProfileConfig;
    use crate::error::ProfileError;
    use crate::model::{ContextId, MeasurementAxis, Reading};

    const WALL: MeasurementAxis = MeasurementAxis::WallTime;

    fn m(name: &str) -> MethodIdentity {
        MethodIdentity::global(name)
    }

    /// `root -> child` with the given root total and child total.
    fn simple(p: &mut Profiler, id: u64, thread: u64, root: &str, total: f64, child: f64) {
        let ctx = ContextId(id);
        p.begin_context(ctx, ThreadId(thread)).unwrap();
        p.record_enter(ctx, &m(root), Reading::wall(0.0)).unwrap();
        p.record_enter(ctx, &m("child"), Reading::wall(0.0)).unwrap();
        p.record_leave(ctx, Reading::wall(child)).unwrap();
        p.record_leave(ctx, Reading::wall(total)).unwrap();
    }

    fn result(build: impl FnOnce(&mut Profiler)) -> ProfileResult {
        let mut p = Profiler::new(&ProfileConfig::default()).unwrap();
        build(&mut p);
        p.finalize_all().unwrap();
        p.into_result().unwrap()
    }

    #[test]
    fn sums_matching_paths() {
        let mut result = result(|p| {
            simple(p, 7, 1, "main", 3.0, 2.0);
            simple(p, 2, 9, "main", 1.0, 0.5);
            simple(p, 4, 1, "main", 5.0, 3.0);
        });
        result.merge_by_thread().unwrap();

        let ids: Vec<_> = result.contexts().unwrap().iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec![ContextId(4), ContextId(2)]);

        let ctx = result.context(ContextId(4)).unwrap();
        let root = ctx.root().unwrap();
        assert!((root.total_time(WALL) - 8.0).abs() < 1e-9);
        assert!((root.self_time(WALL) - 3.0).abs() < 1e-9);
        assert_eq!(root.called(), 2);
        assert_eq!(root.children().len(), 1);

        let child = ctx.method_named("child").unwrap();
        assert!((child.total_time(WALL) - 5.0).abs() < 1e-9);
        assert_eq!(child.called(), 2);
        ctx.check_conservation(&[WALL]).unwrap();
    }

    #[test]
    fn merged_away_contexts_are_gone() {
        let mut result = result(|p| {
            simple(p, 1, 1, "main", 2.0, 1.0);
            simple(p, 2, 1, "main", 2.0, 1.0);
        });
        let handle = result.root_handles().unwrap()[1];
        result.merge_by_thread().unwrap();
        assert!(matches!(
            result.resolve(handle),
            Err(ProfileError::StaleReference(_))
        ));
        assert!(matches!(
            result.context(ContextId(2)),
            Err(ProfileError::State(_))
        ));
    }

    #[test]
    fn differing_roots_abort_the_merge() {
        let mut result = result(|p| {
            simple(p, 1, 1, "main", 2.0, 1.0);
            simple(p, 2, 1, "worker", 2.0, 1.0);
        });
        let err = result.merge_by_thread().unwrap_err();
        assert!(matches!(
            err,
            ProfileError::Integrity(IntegrityError::RootMismatch { .. })
        ));
        assert_eq!(result.contexts().unwrap().len(), 2);
    }

    #[test]
    fn distinct_threads_are_untouched() {
        let mut result = result(|p| {
            simple(p, 1, 1, "main", 2.0, 1.0);
            simple(p, 2, 2, "worker", 2.0, 1.0);
        });
        result.merge_by_thread().unwrap();
        assert_eq!(result.contexts().unwrap().len(), 2);
    }
}
