use indexmap::IndexMap;

use crate::error::Result;
use crate::model::{ExecutionContext, MeasurementAxis, MeasurementVector, MethodIdentity, MethodInfo};

/// Summed measurement of every call-tree edge sharing one caller (or callee)
/// of a method.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateCall {
    pub identity: MethodIdentity,
    pub measurement: MeasurementVector,
}

impl AggregateCall {
    pub fn total_time(&self, axis: MeasurementAxis) -> f64 {
        self.measurement.total_time(axis)
    }

    pub fn self_time(&self, axis: MeasurementAxis) -> f64 {
        self.measurement.self_time(axis)
    }

    pub fn wait_time(&self, axis: MeasurementAxis) -> f64 {
        self.measurement.wait_time(axis)
    }

    pub fn called(&self) -> u64 {
        self.measurement.called()
    }
}

fn collect(groups: IndexMap<MethodIdentity, MeasurementVector>) -> Vec<AggregateCall> {
    groups
        .into_iter()
        .map(|(identity, measurement)| AggregateCall {
            identity,
            measurement,
        })
        .collect()
}

/// Group a method's call sites by immediate caller, in first-seen order.
/// The measurement of each group is that of the method's call sites under
/// that caller; a root call site has no caller and is skipped.
pub fn aggregate_callers(
    context: &ExecutionContext,
    method: &MethodInfo,
) -> Result<Vec<AggregateCall>> {
    let mut groups: IndexMap<MethodIdentity, MeasurementVector> = IndexMap::new();
    for &site in method.call_sites() {
        let node = context.node(site)?;
        let Some(parent) = node.parent() else {
            continue;
        };
        let caller = context.node(parent)?;
        *groups.entry(caller.target().clone()).or_default() += node.measurement();
    }
    Ok(collect(groups))
}

/// Group the children of all of a method's call sites by target, in
/// first-seen order.
pub fn aggregate_callees(
    context: &ExecutionContext,
    method: &MethodInfo,
) -> Result<Vec<AggregateCall>> {
    let mut groups: IndexMap<MethodIdentity, MeasurementVector> = IndexMap::new();
    for &site in method.call_sites() {
        for &child in context.node(site)?.children() {
            let callee = context.node(child)?;
            *groups.entry(callee.target().clone()).or_default() += callee.measurement();
        }
    }
    Ok(collect(groups))
}

impl MethodInfo {
    /// See [`aggregate_callers`]. Recomputed on every call, so the result
    /// always reflects the current tree.
    pub fn aggregate_callers(&self, context: &ExecutionContext) -> Result<Vec<AggregateCall>> {
        aggregate_callers(context, self)
    }

    pub fn aggregate_callees(&self, context: &ExecutionContext) -> Result<Vec<AggregateCall>> {
        aggregate_callees(context, self)
    }
}
