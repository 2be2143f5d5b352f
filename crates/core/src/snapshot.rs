//! Conversion between a [`ProfileResult`] and its transport form.

use std::collections::HashMap;

use indexmap::IndexSet;
use proftree_protocol::{
    AXIS_COUNT, AxisValues, ContextSnapshot, IdentitySnapshot, MethodSnapshot, NodeSnapshot,
    ProfileSnapshot,
};

use crate::error::{IntegrityError, Result};
use crate::model::{
    AxisSet, CallTree, ContextId, ExecutionContext, MeasurementVector, MethodIdentity, NodeId,
    ProfileResult, ThreadId,
};

fn malformed(context: u64, what: impl std::fmt::Display) -> IntegrityError {
    IntegrityError::MalformedSnapshot(format!("context {context}: {what}"))
}

impl ProfileResult {
    pub fn to_snapshot(&self) -> Result<ProfileSnapshot> {
        let contexts = self
            .contexts()?
            .iter()
            .map(|c| context_snapshot(c, &self.axes))
            .collect::<Result<Vec<_>>>()?;
        Ok(ProfileSnapshot {
            axes: self.axes.as_slice().to_vec(),
            contexts,
        })
    }

    /// Rebuild a result from its transport form. Node order inside a
    /// context must put every parent before its children.
    pub fn from_snapshot(snapshot: &ProfileSnapshot) -> Result<Self> {
        let axes = AxisSet::new(snapshot.axes.iter().copied())?;
        let contexts = snapshot
            .contexts
            .iter()
            .map(|c| context_from_snapshot(c, &axes))
            .collect::<Result<Vec<_>>>()?;
        Self::from_contexts(axes, contexts)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.to_snapshot()?)
            .map_err(|e| IntegrityError::MalformedSnapshot(e.to_string()).into())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: ProfileSnapshot = serde_json::from_str(json)
            .map_err(|e| IntegrityError::MalformedSnapshot(e.to_string()))?;
        Self::from_snapshot(&snapshot)
    }
}

/// Two results are equal when their snapshots are.
impl PartialEq for ProfileResult {
    fn eq(&self, other: &Self) -> bool {
        match (self.to_snapshot(), other.to_snapshot()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

fn context_snapshot(context: &ExecutionContext, axes: &AxisSet) -> Result<ContextSnapshot> {
    let mut methods: IndexSet<&MethodIdentity> = context.methods.keys().collect();
    let order = context.tree.preorder();
    let position: HashMap<NodeId, usize> = order.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    let mut nodes = Vec::with_capacity(order.len());
    for id in &order {
        let node = context.node(*id)?;
        let (method, _) = methods.insert_full(node.target());
        nodes.push(NodeSnapshot {
            parent: node.parent().and_then(|p| position.get(&p).copied()),
            method,
            values: axes.iter().map(|axis| *node.measurement().axis(axis)).collect(),
            called: node.called(),
        });
    }

    Ok(ContextSnapshot {
        id: context.id.0,
        thread_id: context.thread_id.0,
        methods: methods
            .into_iter()
            .map(|identity| MethodSnapshot {
                identity: IdentitySnapshot::from(identity),
            })
            .collect(),
        nodes,
    })
}

fn context_from_snapshot(snapshot: &ContextSnapshot, axes: &AxisSet) -> Result<ExecutionContext> {
    let identities: Vec<MethodIdentity> = snapshot
        .methods
        .iter()
        .map(|m| MethodIdentity::from(&m.identity))
        .collect();

    let mut tree = CallTree::new();
    let mut ids: Vec<NodeId> = Vec::with_capacity(snapshot.nodes.len());
    for (i, node) in snapshot.nodes.iter().enumerate() {
        let target = identities
            .get(node.method)
            .ok_or_else(|| malformed(snapshot.id, format!("node {i} names method {}", node.method)))?
            .clone();
        if node.values.len() != axes.len() {
            return Err(malformed(
                snapshot.id,
                format!("node {i} has {} values for {} axes", node.values.len(), axes.len()),
            )
            .into());
        }

        let id = match (i, node.parent) {
            (0, None) => tree.add_root(target),
            (_, Some(parent)) if parent < i => {
                let parent = ids[parent];
                if tree.child_with_target(parent, &target).is_some() {
                    return Err(malformed(
                        snapshot.id,
                        format!("node {i} repeats a sibling's method {target}"),
                    )
                    .into());
                }
                tree.add_child(parent, target)?
            }
            (0, Some(_)) => return Err(malformed(snapshot.id, "root has a parent").into()),
            (_, None) => return Err(malformed(snapshot.id, format!("node {i} is a second root")).into()),
            (_, Some(parent)) => {
                return Err(malformed(
                    snapshot.id,
                    format!("node {i} refers to parent {parent} that does not precede it"),
                )
                .into());
            }
        };

        let mut values = [AxisValues::default(); AXIS_COUNT];
        for (axis, v) in axes.iter().zip(&node.values) {
            values[axis.index()] = *v;
        }
        tree.node_mut(id)?.measurement = MeasurementVector::from_parts(values, node.called);
        ids.push(id);
    }

    let mut context = ExecutionContext::from_parts(
        ContextId(snapshot.id),
        ThreadId(snapshot.thread_id),
        tree,
        Default::default(),
    );
    context.reindex_methods(identities);
    Ok(context)
}
