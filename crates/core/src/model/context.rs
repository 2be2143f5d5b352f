use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::analysis::minimality;
use crate::error::{IntegrityError, Result};
use crate::model::{
    CallTree, CallTreeNode, MeasurementAxis, MeasurementVector, MethodIdentity, MethodInfo,
    NodeId,
};

/// Identifier of one stream of enter/leave events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextId(pub u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Logical thread owning one or more execution contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThreadId(pub u64);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A finished call tree for one context together with its method registry.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub(crate) id: ContextId,
    pub(crate) thread_id: ThreadId,
    pub(crate) tree: CallTree,
    /// First-observed order.
    pub(crate) methods: IndexMap<MethodIdentity, MethodInfo>,
}

impl ExecutionContext {
    pub(crate) fn from_parts(
        id: ContextId,
        thread_id: ThreadId,
        tree: CallTree,
        methods: IndexMap<MethodIdentity, MethodInfo>,
    ) -> Self {
        let mut context = Self {
            id,
            thread_id,
            tree,
            methods,
        };
        context.refresh();
        context
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    pub fn tree(&self) -> &CallTree {
        &self.tree
    }

    pub fn root_id(&self) -> Option<NodeId> {
        self.tree.root()
    }

    pub fn root(&self) -> Option<&CallTreeNode> {
        self.tree.root().and_then(|id| self.tree.node(id).ok())
    }

    pub fn node(&self, id: NodeId) -> Result<&CallTreeNode> {
        Ok(self.tree.node(id)?)
    }

    pub fn methods(&self) -> impl ExactSizeIterator<Item = &MethodInfo> + '_ {
        self.methods.values()
    }

    pub fn method(&self, identity: &MethodIdentity) -> Option<&MethodInfo> {
        self.methods.get(identity)
    }

    /// Look a method up by its canonical full name.
    pub fn method_named(&self, full_name: &str) -> Option<&MethodInfo> {
        self.methods.values().find(|m| m.full_name() == full_name)
    }

    /// Total measured on the root, i.e. everything this context recorded.
    pub fn total_time(&self, axis: MeasurementAxis) -> f64 {
        self.root().map_or(0.0, |root| root.total_time(axis))
    }

    /// Total for a method across all recursion depths, counting only call
    /// sites that are not nested inside another call of the same method.
    pub fn base_total_time(&self, identity: &MethodIdentity, axis: MeasurementAxis) -> f64 {
        self.methods
            .values()
            .filter(|m| m.identity.same_method(identity))
            .flat_map(|m| m.call_sites.iter())
            .filter_map(|&site| self.tree.node(site).ok())
            .filter(|node| node.minimal)
            .map(|node| node.total_time(axis))
            .sum()
    }

    /// Recompute the minimal flag of every node.
    pub fn analyze_minimality(&mut self) {
        minimality::mark_minimal(&mut self.tree);
    }

    /// Fail if any node's total differs from its self time plus its
    /// children's totals.
    pub fn check_conservation(&self, axes: &[MeasurementAxis]) -> Result<(), IntegrityError> {
        match self.tree.conservation_fault(axes) {
            None => Ok(()),
            Some(fault) => Err(IntegrityError::Conservation {
                context: self.id,
                method: self
                    .tree
                    .node(fault.node)
                    .map(|n| n.target.full_name().to_string())
                    .unwrap_or_default(),
                total: fault.total,
                self_time: fault.self_time,
                children: fault.children,
            }),
        }
    }

    /// Rebuild every call-site list from the tree. Methods keep the order
    /// given by `order`; identities found in the tree but not listed are
    /// appended in pre-order, and listed identities with no call site left
    /// are dropped.
    pub(crate) fn reindex_methods(&mut self, order: impl IntoIterator<Item = MethodIdentity>) {
        let mut sites: IndexMap<MethodIdentity, Vec<NodeId>> = IndexMap::new();
        for id in self.tree.preorder() {
            if let Ok(node) = self.tree.node(id) {
                sites.entry(node.target.clone()).or_default().push(id);
            }
        }

        let mut methods = IndexMap::with_capacity(sites.len());
        for identity in order {
            if let Some(call_sites) = sites.shift_remove(&identity) {
                let mut info = MethodInfo::new(identity.clone());
                info.call_sites = call_sites;
                methods.insert(identity, info);
            }
        }
        for (identity, call_sites) in sites {
            let mut info = MethodInfo::new(identity.clone());
            info.call_sites = call_sites;
            methods.insert(identity, info);
        }
        self.methods = methods;
        self.refresh();
    }

    /// Recompute minimality and the cached per-method totals.
    pub(crate) fn refresh(&mut self) {
        minimality::mark_minimal(&mut self.tree);
        let nested = minimality::nested_exact(&self.tree);

        for info in self.methods.values_mut() {
            info.call_sites.retain(|&site| self.tree.contains(site));
            let mut totals = MeasurementVector::new();
            let mut recursive = false;
            let mut root = false;
            for &site in &info.call_sites {
                let Ok(node) = self.tree.node(site) else {
                    continue;
                };
                let mut m = node.measurement;
                if nested.contains(&site) {
                    for axis in MeasurementAxis::ALL {
                        m.axis_mut(axis).total_time = 0.0;
                    }
                }
                totals += &m;
                recursive |= !node.minimal;
                root |= node.parent.is_none();
            }
            info.totals = totals;
            info.recursive = recursive;
            info.root = root;
        }
    }

    pub(crate) fn release(&mut self) {
        self.tree.clear();
        self.methods.clear();
    }
}
