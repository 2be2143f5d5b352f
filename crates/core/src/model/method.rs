use crate::model::{MeasurementAxis, MeasurementVector, MethodIdentity, NodeId};

/// Everything one execution context knows about one method identity.
///
/// Call sites are non-owning ids into the context's call tree. The cached
/// totals are recomputed whenever the tree changes shape.
#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub(crate) identity: MethodIdentity,
    pub(crate) call_sites: Vec<NodeId>,
    pub(crate) totals: MeasurementVector,
    pub(crate) recursive: bool,
    pub(crate) root: bool,
}

impl MethodInfo {
    pub(crate) fn new(identity: MethodIdentity) -> Self {
        Self {
            identity,
            call_sites: Vec::new(),
            totals: MeasurementVector::new(),
            recursive: false,
            root: false,
        }
    }

    pub fn identity(&self) -> &MethodIdentity {
        &self.identity
    }

    pub fn full_name(&self) -> &str {
        self.identity.full_name()
    }

    pub fn call_sites(&self) -> &[NodeId] {
        &self.call_sites
    }

    pub fn measurement(&self) -> &MeasurementVector {
        &self.totals
    }

    /// Sum of call-site totals, skipping call sites nested inside another
    /// call site of this exact identity.
    pub fn total_time(&self, axis: MeasurementAxis) -> f64 {
        self.totals.total_time(axis)
    }

    pub fn self_time(&self, axis: MeasurementAxis) -> f64 {
        self.totals.self_time(axis)
    }

    pub fn wait_time(&self, axis: MeasurementAxis) -> f64 {
        self.totals.wait_time(axis)
    }

    pub fn children_time(&self, axis: MeasurementAxis) -> f64 {
        self.totals.children_time(axis)
    }

    pub fn called(&self) -> u64 {
        self.totals.called()
    }

    /// Called somewhere below another call of the same method. A variant
    /// whose base calls were all eliminated is no longer recursive.
    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// One of the call sites is the context root.
    pub fn is_root(&self) -> bool {
        self.root
    }
}
