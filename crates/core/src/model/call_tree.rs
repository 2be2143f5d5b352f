use crate::error::StaleReferenceError;
use crate::model::{MeasurementAxis, MeasurementVector, MethodIdentity, NodeId, arena::Arena};

/// One distinct call path to a method within one execution context.
///
/// Repeated calls along the same path share a node; `called` counts them.
#[derive(Debug, Clone)]
pub struct CallTreeNode {
    pub(crate) target: MethodIdentity,
    pub(crate) parent: Option<NodeId>,
    /// First-seen order.
    pub(crate) children: Vec<NodeId>,
    pub(crate) measurement: MeasurementVector,
    pub(crate) minimal: bool,
}

impl CallTreeNode {
    pub(crate) fn new(target: MethodIdentity, parent: Option<NodeId>) -> Self {
        Self {
            target,
            parent,
            children: Vec::new(),
            measurement: MeasurementVector::new(),
            minimal: true,
        }
    }

    pub fn target(&self) -> &MethodIdentity {
        &self.target
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn measurement(&self) -> &MeasurementVector {
        &self.measurement
    }

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

    /// No ancestor on this node's path calls the same method (at any
    /// recursion depth).
    pub fn is_minimal(&self) -> bool {
        self.minimal
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// A node whose total differs from self plus children beyond tolerance.
#[derive(Debug, Clone, PartialEq)]
pub struct ConservationFault {
    pub node: NodeId,
    pub axis: MeasurementAxis,
    pub total: f64,
    pub self_time: f64,
    pub children: f64,
}

const RELATIVE_TOLERANCE: f64 = 1e-9;

/// Arena-backed call tree with a single root.
#[derive(Debug, Clone, Default)]
pub struct CallTree {
    pub(crate) nodes: Arena<CallTreeNode>,
    pub(crate) root: Option<NodeId>,
}

impl CallTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Result<&CallTreeNode, StaleReferenceError> {
        self.nodes.get(id).ok_or(StaleReferenceError::Node(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut CallTreeNode, StaleReferenceError> {
        self.nodes.get_mut(id).ok_or(StaleReferenceError::Node(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 0
    }

    pub fn child_with_target(&self, parent: NodeId, target: &MethodIdentity) -> Option<NodeId> {
        let parent = self.nodes.get(parent)?;
        parent.children.iter().copied().find(|&child| {
            self.nodes
                .get(child)
                .is_some_and(|node| node.target == *target)
        })
    }

    pub(crate) fn add_root(&mut self, target: MethodIdentity) -> NodeId {
        let id = self.nodes.insert(CallTreeNode::new(target, None));
        self.root = Some(id);
        id
    }

    pub(crate) fn add_child(
        &mut self,
        parent: NodeId,
        target: MethodIdentity,
    ) -> Result<NodeId, StaleReferenceError> {
        if !self.nodes.contains(parent) {
            return Err(StaleReferenceError::Node(parent));
        }
        let id = self.nodes.insert(CallTreeNode::new(target, Some(parent)));
        self.node_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Depth of a node; the root has depth 0.
    pub fn depth(&self, id: NodeId) -> Result<usize, StaleReferenceError> {
        let mut depth = 0;
        let mut current = self.node(id)?.parent;
        while let Some(pid) = current {
            depth += 1;
            current = self.node(pid)?.parent;
        }
        Ok(depth)
    }

    /// All live nodes reachable from the root, parents before children,
    /// siblings in first-seen order.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.len());
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            order.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        order
    }

    /// Fold `from` (and its subtree) into `into`, both in this tree.
    ///
    /// Measurements are summed, children with matching targets merged
    /// recursively and the rest re-parented under `into`. `from` must already
    /// be detached from its parent's child list.
    pub(crate) fn absorb(&mut self, into: NodeId, from: NodeId) -> Result<(), StaleReferenceError> {
        let mut work = vec![(into, from)];
        while let Some((into, from)) = work.pop() {
            let from_node = self.nodes.remove(from).ok_or(StaleReferenceError::Node(from))?;
            self.node_mut(into)?.measurement += &from_node.measurement;
            for child in from_node.children {
                let target = self.node(child)?.target.clone();
                match self.child_with_target(into, &target) {
                    Some(existing) => work.push((existing, child)),
                    None => {
                        self.node_mut(child)?.parent = Some(into);
                        self.node_mut(into)?.children.push(child);
                    }
                }
            }
        }
        Ok(())
    }

    /// Deep-copy a subtree of `other` under `parent` (or as this tree's root).
    pub(crate) fn import(
        &mut self,
        parent: Option<NodeId>,
        other: &CallTree,
        from: NodeId,
    ) -> Result<NodeId, StaleReferenceError> {
        let mut top = None;
        let mut stack = vec![(parent, from)];
        while let Some((parent, from)) = stack.pop() {
            let source = other.node(from)?;
            let mut copy = CallTreeNode::new(source.target.clone(), parent);
            copy.measurement = source.measurement;
            let id = self.nodes.insert(copy);
            match parent {
                Some(pid) => self.node_mut(pid)?.children.push(id),
                None => self.root = Some(id),
            }
            top.get_or_insert(id);
            stack.extend(source.children.iter().rev().map(|&child| (Some(id), child)));
        }
        top.ok_or(StaleReferenceError::Node(from))
    }

    /// Merge a subtree of `other` into `into`: measurements summed, matching
    /// children merged, unmatched children copied and appended.
    pub(crate) fn graft(
        &mut self,
        into: NodeId,
        other: &CallTree,
        from: NodeId,
    ) -> Result<(), StaleReferenceError> {
        let mut work = vec![(into, from)];
        while let Some((into, from)) = work.pop() {
            let source = other.node(from)?;
            self.node_mut(into)?.measurement += &source.measurement;
            for &child in &source.children {
                let target = &other.node(child)?.target;
                match self.child_with_target(into, target) {
                    Some(existing) => work.push((existing, child)),
                    None => {
                        self.import(Some(into), other, child)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// First node violating `total == self + Σ children.total` on any of the
    /// given axes.
    pub fn conservation_fault(&self, axes: &[MeasurementAxis]) -> Option<ConservationFault> {
        for id in self.preorder() {
            let node = self.nodes.get(id)?;
            for &axis in axes {
                let total = node.total_time(axis);
                let self_time = node.self_time(axis);
                let children: f64 = node
                    .children
                    .iter()
                    .filter_map(|&c| self.nodes.get(c))
                    .map(|c| c.total_time(axis))
                    .sum();
                let scale = total.abs().max((self_time + children).abs()).max(1.0);
                if (total - (self_time + children)).abs() > RELATIVE_TOLERANCE * scale {
                    return Some(ConservationFault {
                        node: id,
                        axis,
                        total,
                        self_time,
                        children,
                    });
                }
            }
        }
        None
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AXIS_COUNT, AxisSet};

    fn timed(tree: &mut CallTree, id: NodeId, total: f64, children: f64) {
        let mut t = [0.0; AXIS_COUNT];
        let mut c = [0.0; AXIS_COUNT];
        t[0] = total;
        c[0] = children;
        tree.node_mut(id)
            .unwrap()
            .measurement
            .record_call(&AxisSet::wall_time(), &t, &c, &[0.0; AXIS_COUNT]);
    }

    fn method(name: &str) -> MethodIdentity {
        MethodIdentity::global(name)
    }

    #[test]
    fn preorder_follows_first_seen_order() {
        let mut tree = CallTree::new();
        let root = tree.add_root(method("root"));
        let a = tree.add_child(root, method("a")).unwrap();
        let b = tree.add_child(root, method("b")).unwrap();
        let a1 = tree.add_child(a, method("a1")).unwrap();
        assert_eq!(tree.preorder(), vec![root, a, a1, b]);
        assert_eq!(tree.depth(a1).unwrap(), 2);
        assert_eq!(tree.child_with_target(root, &method("b")), Some(b));
        assert_eq!(tree.child_with_target(root, &method("a1")), None);
    }

    #[test]
    fn absorb_merges_matching_children() {
        let mut tree = CallTree::new();
        let root = tree.add_root(method("root"));
        let x = tree.add_child(root, method("x")).unwrap();
        let y = tree.add_child(root, method("y")).unwrap();
        let x_leaf = tree.add_child(x, method("leaf")).unwrap();
        let y_leaf = tree.add_child(y, method("leaf")).unwrap();
        let y_other = tree.add_child(y, method("other")).unwrap();
        timed(&mut tree, x_leaf, 2.0, 0.0);
        timed(&mut tree, y_leaf, 3.0, 0.0);

        tree.node_mut(root).unwrap().children.retain(|&c| c != y);
        tree.absorb(x, y).unwrap();

        let x_node = tree.node(x).unwrap();
        assert_eq!(x_node.children(), &[x_leaf, y_other]);
        assert_eq!(tree.node(x_leaf).unwrap().total_time(MeasurementAxis::WallTime), 5.0);
        assert_eq!(tree.node(x_leaf).unwrap().called(), 2);
        assert!(!tree.contains(y));
        assert!(!tree.contains(y_leaf));
        assert_eq!(tree.node(y_other).unwrap().parent(), Some(x));
    }

    #[test]
    fn graft_copies_unmatched_and_sums_matched() {
        let mut left = CallTree::new();
        let l_root = left.add_root(method("main"));
        let l_a = left.add_child(l_root, method("a")).unwrap();
        timed(&mut left, l_a, 1.0, 0.0);
        timed(&mut left, l_root, 1.0, 1.0);

        let mut right = CallTree::new();
        let r_root = right.add_root(method("main"));
        let r_a = right.add_child(r_root, method("a")).unwrap();
        let r_b = right.add_child(r_root, method("b")).unwrap();
        let r_c = right.add_child(r_b, method("c")).unwrap();
        timed(&mut right, r_a, 2.0, 0.0);
        timed(&mut right, r_c, 4.0, 0.0);
        timed(&mut right, r_b, 4.0, 4.0);
        timed(&mut right, r_root, 6.0, 6.0);

        left.graft(l_root, &right, r_root).unwrap();
        let names: Vec<_> = left
            .preorder()
            .into_iter()
            .map(|id| left.node(id).unwrap().target().full_name().to_string())
            .collect();
        assert_eq!(names, vec!["main", "a", "b", "c"]);
        assert_eq!(left.node(l_root).unwrap().total_time(MeasurementAxis::WallTime), 7.0);
        assert_eq!(left.node(l_a).unwrap().called(), 2);
        assert!(left.conservation_fault(&[MeasurementAxis::WallTime]).is_none());
    }

    #[test]
    fn detects_conservation_fault() {
        let mut tree = CallTree::new();
        let root = tree.add_root(method("root"));
        let child = tree.add_child(root, method("child")).unwrap();
        timed(&mut tree, child, 5.0, 0.0);
        timed(&mut tree, root, 3.0, 0.0);
        let fault = tree
            .conservation_fault(&[MeasurementAxis::WallTime])
            .expect("fault");
        assert_eq!(fault.node, root);
        assert_eq!(fault.children, 5.0);
    }
}
