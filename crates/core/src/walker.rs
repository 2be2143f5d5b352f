//! Pruning depth-first traversal over call trees.
//!
//! The walker knows nothing about output formats. Report builders implement
//! [`Visitor`] and receive an enter callback before a node's children and a
//! leave callback after them.

use serde_json::{Map, Value, json};

use crate::error::Result;
use crate::model::{CallTreeNode, ExecutionContext, MeasurementAxis, NodeId, ProfileResult};

/// What a visitor sees of one node.
#[derive(Debug, Clone, Copy)]
pub struct Visit<'a> {
    pub context: &'a ExecutionContext,
    pub id: NodeId,
    pub node: &'a CallTreeNode,
    /// Roots have depth 0.
    pub depth: usize,
    /// Node total relative to the summed totals of all walked roots.
    pub percent_of_overall: f64,
    /// Node self time relative to its parent's total.
    pub percent_of_parent: f64,
    /// Whether a renderer should show the node expanded. Children are
    /// visited either way.
    pub expandable: bool,
}

pub trait Visitor {
    fn on_enter(&mut self, visit: &Visit<'_>);

    fn on_leave(&mut self, _visit: &Visit<'_>) {}
}

enum Step<'a> {
    Enter {
        id: NodeId,
        parent_total: f64,
        depth: usize,
    },
    Leave(Visit<'a>),
}

#[derive(Debug, Clone)]
pub struct GraphWalker<'a> {
    roots: Vec<(&'a ExecutionContext, NodeId)>,
    axis: MeasurementAxis,
    min_percent: f64,
    min_self_percent: f64,
}

impl<'a> GraphWalker<'a> {
    /// Walk `roots` on [`MeasurementAxis::WallTime`]. Sessions that do not
    /// measure wall time must pick an axis with [`GraphWalker::axis`] or use
    /// [`GraphWalker::for_result`], otherwise every total reads as zero and a
    /// positive `min_percent` prunes everything.
    pub fn new(
        roots: impl IntoIterator<Item = (&'a ExecutionContext, NodeId)>,
        min_percent: f64,
        min_self_percent: f64,
    ) -> Self {
        Self {
            roots: roots.into_iter().collect(),
            axis: MeasurementAxis::WallTime,
            min_percent,
            min_self_percent,
        }
    }

    /// Walk the root of every context of `result` on its primary axis.
    pub fn for_result(
        result: &'a ProfileResult,
        min_percent: f64,
        min_self_percent: f64,
    ) -> Result<Self> {
        let roots = result
            .contexts()?
            .iter()
            .filter_map(|c| c.root_id().map(|root| (c, root)));
        Ok(Self::new(roots, min_percent, min_self_percent).axis(result.axes().primary()))
    }

    pub fn axis(mut self, axis: MeasurementAxis) -> Self {
        self.axis = axis;
        self
    }

    /// Sum of the totals of all roots.
    pub fn overall_total(&self) -> Result<f64> {
        let mut sum = 0.0;
        for &(context, root) in &self.roots {
            sum += context.node(root)?.total_time(self.axis);
        }
        Ok(sum)
    }

    /// Visit every root in order. A node whose share of the overall total
    /// is below `min_percent` is skipped with its whole subtree.
    pub fn traverse<V: Visitor + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        let overall = self.overall_total()?;
        for &(context, root) in &self.roots {
            let mut stack = vec![Step::Enter {
                id: root,
                parent_total: overall,
                depth: 0,
            }];
            while let Some(step) = stack.pop() {
                match step {
                    Step::Enter {
                        id,
                        parent_total,
                        depth,
                    } => {
                        let node = context.node(id)?;
                        let total = node.total_time(self.axis);
                        let percent_of_overall = percent(total, overall);
                        if percent_of_overall < self.min_percent {
                            continue;
                        }
                        let percent_of_parent = percent(node.self_time(self.axis), parent_total);
                        let visit = Visit {
                            context,
                            id,
                            node,
                            depth,
                            percent_of_overall,
                            percent_of_parent,
                            expandable: percent_of_parent >= self.min_self_percent,
                        };
                        visitor.on_enter(&visit);
                        stack.push(Step::Leave(visit));
                        stack.extend(node.children().iter().rev().map(|&child| Step::Enter {
                            id: child,
                            parent_total: total,
                            depth: depth + 1,
                        }));
                    }
                    Step::Leave(visit) => visitor.on_leave(&visit),
                }
            }
        }
        Ok(())
    }
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole == 0.0 { 0.0 } else { part / whole * 100.0 }
}

/// Builds a nested JSON document, one object per visited node.
#[derive(Debug)]
pub struct JsonTree {
    axis: MeasurementAxis,
    open: Vec<Map<String, Value>>,
    roots: Vec<Value>,
}

impl JsonTree {
    pub fn new(axis: MeasurementAxis) -> Self {
        Self {
            axis,
            open: Vec::new(),
            roots: Vec::new(),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Array(self.roots)
    }
}

impl Visitor for JsonTree {
    fn on_enter(&mut self, visit: &Visit<'_>) {
        let node = visit.node;
        let value = json!({
            "context": visit.context.id().0,
            "name": node.target().full_name(),
            "total": node.total_time(self.axis),
            "self": node.self_time(self.axis),
            "wait": node.wait_time(self.axis),
            "called": node.called(),
            "percent": visit.percent_of_overall,
            "expanded": visit.expandable,
            "children": [],
        });
        if let Value::Object(map) = value {
            self.open.push(map);
        }
    }

    fn on_leave(&mut self, _visit: &Visit<'_>) {
        let Some(done) = self.open.pop() else {
            return;
        };
        let done = Value::Object(done);
        match self.open.last_mut().and_then(|parent| parent.get_mut("children")) {
            Some(Value::Array(children)) => children.push(done),
            _ => self.roots.push(done),
        }
    }
}
