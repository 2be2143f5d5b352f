use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::error::{Result, StaleReferenceError, StateError};
use crate::model::{AxisSet, CallTreeNode, ContextId, ExecutionContext, NodeId};

static NEXT_RESULT_ID: AtomicU64 = AtomicU64::new(1);

/// A node reference that may be held independently of any borrow of the
/// result it came from.
///
/// Resolving it fails with a stale-reference error once the result is
/// released, when presented to a different result, or when the node was
/// folded away by elimination or merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    result: u64,
    context: ContextId,
    node: NodeId,
}

impl NodeHandle {
    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn node(&self) -> NodeId {
        self.node
    }
}

/// All execution contexts of a finished profiling session.
///
/// Read-only after ingestion except through `eliminate` and
/// `merge_by_thread`, which take `&mut self`; shared readers therefore never
/// observe a half-rewritten tree.
#[derive(Debug)]
pub struct ProfileResult {
    pub(crate) id: u64,
    pub(crate) released: bool,
    pub(crate) axes: AxisSet,
    pub(crate) contexts: Vec<ExecutionContext>,
}

impl ProfileResult {
    /// Assemble a result from independently built contexts.
    pub fn from_contexts(
        axes: AxisSet,
        contexts: impl IntoIterator<Item = ExecutionContext>,
    ) -> Result<Self> {
        let contexts: Vec<ExecutionContext> = contexts.into_iter().collect();
        for (i, context) in contexts.iter().enumerate() {
            if contexts[..i].iter().any(|c| c.id == context.id) {
                return Err(StateError::DuplicateContext(context.id).into());
            }
        }
        let id = NEXT_RESULT_ID.fetch_add(1, Ordering::Relaxed);
        debug!(result = id, contexts = contexts.len(), "profile result assembled");
        Ok(Self {
            id,
            released: false,
            axes,
            contexts,
        })
    }

    pub fn axes(&self) -> &AxisSet {
        &self.axes
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub(crate) fn ensure_live(&self) -> Result<(), StaleReferenceError> {
        if self.released {
            Err(StaleReferenceError::Released)
        } else {
            Ok(())
        }
    }

    pub fn contexts(&self) -> Result<&[ExecutionContext]> {
        self.ensure_live()?;
        Ok(&self.contexts)
    }

    pub fn context(&self, id: ContextId) -> Result<&ExecutionContext> {
        self.ensure_live()?;
        self.contexts
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| StateError::UnknownContext(id).into())
    }

    /// Create a detached handle for a node of one of this result's contexts.
    pub fn handle(&self, context: ContextId, node: NodeId) -> Result<NodeHandle> {
        self.context(context)?.node(node)?;
        Ok(NodeHandle {
            result: self.id,
            context,
            node,
        })
    }

    /// Handles for the root of every non-empty context, in context order.
    pub fn root_handles(&self) -> Result<Vec<NodeHandle>> {
        self.ensure_live()?;
        Ok(self
            .contexts
            .iter()
            .filter_map(|c| {
                c.root_id().map(|node| NodeHandle {
                    result: self.id,
                    context: c.id,
                    node,
                })
            })
            .collect())
    }

    pub fn resolve(&self, handle: NodeHandle) -> Result<&CallTreeNode> {
        if handle.result != self.id {
            return Err(StaleReferenceError::ForeignResult.into());
        }
        self.ensure_live()?;
        let context = self
            .contexts
            .iter()
            .find(|c| c.id == handle.context)
            .ok_or(StaleReferenceError::Context(handle.context))?;
        context.node(handle.node)
    }

    /// Drop the whole node graph. Every later access through this result or
    /// any handle taken from it fails with a stale-reference error.
    pub fn release(&mut self) {
        for context in &mut self.contexts {
            context.release();
        }
        self.contexts.clear();
        self.released = true;
        debug!(result = self.id, "profile result released");
    }
}
