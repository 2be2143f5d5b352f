use std::fmt;

use indexmap::IndexMap;
use tracing::{debug, warn};

use super::recursion::RecursionResolver;
use crate::config::Settings;
use crate::error::{ProfileError, Result, StateError};
use crate::model::measure::Deltas;
use crate::model::{
    AXIS_COUNT, CallTree, ContextId, ExecutionContext, MethodIdentity, MethodInfo, NodeId,
    Reading, ThreadId,
};

/// Lifecycle of a context under construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Recording,
    Finalized,
    /// Ingestion failed; the tree holds every pair completed before the
    /// failure and is read-only.
    Aborted,
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recording => write!(f, "recording"),
            Self::Finalized => write!(f, "finalized"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// An active call on the builder's stack.
#[derive(Debug)]
struct Frame {
    /// `None` for excluded methods, which get no node.
    node: Option<NodeId>,
    target: Option<MethodIdentity>,
    start: Reading,
    /// Totals of completed callees, per axis.
    children: Deltas,
    wait: Deltas,
    suspended_at: Option<Reading>,
}

impl Frame {
    fn new(node: Option<NodeId>, target: Option<MethodIdentity>, start: Reading) -> Self {
        Self {
            node,
            target,
            start,
            children: [0.0; AXIS_COUNT],
            wait: [0.0; AXIS_COUNT],
            suspended_at: None,
        }
    }
}

fn accumulate(into: &mut Deltas, from: &Deltas) {
    for (a, b) in into.iter_mut().zip(from.iter()) {
        *a += b;
    }
}

/// Builds the call tree of one execution context from its ordered
/// enter/leave stream.
///
/// A builder is owned by the flow of control producing its events, so
/// builders for different contexts can run on different threads without any
/// coordination.
///
/// A context has a single root. The first recorded top-level call becomes
/// the root and may be entered again; a different top-level method aborts
/// the context with [`StateError::ForeignRoot`]. Producers whose streams
/// have several top-level calls in sequence must wrap them in one outer
/// frame of their own.
///
/// Excluded methods get no node and their callees attach to the nearest
/// recorded caller. An excluded call with no recorded caller is recorded
/// like any other call, so it can still serve as the root.
#[derive(Debug)]
pub struct ContextBuilder {
    id: ContextId,
    thread_id: ThreadId,
    settings: Settings,
    tree: CallTree,
    methods: IndexMap<MethodIdentity, MethodInfo>,
    stack: Vec<Frame>,
    recursion: RecursionResolver,
    last_reading: Option<Reading>,
    state: ContextState,
}

impl ContextBuilder {
    pub fn new(id: ContextId, thread_id: ThreadId, settings: Settings) -> Self {
        debug!(context = %id, thread = %thread_id, "context started");
        Self {
            id,
            thread_id,
            settings,
            tree: CallTree::new(),
            methods: IndexMap::new(),
            stack: Vec::new(),
            recursion: RecursionResolver::new(),
            last_reading: None,
            state: ContextState::Recording,
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Number of calls currently active.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn enter(&mut self, identity: &MethodIdentity, reading: Reading) -> Result<()> {
        self.ensure_recording()?;
        self.last_reading = Some(reading);
        self.resume_top(&reading);

        let has_recorded_caller = self.stack.iter().any(|frame| frame.node.is_some());
        if has_recorded_caller && self.settings.is_excluded(identity) {
            self.stack.push(Frame::new(None, None, reading));
            return Ok(());
        }

        let target = self.recursion.resolve(identity);
        let parent = self.stack.iter().rev().find_map(|frame| frame.node);
        let node = match parent {
            Some(pid) => match self.tree.child_with_target(pid, &target) {
                Some(existing) => existing,
                None => {
                    let id = self.tree.add_child(pid, target.clone())?;
                    self.register(id, &target);
                    id
                }
            },
            None => match self.tree.root() {
                None => {
                    let id = self.tree.add_root(target.clone());
                    self.register(id, &target);
                    id
                }
                Some(root) => {
                    let root_target = self.tree.node(root)?.target();
                    if *root_target != target {
                        let err = StateError::ForeignRoot {
                            context: self.id,
                            root: root_target.full_name().to_string(),
                            found: target.full_name().to_string(),
                        };
                        return Err(self.abort(err));
                    }
                    root
                }
            },
        };

        self.recursion.push(&target);
        self.stack.push(Frame::new(Some(node), Some(target), reading));
        Ok(())
    }

    pub fn leave(&mut self, reading: Reading) -> Result<()> {
        self.ensure_recording()?;
        if self.stack.is_empty() {
            return Err(self.abort(StateError::LeaveWithoutEnter(self.id)));
        }
        self.last_reading = Some(reading);
        self.pop_frame(&reading)
    }

    /// The context stopped running (e.g. blocked on another context). Time
    /// until the matching resume is charged as wait time to the active call.
    pub fn suspend(&mut self, reading: Reading) -> Result<()> {
        self.ensure_recording()?;
        self.last_reading = Some(reading);
        if let Some(top) = self.stack.last_mut() {
            top.suspended_at.get_or_insert(reading);
        }
        Ok(())
    }

    pub fn resume(&mut self, reading: Reading) -> Result<()> {
        self.ensure_recording()?;
        self.last_reading = Some(reading);
        let suspended = match self.stack.last_mut() {
            None => return Ok(()),
            Some(top) => top.suspended_at.take(),
        };
        let Some(since) = suspended else {
            return Err(self.abort(StateError::ResumeWithoutSuspend(self.id)));
        };
        let delta = reading.since(&since, &self.settings.axes);
        if let Some(top) = self.stack.last_mut() {
            accumulate(&mut top.wait, &delta);
        }
        Ok(())
    }

    /// Stop accepting events. Calls still active are closed at the last
    /// reading this context saw.
    pub fn finalize(&mut self) -> Result<()> {
        if self.state == ContextState::Recording {
            self.close_open_frames();
            self.state = ContextState::Finalized;
            debug!(context = %self.id, nodes = self.tree.len(), "context finalized");
        }
        Ok(())
    }

    /// Hand over the finished tree.
    pub fn finish(self) -> Result<ExecutionContext> {
        if self.state == ContextState::Recording {
            return Err(StateError::NotFinalized(self.id).into());
        }
        Ok(ExecutionContext::from_parts(
            self.id,
            self.thread_id,
            self.tree,
            self.methods,
        ))
    }

    fn ensure_recording(&self) -> Result<(), StateError> {
        match self.state {
            ContextState::Recording => Ok(()),
            state => Err(StateError::ContextClosed {
                context: self.id,
                state,
            }),
        }
    }

    fn register(&mut self, id: NodeId, target: &MethodIdentity) {
        self.methods
            .entry(target.clone())
            .or_insert_with(|| MethodInfo::new(target.clone()))
            .call_sites
            .push(id);
    }

    /// A new event on a suspended call means the context is running again.
    fn resume_top(&mut self, reading: &Reading) {
        let axes = &self.settings.axes;
        if let Some(top) = self.stack.last_mut()
            && let Some(since) = top.suspended_at.take()
        {
            accumulate(&mut top.wait, &reading.since(&since, axes));
        }
    }

    fn pop_frame(&mut self, reading: &Reading) -> Result<()> {
        self.resume_top(reading);
        let Some(frame) = self.stack.pop() else {
            return Ok(());
        };
        let axes = &self.settings.axes;
        let total = reading.since(&frame.start, axes);

        match frame.node {
            Some(id) => {
                self.tree
                    .node_mut(id)?
                    .measurement
                    .record_call(axes, &total, &frame.children, &frame.wait);
                if let Some(target) = &frame.target {
                    self.recursion.pop(target);
                }
                if let Some(parent) = self.stack.last_mut() {
                    accumulate(&mut parent.children, &total);
                }
            }
            None => {
                // Excluded call: its own time stays with the caller.
                if let Some(parent) = self.stack.last_mut() {
                    accumulate(&mut parent.children, &frame.children);
                    accumulate(&mut parent.wait, &frame.wait);
                }
            }
        }
        Ok(())
    }

    fn close_open_frames(&mut self) {
        let Some(reading) = self.last_reading else {
            self.stack.clear();
            return;
        };
        while !self.stack.is_empty() {
            if self.pop_frame(&reading).is_err() {
                self.stack.clear();
            }
        }
    }

    fn abort(&mut self, err: StateError) -> ProfileError {
        warn!(context = %self.id, error = %err, "aborting context");
        self.close_open_frames();
        self.state = ContextState::Aborted;
        err.into()
    }
}
