//! Call-tree data model and aggregation engine.
//!
//! A [`Profiler`] turns per-context enter/leave events into call trees, one
//! [`ExecutionContext`] each, collected into a [`ProfileResult`]. The result
//! can then be analysed (callers/callees, ranking, minimality), rewritten
//! (method elimination, merging contexts by thread), walked with a
//! [`GraphWalker`], or converted to a transport snapshot.

pub mod analysis;
pub mod builder;
pub mod config;
pub mod error;
pub mod model;
pub mod snapshot;
pub mod transform;
pub mod walker;

pub use analysis::{AggregateCall, RankedEntry, RankedSort};
pub use builder::{ContextBuilder, ContextState, Profiler, RecursionResolver};
pub use config::{ProfileConfig, Settings};
pub use error::{
    ConfigError, IntegrityError, ProfileError, Result, StaleReferenceError, StateError,
};
pub use model::{
    AxisSet, CallTree, CallTreeNode, ContextId, DispatchKind, ExecutionContext, MeasurementAxis,
    MeasurementVector, MethodIdentity, MethodInfo, NodeHandle, NodeId, ProfileResult, Reading,
    ThreadId,
};
pub use transform::MethodPattern;
pub use walker::{GraphWalker, JsonTree, Visit, Visitor};
