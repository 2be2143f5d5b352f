use thiserror::Error;

use crate::builder::ContextState;
use crate::model::{ContextId, MeasurementAxis, NodeId};

/// Invalid or empty session configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("at least one measurement axis must be active")]
    EmptyAxes,
    #[error("measurement axis {0} is listed more than once")]
    DuplicateAxis(MeasurementAxis),
    #[error("invalid exclusion pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// An event or operation arrived at the wrong point of a context's lifecycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("unknown context {0}")]
    UnknownContext(ContextId),
    #[error("context {0} already exists")]
    DuplicateContext(ContextId),
    #[error("context {context} is {state} and accepts no more events")]
    ContextClosed {
        context: ContextId,
        state: ContextState,
    },
    #[error("context {0}: leave without matching enter")]
    LeaveWithoutEnter(ContextId),
    #[error("context {0}: resume without matching suspend")]
    ResumeWithoutSuspend(ContextId),
    #[error("context {context}: top-level method {found} does not match root {root}")]
    ForeignRoot {
        context: ContextId,
        root: String,
        found: String,
    },
    #[error("context {0} is still recording")]
    NotFinalized(ContextId),
}

/// A structural rewrite or import would break the call tree.
#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("cannot eliminate {method}: it is the root of context {context}")]
    RootElimination { method: String, context: ContextId },
    #[error("no method named {0} in any context")]
    UnknownMethod(String),
    #[error("invalid elimination pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error(
        "context {context}: {method} has total {total} but self {self_time} + children {children}"
    )]
    Conservation {
        context: ContextId,
        method: String,
        total: f64,
        self_time: f64,
        children: f64,
    },
    #[error("cannot merge context {right} into {left}: roots {left_root} and {right_root} differ")]
    RootMismatch {
        left: ContextId,
        right: ContextId,
        left_root: String,
        right_root: String,
    },
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),
}

/// A handle outlived the graph it points into.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StaleReferenceError {
    #[error("profile result has been released")]
    Released,
    #[error("handle belongs to a different profile result")]
    ForeignResult,
    #[error("context {0} no longer exists")]
    Context(ContextId),
    #[error("node {0} no longer exists")]
    Node(NodeId),
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("configuration: {0}")]
    Configuration(#[from] ConfigError),
    #[error("state: {0}")]
    State(#[from] StateError),
    #[error("integrity: {0}")]
    Integrity(#[from] IntegrityError),
    #[error("stale reference: {0}")]
    StaleReference(#[from] StaleReferenceError),
}

pub type Result<T, E = ProfileError> = std::result::Result<T, E>;
