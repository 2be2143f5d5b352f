use serde::{Deserialize, Serialize};

use crate::axis::{AxisValues, MeasurementAxis};

/// Transport form of a finished profile.
///
/// ```text
///   ProfileSnapshot
///     ├─ axes          active measurement axes, in order
///     └─ contexts[]    one per execution context
///          ├─ methods[]   identities, first-observed order
///          └─ nodes[]     call tree in pre-order, parent by position
/// ```
///
/// Nodes refer to their parent and method by position, so two snapshots of
/// the same tree compare equal regardless of how the engine stored them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub axes: Vec<MeasurementAxis>,
    pub contexts: Vec<ContextSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub id: u64,
    pub thread_id: u64,
    pub methods: Vec<MethodSnapshot>,
    /// Pre-order; the first node (if any) is the root.
    pub nodes: Vec<NodeSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSnapshot {
    pub identity: IdentitySnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentitySnapshot {
    pub scope: String,
    pub kind: DispatchKind,
    pub name: String,
    pub source_file: Option<String>,
    pub source_line: u32,
    /// 0 for the base identity, N for the N-th recursion variant.
    pub recursion_depth: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// Position of the parent in `ContextSnapshot::nodes`.
    pub parent: Option<usize>,
    /// Position of the target in `ContextSnapshot::methods`.
    pub method: usize,
    /// One entry per active axis, aligned with `ProfileSnapshot::axes`.
    pub values: Vec<AxisValues>,
    pub called: u64,
}

/// How a method is dispatched on its defining scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DispatchKind {
    Instance,
    Singleton,
    Module,
    Global,
}

impl std::fmt::Display for DispatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Instance => write!(f, "instance"),
            Self::Singleton => write!(f, "singleton"),
            Self::Module => write!(f, "module"),
            Self::Global => write!(f, "global"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> ProfileSnapshot {
        let identity = |name: &str| IdentitySnapshot {
            scope: "Worker".into(),
            kind: DispatchKind::Instance,
            name: name.into(),
            source_file: Some("worker.rb".into()),
            source_line: 10,
            recursion_depth: 0,
        };
        ProfileSnapshot {
            axes: vec![MeasurementAxis::WallTime, MeasurementAxis::Allocations],
            contexts: vec![ContextSnapshot {
                id: 1,
                thread_id: 1,
                methods: vec![
                    MethodSnapshot {
                        identity: identity("run"),
                    },
                    MethodSnapshot {
                        identity: identity("step"),
                    },
                ],
                nodes: vec![
                    NodeSnapshot {
                        parent: None,
                        method: 0,
                        values: vec![
                            AxisValues {
                                total_time: 3.0,
                                self_time: 1.0,
                                wait_time: 0.0,
                            },
                            AxisValues::default(),
                        ],
                        called: 1,
                    },
                    NodeSnapshot {
                        parent: Some(0),
                        method: 1,
                        values: vec![
                            AxisValues {
                                total_time: 2.0,
                                self_time: 2.0,
                                wait_time: 0.5,
                            },
                            AxisValues {
                                total_time: 4.0,
                                self_time: 4.0,
                                wait_time: 0.0,
                            },
                        ],
                        called: 2,
                    },
                ],
            }],
        }
    }

    #[test]
    fn serialization_roundtrip() {
        let snapshot = sample_snapshot();
        let json = serde_json::to_string(&snapshot).expect("serialize");
        let back: ProfileSnapshot = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, snapshot);
    }

    #[test]
    fn dispatch_kind_display() {
        assert_eq!(DispatchKind::Singleton.to_string(), "singleton");
        assert_eq!(DispatchKind::Global.to_string(), "global");
    }
}
