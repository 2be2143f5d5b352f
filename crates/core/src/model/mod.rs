pub(crate) mod arena;
pub mod call_tree;
pub mod context;
pub mod identity;
pub mod measure;
pub mod method;
pub mod profile;

pub use arena::NodeId;
pub use call_tree::{CallTree, CallTreeNode, ConservationFault};
pub use context::{ContextId, ExecutionContext, ThreadId};
pub use identity::{DispatchKind, MethodIdentity};
pub use measure::{AXIS_COUNT, AxisSet, AxisValues, MeasurementAxis, MeasurementVector, Reading};
pub use method::MethodInfo;
pub use profile::{NodeHandle, ProfileResult};
