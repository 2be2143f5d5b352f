pub mod axis;
pub mod snapshot;

pub use axis::{AXIS_COUNT, AxisValues, MeasurementAxis};
pub use snapshot::{
    ContextSnapshot, DispatchKind, IdentitySnapshot, MethodSnapshot, NodeSnapshot,
    ProfileSnapshot,
};
