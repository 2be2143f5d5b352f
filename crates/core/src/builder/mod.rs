mod context;
mod profiler;
mod recursion;

pub use context::{ContextBuilder, ContextState};
pub use profiler::Profiler;
pub use recursion::RecursionResolver;
