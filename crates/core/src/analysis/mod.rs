pub mod aggregate;
pub mod minimality;
pub mod ranked;

pub use aggregate::{AggregateCall, aggregate_callees, aggregate_callers};
pub use ranked::{RankedEntry, RankedSort};
