use serde::{Deserialize, Serialize};

/// Number of measurement axes a profiler can track.
pub const AXIS_COUNT: usize = 7;

/// One dimension a profiling session can measure.
///
/// A session activates one or more axes at once; every call-tree node then
/// carries a value for each of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MeasurementAxis {
    /// Elapsed wall-clock time in seconds.
    WallTime,
    /// CPU time charged to the process in seconds.
    ProcessTime,
    /// Raw CPU cycle counter.
    CpuTime,
    /// Number of object allocations.
    Allocations,
    /// Allocated memory in bytes.
    Memory,
    /// Number of garbage collector runs.
    GcRuns,
    /// Time spent in the garbage collector in seconds.
    GcTime,
}

impl MeasurementAxis {
    pub const ALL: [MeasurementAxis; AXIS_COUNT] = [
        Self::WallTime,
        Self::ProcessTime,
        Self::CpuTime,
        Self::Allocations,
        Self::Memory,
        Self::GcRuns,
        Self::GcTime,
    ];

    /// Stable slot of this axis inside fixed-size measurement arrays.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether values on this axis are durations.
    pub fn is_time(self) -> bool {
        matches!(self, Self::WallTime | Self::ProcessTime | Self::GcTime)
    }

    /// Format a value measured on this axis for display.
    pub fn format_value(&self, value: f64) -> String {
        match self {
            Self::WallTime | Self::ProcessTime | Self::GcTime => {
                if value >= 1.0 {
                    format!("{:.2}s", value)
                } else if value >= 0.001 {
                    format!("{:.1}ms", value * 1_000.0)
                } else {
                    format!("{:.0}µs", value * 1_000_000.0)
                }
            }
            Self::CpuTime => {
                if value >= 1_000_000_000.0 {
                    format!("{:.2}G cycles", value / 1_000_000_000.0)
                } else if value >= 1_000_000.0 {
                    format!("{:.1}M cycles", value / 1_000_000.0)
                } else {
                    format!("{} cycles", value as u64)
                }
            }
            Self::Memory => {
                if value >= 1_073_741_824.0 {
                    format!("{:.1} GiB", value / 1_073_741_824.0)
                } else if value >= 1_048_576.0 {
                    format!("{:.1} MiB", value / 1_048_576.0)
                } else if value >= 1_024.0 {
                    format!("{:.1} KiB", value / 1_024.0)
                } else {
                    format!("{} B", value as u64)
                }
            }
            Self::Allocations => format!("{} allocations", value as u64),
            Self::GcRuns => format!("{} runs", value as u64),
        }
    }
}

impl std::fmt::Display for MeasurementAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WallTime => write!(f, "Wall Time"),
            Self::ProcessTime => write!(f, "Process Time"),
            Self::CpuTime => write!(f, "CPU Time"),
            Self::Allocations => write!(f, "Allocations"),
            Self::Memory => write!(f, "Memory"),
            Self::GcRuns => write!(f, "GC Runs"),
            Self::GcTime => write!(f, "GC Time"),
        }
    }
}

/// Accumulated quantities for one axis of one call-tree node.
///
/// `wait_time` is a reported part of `self_time`, never added on top of it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisValues {
    pub total_time: f64,
    pub self_time: f64,
    pub wait_time: f64,
}

impl AxisValues {
    pub fn add(&mut self, other: &AxisValues) {
        self.total_time += other.total_time;
        self.self_time += other.self_time;
        self.wait_time += other.wait_time;
    }

    pub fn sub(&mut self, other: &AxisValues) {
        self.total_time -= other.total_time;
        self.self_time -= other.self_time;
        self.wait_time -= other.wait_time;
    }
}
