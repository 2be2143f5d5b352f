use std::ops::{Add, AddAssign, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub use proftree_protocol::{AXIS_COUNT, AxisValues, MeasurementAxis};

/// Per-axis raw values, indexed by `MeasurementAxis::index`.
pub(crate) type Deltas = [f64; AXIS_COUNT];

/// The axes a session measures, in the order they were configured.
///
/// The first axis is the primary one: walkers and rankings use it when the
/// caller does not name an axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisSet {
    axes: Vec<MeasurementAxis>,
}

impl AxisSet {
    pub fn new(axes: impl IntoIterator<Item = MeasurementAxis>) -> Result<Self, ConfigError> {
        let mut seen = Vec::new();
        for axis in axes {
            if seen.contains(&axis) {
                return Err(ConfigError::DuplicateAxis(axis));
            }
            seen.push(axis);
        }
        if seen.is_empty() {
            return Err(ConfigError::EmptyAxes);
        }
        Ok(Self { axes: seen })
    }

    /// Wall time only, the most common session.
    pub fn wall_time() -> Self {
        Self {
            axes: vec![MeasurementAxis::WallTime],
        }
    }

    pub fn primary(&self) -> MeasurementAxis {
        self.axes.first().copied().unwrap_or(MeasurementAxis::WallTime)
    }

    pub fn contains(&self, axis: MeasurementAxis) -> bool {
        self.axes.contains(&axis)
    }

    pub fn as_slice(&self) -> &[MeasurementAxis] {
        &self.axes
    }

    pub fn iter(&self) -> impl Iterator<Item = MeasurementAxis> + '_ {
        self.axes.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }
}

impl Default for AxisSet {
    fn default() -> Self {
        Self::wall_time()
    }
}

/// A point-in-time reading of every measured axis, as delivered with an
/// enter, leave, suspend or resume event.
///
/// Axes the session does not measure are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Reading {
    values: Deltas,
}

impl Reading {
    pub fn new() -> Self {
        Self::default()
    }

    /// A reading carrying only a wall-clock value.
    pub fn wall(seconds: f64) -> Self {
        Self::new().with(MeasurementAxis::WallTime, seconds)
    }

    pub fn with(mut self, axis: MeasurementAxis, value: f64) -> Self {
        self.set(axis, value);
        self
    }

    pub fn set(&mut self, axis: MeasurementAxis, value: f64) {
        self.values[axis.index()] = value;
    }

    pub fn get(&self, axis: MeasurementAxis) -> f64 {
        self.values[axis.index()]
    }

    /// Per-axis difference `self - earlier`, zero on inactive axes.
    pub(crate) fn since(&self, earlier: &Reading, axes: &AxisSet) -> Deltas {
        let mut out = [0.0; AXIS_COUNT];
        for axis in axes.iter() {
            let i = axis.index();
            out[i] = self.values[i] - earlier.values[i];
        }
        out
    }
}

impl FromIterator<(MeasurementAxis, f64)> for Reading {
    fn from_iter<I: IntoIterator<Item = (MeasurementAxis, f64)>>(iter: I) -> Self {
        let mut reading = Self::new();
        for (axis, value) in iter {
            reading.set(axis, value);
        }
        reading
    }
}

/// Accumulated measurement of a call-tree node or method.
///
/// Holds total, self and wait time for every axis (inactive axes stay zero)
/// plus the completed call count, which is the same on every axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeasurementVector {
    values: [AxisValues; AXIS_COUNT],
    called: u64,
}

impl MeasurementVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn axis(&self, axis: MeasurementAxis) -> &AxisValues {
        &self.values[axis.index()]
    }

    pub(crate) fn axis_mut(&mut self, axis: MeasurementAxis) -> &mut AxisValues {
        &mut self.values[axis.index()]
    }

    pub fn total_time(&self, axis: MeasurementAxis) -> f64 {
        self.axis(axis).total_time
    }

    pub fn self_time(&self, axis: MeasurementAxis) -> f64 {
        self.axis(axis).self_time
    }

    pub fn wait_time(&self, axis: MeasurementAxis) -> f64 {
        self.axis(axis).wait_time
    }

    /// Time spent in callees: `total - self`.
    pub fn children_time(&self, axis: MeasurementAxis) -> f64 {
        let v = self.axis(axis);
        v.total_time - v.self_time
    }

    pub fn called(&self) -> u64 {
        self.called
    }

    /// Record one completed invocation.
    pub(crate) fn record_call(
        &mut self,
        axes: &AxisSet,
        total: &Deltas,
        children: &Deltas,
        wait: &Deltas,
    ) {
        for axis in axes.iter() {
            let i = axis.index();
            let v = &mut self.values[i];
            v.total_time += total[i];
            v.self_time += total[i] - children[i];
            v.wait_time += wait[i];
        }
        self.called += 1;
    }

    /// Move another node's self and wait time into this one. Totals and
    /// call counts stay as they are.
    pub(crate) fn absorb_self(&mut self, other: &MeasurementVector) {
        for (mine, theirs) in self.values.iter_mut().zip(other.values.iter()) {
            mine.self_time += theirs.self_time;
            mine.wait_time += theirs.wait_time;
        }
    }

    pub(crate) fn from_parts(values: [AxisValues; AXIS_COUNT], called: u64) -> Self {
        Self { values, called }
    }
}

impl AddAssign<&MeasurementVector> for MeasurementVector {
    fn add_assign(&mut self, rhs: &MeasurementVector) {
        for (mine, theirs) in self.values.iter_mut().zip(rhs.values.iter()) {
            mine.add(theirs);
        }
        self.called += rhs.called;
    }
}

impl SubAssign<&MeasurementVector> for MeasurementVector {
    fn sub_assign(&mut self, rhs: &MeasurementVector) {
        for (mine, theirs) in self.values.iter_mut().zip(rhs.values.iter()) {
            mine.sub(theirs);
        }
        self.called = self.called.saturating_sub(rhs.called);
    }
}

impl Add<&MeasurementVector> for MeasurementVector {
    type Output = MeasurementVector;

    fn add(mut self, rhs: &MeasurementVector) -> MeasurementVector {
        self += rhs;
        self
    }
}

impl Sub<&MeasurementVector> for MeasurementVector {
    type Output = MeasurementVector;

    fn sub(mut self, rhs: &MeasurementVector) -> MeasurementVector {
        self -= rhs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_set_rejects_empty_and_duplicates() {
        assert!(matches!(AxisSet::new(Vec::<MeasurementAxis>::new()), Err(ConfigError::EmptyAxes)));
        assert!(matches!(
            AxisSet::new([MeasurementAxis::WallTime, MeasurementAxis::WallTime]),
            Err(ConfigError::DuplicateAxis(MeasurementAxis::WallTime))
        ));
    }

    #[test]
    fn axis_set_keeps_order() {
        let axes = AxisSet::new([MeasurementAxis::Memory, MeasurementAxis::WallTime]).unwrap();
        assert_eq!(axes.primary(), MeasurementAxis::Memory);
        assert_eq!(axes.len(), 2);
        assert!(!axes.contains(MeasurementAxis::GcRuns));
    }

    #[test]
    fn reading_delta_ignores_inactive_axes() {
        let axes = AxisSet::wall_time();
        let start = Reading::wall(1.0).with(MeasurementAxis::Memory, 100.0);
        let end = Reading::wall(3.5).with(MeasurementAxis::Memory, 400.0);
        let delta = end.since(&start, &axes);
        assert_eq!(delta[MeasurementAxis::WallTime.index()], 2.5);
        assert_eq!(delta[MeasurementAxis::Memory.index()], 0.0);
    }

    #[test]
    fn record_call_splits_self_from_children() {
        let axes = AxisSet::wall_time();
        let mut total = [0.0; AXIS_COUNT];
        let mut children = [0.0; AXIS_COUNT];
        let mut wait = [0.0; AXIS_COUNT];
        total[0] = 5.0;
        children[0] = 3.0;
        wait[0] = 0.5;

        let mut m = MeasurementVector::new();
        m.record_call(&axes, &total, &children, &wait);
        assert_eq!(m.total_time(MeasurementAxis::WallTime), 5.0);
        assert_eq!(m.self_time(MeasurementAxis::WallTime), 2.0);
        assert_eq!(m.wait_time(MeasurementAxis::WallTime), 0.5);
        assert_eq!(m.children_time(MeasurementAxis::WallTime), 3.0);
        assert_eq!(m.called(), 1);
    }

    #[test]
    fn elementwise_add_and_sub() {
        let axes = AxisSet::wall_time();
        let mut total = [0.0; AXIS_COUNT];
        total[0] = 3.0;
        let none = [0.0; AXIS_COUNT];

        let mut a = MeasurementVector::new();
        a.record_call(&axes, &total, &none, &none);
        let b = a;
        let sum = a + &b;
        assert_eq!(sum.total_time(MeasurementAxis::WallTime), 6.0);
        assert_eq!(sum.called(), 2);

        let diff = sum - &b;
        assert_eq!(diff, a);
    }
}
