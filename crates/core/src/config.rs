use regex::RegexSet;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{AxisSet, MeasurementAxis, MethodIdentity};

/// Session configuration, passed explicitly to every builder.
///
/// ```json
/// { "axes": ["WallTime", "Allocations"], "exclude_methods": ["^Kernel#"] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Measured axes; the first one is the primary axis.
    pub axes: Vec<MeasurementAxis>,
    /// Regular expressions over method full names. Matching methods get no
    /// call-tree node: their self time stays with the caller and their
    /// callees attach to the caller.
    pub exclude_methods: Vec<String>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            axes: vec![MeasurementAxis::WallTime],
            exclude_methods: Vec::new(),
        }
    }
}

impl ProfileConfig {
    pub fn new(axes: impl IntoIterator<Item = MeasurementAxis>) -> Self {
        Self {
            axes: axes.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_methods.push(pattern.into());
        self
    }

    /// Validate the configuration into the settings builders run with.
    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        let axes = AxisSet::new(self.axes.iter().copied())?;
        let exclusions = if self.exclude_methods.is_empty() {
            None
        } else {
            Some(RegexSet::new(&self.exclude_methods)?)
        };
        Ok(Settings { axes, exclusions })
    }
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub(crate) axes: AxisSet,
    exclusions: Option<RegexSet>,
}

impl Settings {
    pub fn new(axes: AxisSet) -> Self {
        Self {
            axes,
            exclusions: None,
        }
    }

    pub fn axes(&self) -> &AxisSet {
        &self.axes
    }

    pub fn is_excluded(&self, identity: &MethodIdentity) -> bool {
        self.exclusions
            .as_ref()
            .is_some_and(|set| set.is_match(identity.full_name()))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(AxisSet::wall_time())
    }
}
