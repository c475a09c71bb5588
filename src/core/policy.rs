//! Sampling policy configuration.
//!
//! A [`SamplingPolicy`] is consumed once per sampling call. It can be
//! built in code or loaded from JSON (scene files embed one).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::util::{Error, Result};

/// Default shrink factor for the adaptive search step.
pub const DEFAULT_TIME_STEP_SCALE: f64 = 0.5;

/// Policy flags for one sampling call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingPolicy {
    /// Geometric shrink factor applied to the search step, in (0, 1).
    pub time_step_scale: f64,
    /// Return an empty mesh instead of failing on zero vertices.
    pub ignore_empty_meshes: bool,
    /// Return geometry without velocity when no consistent sample exists.
    pub ignore_topology_mismatch: bool,
    /// Skip transform sampling; output stays in object space.
    pub use_object_space: bool,
    /// Cap on distinct candidates the adaptive search queries.
    ///
    /// `None` lets the search run until the step rounds to zero, which
    /// always happens after a bounded number of steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_search_iterations: Option<u32>,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        Self {
            time_step_scale: DEFAULT_TIME_STEP_SCALE,
            ignore_empty_meshes: false,
            ignore_topology_mismatch: false,
            use_object_space: false,
            max_search_iterations: None,
        }
    }
}

impl SamplingPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time_step_scale(mut self, scale: f64) -> Self {
        self.time_step_scale = scale;
        self
    }

    pub fn with_ignore_empty_meshes(mut self, ignore: bool) -> Self {
        self.ignore_empty_meshes = ignore;
        self
    }

    pub fn with_ignore_topology_mismatch(mut self, ignore: bool) -> Self {
        self.ignore_topology_mismatch = ignore;
        self
    }

    pub fn with_object_space(mut self, object_space: bool) -> Self {
        self.use_object_space = object_space;
        self
    }

    pub fn with_max_search_iterations(mut self, iterations: u32) -> Self {
        self.max_search_iterations = Some(iterations);
        self
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        // NaN fails both comparisons
        if !(self.time_step_scale > 0.0 && self.time_step_scale < 1.0) {
            return Err(Error::InvalidPolicy(format!(
                "time_step_scale must be strictly between 0 and 1, got {}",
                self.time_step_scale
            )));
        }
        if self.max_search_iterations == Some(0) {
            return Err(Error::InvalidPolicy(
                "max_search_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a policy from JSON. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let policy: Self = serde_json::from_str(json)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Load and validate a policy from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
