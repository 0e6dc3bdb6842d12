//! Wait defaults and per-resource-type overrides
//!
//! ```yaml
//! defaults:
//!   timeouts:
//!     create_secs: 600
//!     delete_secs: 1200
//!   backoff:
//!     min_delay_ms: 1000
//!     max_delay_ms: 30000
//!     multiplier: 2.0
//!   not_found_checks: 20
//!
//! resources:
//!   server:
//!     timeouts:
//!       delete_secs: 1800
//!     backoff:
//!       min_delay_ms: 5000
//! ```

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use stateflow_core::{Backoff, Operation, Timeouts, WaitSpec};
use std::collections::BTreeMap;
use std::time::Duration;

/// Whole configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub defaults: ResourceDefaults,

    /// Overrides keyed by resource type
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<String, ResourceOverrides>,
}

/// Effective wait settings of one resource type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceDefaults {
    #[serde(default)]
    pub timeouts: Timeouts,

    #[serde(default)]
    pub backoff: Backoff,

    /// Delay before the first probe (milliseconds)
    #[serde(default)]
    pub initial_delay_ms: u64,

    /// Consecutive not-found results tolerated while waiting for visibility
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_found_checks: Option<u32>,

    #[serde(default = "default_occurrence")]
    pub continuous_target_occurrence: u32,
}

fn default_occurrence() -> u32 {
    1
}

impl Default for ResourceDefaults {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::default(),
            backoff: Backoff::default(),
            initial_delay_ms: 0,
            not_found_checks: None,
            continuous_target_occurrence: default_occurrence(),
        }
    }
}

/// Partial settings layered over [`ResourceDefaults`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeouts: Option<TimeoutOverrides>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff: Option<BackoffOverrides>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_delay_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_found_checks: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuous_target_occurrence: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutOverrides {
    pub create_secs: Option<u64>,
    pub read_secs: Option<u64>,
    pub update_secs: Option<u64>,
    pub delete_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackoffOverrides {
    pub min_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub multiplier: Option<f64>,
}

impl Settings {
    /// Parse YAML text (see [`Settings::validate`])
    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Defaults with the overrides for `resource_type` applied
    pub fn for_resource(&self, resource_type: &str) -> ResourceDefaults {
        match self.resources.get(resource_type) {
            Some(overrides) => overrides.apply(&self.defaults),
            None => self.defaults.clone(),
        }
    }

    /// Check the defaults and every merged resource type
    pub fn validate(&self) -> Result<()> {
        self.defaults.validate("defaults")?;
        for resource_type in self.resources.keys() {
            self.for_resource(resource_type).validate(resource_type)?;
        }
        Ok(())
    }
}

impl ResourceDefaults {
    /// [`WaitSpec`] for `operation` using these settings
    pub fn wait_spec<T, P, S>(&self, operation: Operation, target: T, pending: P) -> WaitSpec
    where
        T: IntoIterator<Item = S>,
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut spec = WaitSpec::new(target)
            .with_pending(pending)
            .with_timeout(self.timeouts.get(operation))
            .with_backoff(self.backoff)
            .with_initial_delay(Duration::from_millis(self.initial_delay_ms))
            .with_continuous_target_occurrence(self.continuous_target_occurrence);
        if let Some(checks) = self.not_found_checks {
            spec = spec.with_not_found_checks(checks);
        }
        spec
    }

    fn validate(&self, scope: &str) -> Result<()> {
        let invalid = |reason: String| ConfigError::Invalid {
            scope: scope.to_string(),
            reason,
        };

        if let Some(reason) = self.backoff.validate() {
            return Err(invalid(reason));
        }
        for operation in [
            Operation::Create,
            Operation::Read,
            Operation::Update,
            Operation::Delete,
        ] {
            if self.timeouts.get(operation).is_zero() {
                return Err(invalid(format!("{} timeout must be positive", operation)));
            }
        }
        if self.continuous_target_occurrence == 0 {
            return Err(invalid(
                "continuous_target_occurrence must be at least 1".to_string(),
            ));
        }
        if self.not_found_checks == Some(0) {
            return Err(invalid("not_found_checks must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl ResourceOverrides {
    fn apply(&self, base: &ResourceDefaults) -> ResourceDefaults {
        let mut merged = base.clone();

        if let Some(timeouts) = &self.timeouts {
            let t = &mut merged.timeouts;
            t.create_secs = timeouts.create_secs.unwrap_or(t.create_secs);
            t.read_secs = timeouts.read_secs.unwrap_or(t.read_secs);
            t.update_secs = timeouts.update_secs.unwrap_or(t.update_secs);
            t.delete_secs = timeouts.delete_secs.unwrap_or(t.delete_secs);
        }
        if let Some(backoff) = &self.backoff {
            let b = &mut merged.backoff;
            b.min_delay_ms = backoff.min_delay_ms.unwrap_or(b.min_delay_ms);
            b.max_delay_ms = backoff.max_delay_ms.unwrap_or(b.max_delay_ms);
            b.multiplier = backoff.multiplier.unwrap_or(b.multiplier);
        }
        if let Some(delay) = self.initial_delay_ms {
            merged.initial_delay_ms = delay;
        }
        if self.not_found_checks.is_some() {
            merged.not_found_checks = self.not_found_checks;
        }
        if let Some(occurrence) = self.continuous_target_occurrence {
            merged.continuous_target_occurrence = occurrence;
        }

        merged
    }
}
