//! Declarative description of a wait

use crate::backoff::Backoff;
use crate::status::ABSENT_STATUS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

/// Default overall timeout of a wait
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// What a not-found probe result means for this wait
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundPolicy {
    /// Absence is the goal (waiting for a delete)
    Success,
    /// Absence is terminal (the resource vanished)
    #[default]
    Failure,
    /// Keep polling (the API lags on visibility right after creation)
    ContinuePolling,
}

impl NotFoundPolicy {
    /// Parse from a string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "success" => Some(Self::Success),
            "failure" | "fail" => Some(Self::Failure),
            "continue" | "continue-polling" | "continue_polling" => Some(Self::ContinuePolling),
            _ => None,
        }
    }
}

/// How a status label relates to a [`WaitSpec`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Target,
    Pending,
    Unexpected,
}

/// What the poller waits for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitSpec {
    /// Statuses that end the wait successfully
    pub target: BTreeSet<String>,

    /// Statuses that mean "keep waiting"
    #[serde(default)]
    pub pending: BTreeSet<String>,

    /// Treat statuses outside target and pending as pending instead of failing
    #[serde(default)]
    pub treat_unknown_as_pending: bool,

    /// Overall time budget, measured from the first probe
    pub timeout: Duration,

    /// Pause before the first probe (not counted against the timeout)
    #[serde(default)]
    pub initial_delay: Duration,

    #[serde(default)]
    pub backoff: Backoff,

    #[serde(default)]
    pub not_found: NotFoundPolicy,

    /// Consecutive not-found results tolerated under `ContinuePolling`
    #[serde(default)]
    pub not_found_checks: Option<u32>,

    /// Consecutive target observations required before succeeding
    #[serde(default = "default_occurrence")]
    pub continuous_target_occurrence: u32,
}

fn default_occurrence() -> u32 {
    1
}

impl WaitSpec {
    /// Wait until the status is one of `target`
    pub fn new<I, S>(target: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target: target.into_iter().map(Into::into).collect(),
            pending: BTreeSet::new(),
            treat_unknown_as_pending: false,
            timeout: DEFAULT_TIMEOUT,
            initial_delay: Duration::ZERO,
            backoff: Backoff::default(),
            not_found: NotFoundPolicy::default(),
            not_found_checks: None,
            continuous_target_occurrence: default_occurrence(),
        }
    }

    /// Wait until the resource is gone
    pub fn until_absent() -> Self {
        Self::new(std::iter::empty::<String>()).with_not_found(NotFoundPolicy::Success)
    }

    pub fn with_pending<I, S>(mut self, pending: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending = pending.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_not_found(mut self, policy: NotFoundPolicy) -> Self {
        self.not_found = policy;
        self
    }

    pub fn with_not_found_checks(mut self, checks: u32) -> Self {
        self.not_found_checks = Some(checks);
        self
    }

    pub fn with_continuous_target_occurrence(mut self, occurrences: u32) -> Self {
        self.continuous_target_occurrence = occurrences;
        self
    }

    pub fn treat_unknown_as_pending(mut self, enabled: bool) -> Self {
        self.treat_unknown_as_pending = enabled;
        self
    }

    pub fn classify_status(&self, status: &str) -> StatusClass {
        if self.target.contains(status) {
            StatusClass::Target
        } else if self.pending.contains(status) || self.treat_unknown_as_pending {
            StatusClass::Pending
        } else {
            StatusClass::Unexpected
        }
    }

    /// Human readable list of acceptable statuses
    pub fn expected(&self) -> Vec<String> {
        self.target.iter().chain(self.pending.iter()).cloned().collect()
    }

    /// Statuses that would end the wait successfully
    pub fn goal(&self) -> Vec<String> {
        let mut goal: Vec<String> = self.target.iter().cloned().collect();
        if self.not_found == NotFoundPolicy::Success {
            goal.push(ABSENT_STATUS.to_string());
        }
        goal
    }

    /// Reason this wait cannot be polled, if any
    pub fn validate(&self) -> Option<String> {
        let overlap: Vec<&str> = self
            .target
            .intersection(&self.pending)
            .map(String::as_str)
            .collect();
        if !overlap.is_empty() {
            return Some(format!(
                "target and pending statuses overlap: {}",
                overlap.join(", ")
            ));
        }
        if self.target.is_empty() && self.not_found != NotFoundPolicy::Success {
            return Some("no target status and not-found is not a success".to_string());
        }
        if self.timeout.is_zero() {
            return Some("timeout must be greater than zero".to_string());
        }
        if self.continuous_target_occurrence == 0 {
            return Some("continuous target occurrence must be at least 1".to_string());
        }
        if self.not_found_checks == Some(0) {
            return Some("not-found checks must be at least 1".to_string());
        }
        self.backoff.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        let spec = WaitSpec::new(["ACTIVE"]).with_pending(["CREATING", "PENDING"]);

        assert_eq!(spec.classify_status("ACTIVE"), StatusClass::Target);
        assert_eq!(spec.classify_status("CREATING"), StatusClass::Pending);
        assert_eq!(spec.classify_status("FAILED"), StatusClass::Unexpected);

        let lenient = spec.treat_unknown_as_pending(true);
        assert_eq!(lenient.classify_status("FAILED"), StatusClass::Pending);
    }

    #[test]
    fn test_overlap_is_rejected() {
        let spec = WaitSpec::new(["ACTIVE", "READY"]).with_pending(["READY", "CREATING"]);
        let reason = spec.validate().unwrap();
        assert!(reason.contains("READY"));
    }

    #[test]
    fn test_until_absent_is_valid() {
        let spec = WaitSpec::until_absent().with_pending(["DELETING"]);
        assert!(spec.validate().is_none());
        assert_eq!(spec.not_found, NotFoundPolicy::Success);
    }

    #[test]
    fn test_empty_target_needs_not_found_success() {
        let spec = WaitSpec::new(std::iter::empty::<String>());
        assert!(spec.validate().is_some());
    }

    #[test]
    fn test_zero_values_are_rejected() {
        assert!(WaitSpec::new(["UP"]).with_timeout(Duration::ZERO).validate().is_some());
        assert!(
            WaitSpec::new(["UP"])
                .with_continuous_target_occurrence(0)
                .validate()
                .is_some()
        );
        assert!(WaitSpec::new(["UP"]).with_not_found_checks(0).validate().is_some());
        assert!(
            WaitSpec::new(["UP"])
                .with_backoff(Backoff::fixed(Duration::ZERO))
                .validate()
                .is_some()
        );
    }

    #[test]
    fn test_not_found_policy_from_str() {
        assert_eq!(NotFoundPolicy::from_str("success"), Some(NotFoundPolicy::Success));
        assert_eq!(
            NotFoundPolicy::from_str("continue"),
            Some(NotFoundPolicy::ContinuePolling)
        );
        assert_eq!(NotFoundPolicy::from_str("ignore"), None);
    }
}
