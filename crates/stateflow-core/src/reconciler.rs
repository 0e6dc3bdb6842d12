//! Multi-phase transitions
//!
//! Some transitions need the resource to pass through an intermediate state
//! before the final one: disable before delete, drain before terminate.
//! A [`Reconciler`] runs an ordered list of [`Phase`]s, each one a side effect
//! followed by a wait.
//!
//! Every phase re-probes the resource before acting, so a run that is retried
//! after partially completing picks up where the remote side actually is and
//! never re-issues a side effect whose precondition no longer holds.
//!
//! A phase's pending set means "already underway": seeing one of those statuses
//! resumes the phase without issuing its side effect. After the side effect is
//! issued, reads may lag behind the request, so the status seen before it and
//! the `when` statuses are also tolerated while waiting.
//!
//! The pre-check, the side effect and the wait of one phase all count against
//! that phase's timeout, measured from the pre-check's first probe.

use crate::classify::ErrorKind;
use crate::error::{Result, WaitError};
use crate::handle::ResourceHandle;
use crate::poller::{Observation, StateRefresher, wait_cancelled};
use crate::probe::{Mutation, StatusProbe};
use crate::status::StatusSnapshot;
use crate::wait_spec::{NotFoundPolicy, WaitSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Run `phases` against `handle` and return the final snapshot
pub async fn reconcile<P>(
    probe: &P,
    handle: &ResourceHandle,
    phases: Vec<Phase<P::Error>>,
) -> Result<StatusSnapshot>
where
    P: StatusProbe + ?Sized,
{
    let mut reconciler = Reconciler::new(probe, handle);
    for phase in phases {
        reconciler = reconciler.phase(phase);
    }
    reconciler.run().await
}

/// One step of a transition: an optional side effect, then a wait
pub struct Phase<E> {
    name: String,
    mutation: Option<Box<dyn Mutation<Error = E>>>,
    wait: WaitSpec,
    when: Option<BTreeSet<String>>,
    already_done: BTreeSet<String>,
}

impl<E> Phase<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, wait: WaitSpec) -> Self {
        Self {
            name: name.into(),
            mutation: None,
            wait,
            when: None,
            already_done: BTreeSet::new(),
        }
    }

    /// Side effect issued before waiting
    pub fn with_mutation<M>(mut self, mutation: M) -> Self
    where
        M: Mutation<Error = E> + 'static,
    {
        self.mutation = Some(Box::new(mutation));
        self
    }

    /// Statuses from which the side effect may be issued
    pub fn when<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.when = Some(statuses.into_iter().map(Into::into).collect());
        self
    }

    /// Extra statuses meaning this phase has nothing left to do
    pub fn already_done_when<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.already_done = statuses.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wait_spec(&self) -> &WaitSpec {
        &self.wait
    }

    fn is_complete(&self, observation: &Observation) -> bool {
        match observation {
            Observation::Absent => self.wait.not_found == NotFoundPolicy::Success,
            Observation::Found(snapshot) => {
                self.wait.target.contains(&snapshot.status)
                    || self.already_done.contains(&snapshot.status)
            }
        }
    }

    fn is_underway(&self, observation: &Observation) -> bool {
        observation
            .status()
            .is_some_and(|status| self.wait.pending.contains(status))
    }

    /// Whether the observation shows the resource has at least entered this phase
    fn is_reached(&self, observation: &Observation) -> bool {
        self.is_complete(observation) || self.is_underway(observation)
    }

    /// Wait used after the side effect was issued from status `observed`
    ///
    /// The remote side may still report the old status for a while, so
    /// `observed` and the `when` statuses count as pending.
    fn settling_wait(&self, observed: Option<&str>) -> WaitSpec {
        let mut wait = self.wait.clone();
        let stale = self
            .when
            .iter()
            .flatten()
            .map(String::as_str)
            .chain(observed)
            .filter(|status| !self.wait.target.contains(*status))
            .map(str::to_string);
        wait.pending.extend(stale);
        wait
    }
}

/// What happened to a phase during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseOutcome {
    /// Side effect issued and wait completed
    Applied,
    /// Side effect was already underway; only waited
    Resumed,
    /// Resource was already past this phase
    Skipped,
}

impl std::fmt::Display for PhaseOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhaseOutcome::Applied => write!(f, "applied"),
            PhaseOutcome::Resumed => write!(f, "resumed"),
            PhaseOutcome::Skipped => write!(f, "skipped"),
        }
    }
}

/// Result of a single phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub name: String,
    pub outcome: PhaseOutcome,

    /// Status seen by the pre-check (`None` when absent)
    pub observed: Option<String>,

    pub duration_ms: u64,
}

/// Result of a reconcile run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub phases: Vec<PhaseRecord>,

    /// Final state of the resource
    pub snapshot: StatusSnapshot,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ReconcileReport {
    /// Names of phases with the given outcome
    pub fn phases_with(&self, outcome: PhaseOutcome) -> Vec<&str> {
        self.phases
            .iter()
            .filter(|p| p.outcome == outcome)
            .map(|p| p.name.as_str())
            .collect()
    }

    pub fn applied(&self) -> Vec<&str> {
        self.phases_with(PhaseOutcome::Applied)
    }

    pub fn skipped(&self) -> Vec<&str> {
        self.phases_with(PhaseOutcome::Skipped)
    }
}

impl std::fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} applied, {} resumed, {} skipped",
            self.applied().len(),
            self.phases_with(PhaseOutcome::Resumed).len(),
            self.skipped().len()
        )
    }
}

enum Decision {
    Apply,
    Resume,
    Skip,
    Reject(String),
}

/// Sequences phases against one resource
pub struct Reconciler<'a, P>
where
    P: StatusProbe + ?Sized,
{
    probe: &'a P,
    handle: &'a ResourceHandle,
    phases: Vec<Phase<P::Error>>,
    cancel: Option<CancellationToken>,
}

impl<'a, P> Reconciler<'a, P>
where
    P: StatusProbe + ?Sized,
{
    pub fn new(probe: &'a P, handle: &'a ResourceHandle) -> Self {
        Self {
            probe,
            handle,
            phases: Vec::new(),
            cancel: None,
        }
    }

    pub fn phase(mut self, phase: Phase<P::Error>) -> Self {
        self.phases.push(phase);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub async fn run(&self) -> Result<StatusSnapshot> {
        self.run_with_report().await.map(|report| report.snapshot)
    }

    pub async fn run_with_report(&self) -> Result<ReconcileReport> {
        self.validate()?;

        let started = Instant::now();
        let mut records = Vec::with_capacity(self.phases.len());
        let mut snapshot = None;

        for (index, phase) in self.phases.iter().enumerate() {
            let phase_started = Instant::now();

            let observation = self
                .refresher(&phase.wait, phase_started)
                .observe()
                .await
                .map_err(|e| e.in_phase(&phase.name))?;
            let observed = observation.status().map(str::to_string);

            let (outcome, settling) = match self.decide(index, &observation) {
                Decision::Skip => {
                    tracing::info!(
                        "Skipping phase '{}' for {}: already {}",
                        phase.name,
                        self.handle,
                        observed.as_deref().unwrap_or("gone")
                    );
                    snapshot = Some(observation.into_snapshot());
                    records.push(PhaseRecord {
                        name: phase.name.clone(),
                        outcome: PhaseOutcome::Skipped,
                        observed,
                        duration_ms: phase_started.elapsed().as_millis() as u64,
                    });
                    continue;
                }
                Decision::Reject(status) => {
                    let expected = phase
                        .when
                        .as_ref()
                        .map(|when| when.iter().cloned().collect())
                        .unwrap_or_default();
                    return Err(WaitError::UnexpectedState {
                        handle: self.handle.to_string(),
                        status,
                        expected,
                        elapsed: phase_started.elapsed(),
                    }
                    .in_phase(&phase.name));
                }
                Decision::Resume => {
                    tracing::info!(
                        "Phase '{}' for {} already underway ({}), waiting",
                        phase.name,
                        self.handle,
                        observed.as_deref().unwrap_or_default()
                    );
                    (PhaseOutcome::Resumed, None)
                }
                Decision::Apply => {
                    tracing::info!("Applying phase '{}' to {}", phase.name, self.handle);
                    self.apply(phase, phase_started)
                        .await
                        .map_err(|e| e.in_phase(&phase.name))?;
                    (
                        PhaseOutcome::Applied,
                        Some(phase.settling_wait(observed.as_deref())),
                    )
                }
            };

            let wait = settling.as_ref().unwrap_or(&phase.wait);
            let done = self
                .refresher(wait, phase_started)
                .wait()
                .await
                .map_err(|e| e.in_phase(&phase.name))?;
            snapshot = Some(done);
            records.push(PhaseRecord {
                name: phase.name.clone(),
                outcome,
                observed,
                duration_ms: phase_started.elapsed().as_millis() as u64,
            });
        }

        let snapshot = snapshot.ok_or_else(|| WaitError::InvalidSpec {
            handle: self.handle.to_string(),
            reason: "no phases to run".to_string(),
        })?;
        let report = ReconcileReport {
            phases: records,
            snapshot,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!("Reconciled {}: {}", self.handle, report);
        Ok(report)
    }

    /// Every phase's wait is checked before any side effect is issued
    fn validate(&self) -> Result<()> {
        if self.phases.is_empty() {
            return Err(WaitError::InvalidSpec {
                handle: self.handle.to_string(),
                reason: "no phases to run".to_string(),
            });
        }

        for phase in &self.phases {
            if let Some(reason) = phase.wait.validate() {
                return Err(WaitError::InvalidSpec {
                    handle: self.handle.to_string(),
                    reason,
                }
                .in_phase(&phase.name));
            }
        }
        Ok(())
    }

    fn decide(&self, index: usize, observation: &Observation) -> Decision {
        let phase = &self.phases[index];

        if phase.is_complete(observation) {
            return Decision::Skip;
        }
        if phase.is_underway(observation) {
            return Decision::Resume;
        }
        if self.phases[index + 1..]
            .iter()
            .any(|later| later.is_reached(observation))
        {
            return Decision::Skip;
        }

        if let Some(when) = &phase.when {
            let status = observation.status().unwrap_or(crate::status::ABSENT_STATUS);
            if !when.contains(status) {
                return Decision::Reject(status.to_string());
            }
        }

        Decision::Apply
    }

    /// Issue the phase's side effect, retrying transient failures until the phase deadline
    async fn apply(&self, phase: &Phase<P::Error>, started: Instant) -> Result<()> {
        let Some(mutation) = &phase.mutation else {
            return Ok(());
        };

        let timeout = phase.wait.timeout;
        let mut attempt = 0;

        loop {
            if self.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
                return Err(self.cancelled(started.elapsed()));
            }

            let error = match mutation.apply(self.handle).await {
                Ok(()) => {
                    tracing::debug!("Phase '{}' request accepted for {}", phase.name, self.handle);
                    return Ok(());
                }
                Err(e) => e,
            };

            match self.probe.classify(&error) {
                ErrorKind::Fatal => {
                    return Err(WaitError::Fatal {
                        handle: self.handle.to_string(),
                        elapsed: started.elapsed(),
                        last_status: None,
                        source: Box::new(error),
                    });
                }
                ErrorKind::NotFound if phase.wait.not_found == NotFoundPolicy::Success => {
                    tracing::info!(
                        "{} already gone while applying phase '{}'",
                        self.handle,
                        phase.name
                    );
                    return Ok(());
                }
                ErrorKind::NotFound => {
                    return Err(WaitError::NotFoundTerminal {
                        handle: self.handle.to_string(),
                        elapsed: started.elapsed(),
                    });
                }
                ErrorKind::Transient => {
                    tracing::warn!(
                        "Transient error applying phase '{}' to {}, retrying: {}",
                        phase.name,
                        self.handle,
                        error
                    );
                }
            }

            let elapsed = started.elapsed();
            let delay = phase.wait.backoff.delay(attempt);
            attempt += 1;
            if elapsed + delay >= timeout {
                return Err(WaitError::TimedOut {
                    handle: self.handle.to_string(),
                    timeout,
                    elapsed,
                    expected: phase.wait.goal(),
                    last: None,
                    last_error: Some(error.to_string()),
                });
            }

            tokio::select! {
                biased;
                _ = wait_cancelled(self.cancel.as_ref()) => {
                    return Err(self.cancelled(started.elapsed()));
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn refresher<'s>(&'s self, spec: &'s WaitSpec, started: Instant) -> StateRefresher<'s, P> {
        let refresher = StateRefresher::new(self.probe, self.handle, spec).with_clock(started);
        match &self.cancel {
            Some(cancel) => refresher.with_cancellation(cancel.clone()),
            None => refresher,
        }
    }

    fn cancelled(&self, elapsed: Duration) -> WaitError {
        WaitError::Cancelled {
            handle: self.handle.to_string(),
            elapsed,
            last_status: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::PollResult;
    use async_trait::async_trait;

    #[derive(Debug, thiserror::Error)]
    #[error("unused")]
    struct Never;

    struct Unreachable;

    #[async_trait]
    impl StatusProbe for Unreachable {
        type Error = Never;

        async fn probe(&self, _handle: &ResourceHandle) -> PollResult<Never> {
            PollResult::NotFound
        }

        fn classify(&self, _error: &Never) -> ErrorKind {
            ErrorKind::Fatal
        }
    }

    fn found(status: &str) -> Observation {
        Observation::Found(StatusSnapshot::with_status(status))
    }

    fn stop_then_delete() -> Vec<Phase<Never>> {
        vec![
            Phase::new("stop", WaitSpec::new(["STOPPED"]).with_pending(["STOPPING"]))
                .when(["RUNNING"])
                .already_done_when(["STOPPED_BY_USER"]),
            Phase::new("delete", WaitSpec::until_absent().with_pending(["DELETING"]))
                .when(["STOPPED", "STOPPED_BY_USER"]),
        ]
    }

    fn decision(observation: &Observation, index: usize) -> &'static str {
        let handle = ResourceHandle::new("server", "1");
        let mut reconciler = Reconciler::new(&Unreachable, &handle);
        for phase in stop_then_delete() {
            reconciler = reconciler.phase(phase);
        }
        match reconciler.decide(index, observation) {
            Decision::Apply => "apply",
            Decision::Resume => "resume",
            Decision::Skip => "skip",
            Decision::Reject(_) => "reject",
        }
    }

    #[test]
    fn test_phase_accessors() {
        let phases = stop_then_delete();
        assert_eq!(phases[0].name(), "stop");
        assert!(phases[1].wait_spec().target.is_empty());
        assert_eq!(phases[1].wait_spec().not_found, NotFoundPolicy::Success);
    }

    #[test]
    fn test_decisions_for_first_phase() {
        assert_eq!(decision(&found("RUNNING"), 0), "apply");
        assert_eq!(decision(&found("STOPPING"), 0), "resume");
        assert_eq!(decision(&found("STOPPED"), 0), "skip");
        assert_eq!(decision(&found("STOPPED_BY_USER"), 0), "skip");
        assert_eq!(decision(&found("DELETING"), 0), "skip");
        assert_eq!(decision(&Observation::Absent, 0), "skip");
        assert_eq!(decision(&found("MIGRATING"), 0), "reject");
    }

    #[test]
    fn test_decisions_for_last_phase() {
        assert_eq!(decision(&found("STOPPED"), 1), "apply");
        assert_eq!(decision(&found("STOPPED_BY_USER"), 1), "apply");
        assert_eq!(decision(&found("DELETING"), 1), "resume");
        assert_eq!(decision(&Observation::Absent, 1), "skip");
        assert_eq!(decision(&found("RUNNING"), 1), "reject");
    }

    #[test]
    fn test_settling_wait_tolerates_stale_reads() {
        let phases = stop_then_delete();

        let stop = phases[0].settling_wait(Some("RUNNING"));
        assert!(stop.pending.contains("STOPPING"));
        assert!(stop.pending.contains("RUNNING"));
        assert!(stop.validate().is_none());

        let delete = phases[1].settling_wait(Some("STOPPED"));
        assert!(delete.pending.contains("DELETING"));
        assert!(delete.pending.contains("STOPPED"));
        assert!(delete.pending.contains("STOPPED_BY_USER"));

        // the phase's own wait is unchanged, so a stale status never means "underway"
        assert!(!phases[1].wait_spec().pending.contains("STOPPED"));
    }

    #[test]
    fn test_settling_wait_keeps_targets_out_of_pending() {
        let phase = Phase::<Never>::new("start", WaitSpec::new(["RUNNING"]))
            .when(["STOPPED", "RUNNING"]);
        let wait = phase.settling_wait(None);
        assert!(!wait.pending.contains("RUNNING"));
        assert!(wait.pending.contains("STOPPED"));
        assert!(wait.validate().is_none());
    }

    #[test]
    fn test_report_display() {
        let record = |name: &str, outcome| PhaseRecord {
            name: name.to_string(),
            outcome,
            observed: None,
            duration_ms: 0,
        };
        let report = ReconcileReport {
            phases: vec![
                record("stop", PhaseOutcome::Skipped),
                record("delete", PhaseOutcome::Resumed),
            ],
            snapshot: StatusSnapshot::absent(),
            duration_ms: 0,
        };

        assert_eq!(report.to_string(), "0 applied, 1 resumed, 1 skipped");
        assert_eq!(report.skipped(), vec!["stop"]);
        assert!(report.applied().is_empty());
    }
}
