//! State refresher
//!
//! Repeatedly probes one resource on the [`Backoff`](crate::Backoff) schedule
//! until its status satisfies a [`WaitSpec`], reaches a state the wait does
//! not expect, or the timeout elapses.
//!
//! ```text
//! Start ─▶ Polling ─┬─▶ Success
//!            ▲  │   ├─▶ UnexpectedState
//!            └──┘   ├─▶ NotFoundTerminal
//!       (pending,   ├─▶ Fatal
//!        transient, ├─▶ TimedOut
//!        not found) └─▶ Cancelled
//! ```

use crate::classify::ErrorKind;
use crate::error::{Result, WaitError};
use crate::handle::ResourceHandle;
use crate::probe::StatusProbe;
use crate::status::{PollResult, StatusSnapshot};
use crate::wait_spec::{NotFoundPolicy, StatusClass, WaitSpec};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Wait until `handle` reaches one of the statuses `spec` describes
pub async fn wait_for<P>(
    probe: &P,
    handle: &ResourceHandle,
    spec: &WaitSpec,
) -> Result<StatusSnapshot>
where
    P: StatusProbe + ?Sized,
{
    StateRefresher::new(probe, handle, spec).wait().await
}

/// [`wait_for`] that also stops when `cancel` fires
pub async fn wait_for_with_cancel<P>(
    probe: &P,
    handle: &ResourceHandle,
    spec: &WaitSpec,
    cancel: &CancellationToken,
) -> Result<StatusSnapshot>
where
    P: StatusProbe + ?Sized,
{
    StateRefresher::new(probe, handle, spec)
        .with_cancellation(cancel.clone())
        .wait()
        .await
}

/// Definite answer about a resource's current state
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Found(StatusSnapshot),
    Absent,
}

impl Observation {
    pub fn status(&self) -> Option<&str> {
        match self {
            Observation::Found(snapshot) => Some(&snapshot.status),
            Observation::Absent => None,
        }
    }

    pub fn into_snapshot(self) -> StatusSnapshot {
        match self {
            Observation::Found(snapshot) => snapshot,
            Observation::Absent => StatusSnapshot::absent(),
        }
    }
}

/// Polling loop bound to one probe, one handle and one [`WaitSpec`]
pub struct StateRefresher<'a, P: ?Sized> {
    probe: &'a P,
    handle: &'a ResourceHandle,
    spec: &'a WaitSpec,
    cancel: Option<CancellationToken>,
    clock: Option<Instant>,
}

/// Bookkeeping of one polling run
struct Run {
    started: Instant,
    deadline: Instant,
    probes: u32,
    sleeps: u32,
    target_streak: u32,
    not_found_streak: u32,
    last: Option<StatusSnapshot>,
    last_error: Option<String>,
}

impl Run {
    fn start(started: Instant, timeout: Duration) -> Self {
        Self {
            started,
            deadline: started + timeout,
            probes: 0,
            sleeps: 0,
            target_streak: 0,
            not_found_streak: 0,
            last: None,
            last_error: None,
        }
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn last_status(&self) -> Option<String> {
        self.last.as_ref().map(|s| s.status.clone())
    }
}

/// Why a pause or a probe was interrupted
enum Interrupt {
    Deadline,
    Cancelled,
}

impl<'a, P> StateRefresher<'a, P>
where
    P: StatusProbe + ?Sized,
{
    pub fn new(probe: &'a P, handle: &'a ResourceHandle, spec: &'a WaitSpec) -> Self {
        Self {
            probe,
            handle,
            spec,
            cancel: None,
            clock: None,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Count the timeout from `started` instead of from the first probe
    ///
    /// Several refreshers given the same instant share one deadline.
    pub fn with_clock(mut self, started: Instant) -> Self {
        self.clock = Some(started);
        self
    }

    fn start_run(&self) -> Run {
        Run::start(self.clock.unwrap_or_else(Instant::now), self.spec.timeout)
    }

    /// Poll until a target status is reached or a terminal outcome occurs
    pub async fn wait(&self) -> Result<StatusSnapshot> {
        if let Some(reason) = self.spec.validate() {
            return Err(WaitError::InvalidSpec {
                handle: self.handle.to_string(),
                reason,
            });
        }

        self.initial_pause().await?;

        let mut run = self.start_run();
        tracing::debug!(
            "Waiting for {} to reach [{}] (timeout {:?})",
            self.handle,
            self.spec.goal().join(", "),
            self.spec.timeout
        );

        loop {
            let result = self.probe_once(&mut run).await?;

            match result {
                PollResult::Found(snapshot) => {
                    if let Some(done) = self.on_found(&mut run, snapshot)? {
                        return Ok(done);
                    }
                }
                PollResult::NotFound => {
                    if let Some(done) = self.on_not_found(&mut run)? {
                        return Ok(done);
                    }
                }
                PollResult::Error(e) => match self.probe.classify(&e) {
                    ErrorKind::Fatal => {
                        tracing::debug!("Fatal error while waiting for {}: {}", self.handle, e);
                        return Err(self.fatal(&run, e));
                    }
                    ErrorKind::NotFound => {
                        tracing::debug!("{} reported absent via error: {}", self.handle, e);
                        if let Some(done) = self.on_not_found(&mut run)? {
                            return Ok(done);
                        }
                    }
                    ErrorKind::Transient => {
                        tracing::warn!(
                            "Transient error while waiting for {}, retrying: {}",
                            self.handle,
                            e
                        );
                        run.last_error = Some(e.to_string());
                    }
                },
            }

            self.pause(&mut run).await?;
        }
    }

    /// Probe until the resource is either found or definitely absent
    ///
    /// Transient errors are absorbed within the wait timeout; the status
    /// itself is not judged against the target or pending sets.
    pub async fn observe(&self) -> Result<Observation> {
        let mut run = self.start_run();

        loop {
            match self.probe_once(&mut run).await? {
                PollResult::Found(snapshot) => return Ok(Observation::Found(snapshot)),
                PollResult::NotFound => return Ok(Observation::Absent),
                PollResult::Error(e) => match self.probe.classify(&e) {
                    ErrorKind::NotFound => return Ok(Observation::Absent),
                    ErrorKind::Fatal => return Err(self.fatal(&run, e)),
                    ErrorKind::Transient => {
                        tracing::warn!(
                            "Transient error while reading {}, retrying: {}",
                            self.handle,
                            e
                        );
                        run.last_error = Some(e.to_string());
                    }
                },
            }

            self.pause(&mut run).await?;
        }
    }

    fn on_found(&self, run: &mut Run, snapshot: StatusSnapshot) -> Result<Option<StatusSnapshot>> {
        run.not_found_streak = 0;

        match self.spec.classify_status(&snapshot.status) {
            StatusClass::Target => {
                run.target_streak += 1;
                if run.target_streak >= self.spec.continuous_target_occurrence {
                    tracing::info!(
                        "{} reached {} after {} probe(s) in {:?}",
                        self.handle,
                        snapshot.status,
                        run.probes,
                        run.elapsed()
                    );
                    return Ok(Some(snapshot));
                }
                tracing::debug!(
                    "{} is {} ({}/{} consecutive)",
                    self.handle,
                    snapshot.status,
                    run.target_streak,
                    self.spec.continuous_target_occurrence
                );
            }
            StatusClass::Pending => {
                run.target_streak = 0;
                tracing::debug!("{} is still {}", self.handle, snapshot.status);
            }
            StatusClass::Unexpected => {
                return Err(WaitError::UnexpectedState {
                    handle: self.handle.to_string(),
                    status: snapshot.status,
                    expected: self.spec.expected(),
                    elapsed: run.elapsed(),
                });
            }
        }

        run.last = Some(snapshot);
        Ok(None)
    }

    fn on_not_found(&self, run: &mut Run) -> Result<Option<StatusSnapshot>> {
        run.target_streak = 0;

        match self.spec.not_found {
            NotFoundPolicy::Success => {
                tracing::info!("{} is gone after {:?}", self.handle, run.elapsed());
                Ok(Some(StatusSnapshot::absent()))
            }
            NotFoundPolicy::Failure => Err(WaitError::NotFoundTerminal {
                handle: self.handle.to_string(),
                elapsed: run.elapsed(),
            }),
            NotFoundPolicy::ContinuePolling => {
                run.not_found_streak += 1;
                if let Some(checks) = self.spec.not_found_checks
                    && run.not_found_streak >= checks
                {
                    tracing::debug!(
                        "{} still not found after {} consecutive checks",
                        self.handle,
                        run.not_found_streak
                    );
                    return Err(WaitError::NotFoundTerminal {
                        handle: self.handle.to_string(),
                        elapsed: run.elapsed(),
                    });
                }
                tracing::debug!("{} not visible yet, continuing", self.handle);
                run.last = Some(StatusSnapshot::absent());
                Ok(None)
            }
        }
    }

    fn fatal(&self, run: &Run, error: P::Error) -> WaitError {
        WaitError::Fatal {
            handle: self.handle.to_string(),
            elapsed: run.elapsed(),
            last_status: run.last_status(),
            source: Box::new(error),
        }
    }

    fn timed_out(&self, run: &Run) -> WaitError {
        WaitError::TimedOut {
            handle: self.handle.to_string(),
            timeout: self.spec.timeout,
            elapsed: run.elapsed(),
            expected: self.spec.goal(),
            last: run.last.clone().map(Box::new),
            last_error: run.last_error.clone(),
        }
    }

    fn cancelled(&self, elapsed: Duration, last_status: Option<String>) -> WaitError {
        tracing::info!("Wait for {} cancelled", self.handle);
        WaitError::Cancelled {
            handle: self.handle.to_string(),
            elapsed,
            last_status,
        }
    }

    fn interrupted(&self, run: &Run, interrupt: Interrupt) -> WaitError {
        match interrupt {
            Interrupt::Deadline => self.timed_out(run),
            Interrupt::Cancelled => self.cancelled(run.elapsed(), run.last_status()),
        }
    }

    /// One probe call, cut short by the deadline or by cancellation
    async fn probe_once(&self, run: &mut Run) -> Result<PollResult<P::Error>> {
        if self.is_cancelled() {
            return Err(self.cancelled(run.elapsed(), run.last_status()));
        }

        run.probes += 1;
        tracing::debug!("Probing {} (attempt {})", self.handle, run.probes);

        let deadline = run.deadline;
        let outcome = tokio::select! {
            biased;
            _ = wait_cancelled(self.cancel.as_ref()) => Err(Interrupt::Cancelled),
            result = tokio::time::timeout_at(deadline, self.probe.probe(self.handle)) => {
                result.map_err(|_| Interrupt::Deadline)
            }
        };

        outcome.map_err(|interrupt| {
            if matches!(interrupt, Interrupt::Deadline) {
                run.last_error = Some("probe did not complete before the deadline".to_string());
            }
            self.interrupted(run, interrupt)
        })
    }

    /// Sleep until the next probe, never past the deadline
    async fn pause(&self, run: &mut Run) -> Result<()> {
        let elapsed = run.elapsed();
        if elapsed >= self.spec.timeout {
            return Err(self.timed_out(run));
        }

        let delay = self
            .spec
            .backoff
            .delay(run.sleeps)
            .min(self.spec.timeout - elapsed);
        run.sleeps += 1;

        let interrupt = tokio::select! {
            biased;
            _ = wait_cancelled(self.cancel.as_ref()) => Some(Interrupt::Cancelled),
            _ = tokio::time::sleep(delay) => None,
        };
        if let Some(interrupt) = interrupt {
            return Err(self.interrupted(run, interrupt));
        }

        if run.elapsed() >= self.spec.timeout {
            return Err(self.timed_out(run));
        }
        Ok(())
    }

    /// Pause before the first probe; a shared clock caps it at the deadline
    async fn initial_pause(&self) -> Result<()> {
        let mut delay = self.spec.initial_delay;
        if let Some(started) = self.clock {
            let deadline = started + self.spec.timeout;
            delay = delay.min(deadline.saturating_duration_since(Instant::now()));
        }
        if delay.is_zero() {
            return Ok(());
        }

        tracing::debug!("Waiting {:?} before first probe of {}", delay, self.handle);
        let started = Instant::now();
        tokio::select! {
            biased;
            _ = wait_cancelled(self.cancel.as_ref()) => {
                Err(self.cancelled(started.elapsed(), None))
            }
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.is_cancelled())
    }
}

/// Resolves when `cancel` fires; never resolves without a token
pub(crate) async fn wait_cancelled(cancel: Option<&CancellationToken>) {
    match cancel {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}
