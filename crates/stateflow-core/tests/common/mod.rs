#![allow(dead_code)]

use async_trait::async_trait;
use stateflow_core::{
    ErrorKind, Mutation, PollResult, ResourceHandle, StatusProbe, StatusSnapshot,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Error with a fixed classification
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct TestError {
    pub kind: ErrorKind,
    pub message: String,
}

impl TestError {
    pub fn new(kind: ErrorKind, message: &str) -> Self {
        Self {
            kind,
            message: message.to_string(),
        }
    }
}

/// One scripted probe answer
#[derive(Debug, Clone)]
pub enum Step {
    Status(&'static str),
    NotFound,
    Error(ErrorKind, &'static str),
    /// Never answers within any reasonable timeout
    Hang,
}

/// Probe replaying a script; the last step repeats forever
pub struct ScriptedProbe {
    steps: Mutex<VecDeque<Step>>,
    last: Mutex<Option<Step>>,
    probes: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            last: Mutex::new(None),
            probes: AtomicUsize::new(0),
        }
    }

    pub fn statuses(statuses: &[&'static str]) -> Self {
        Self::new(statuses.iter().map(|s| Step::Status(*s)).collect())
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Step {
        let mut steps = self.steps.lock().unwrap();
        let mut last = self.last.lock().unwrap();
        if let Some(step) = steps.pop_front() {
            *last = Some(step.clone());
            return step;
        }
        last.clone().unwrap_or(Step::NotFound)
    }
}

#[async_trait]
impl StatusProbe for ScriptedProbe {
    type Error = TestError;

    async fn probe(&self, _handle: &ResourceHandle) -> PollResult<TestError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let step = self.next_step();
        match step {
            Step::Status(status) => PollResult::Found(StatusSnapshot::with_status(status)),
            Step::NotFound => PollResult::NotFound,
            Step::Error(kind, message) => PollResult::Error(TestError::new(kind, message)),
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                PollResult::NotFound
            }
        }
    }

    fn classify(&self, error: &TestError) -> ErrorKind {
        error.kind
    }
}

/// In-memory control plane whose status moves when mutations are applied
pub struct FakeControlPlane {
    status: Mutex<Option<String>>,
    upcoming: Mutex<VecDeque<Option<String>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeControlPlane {
    pub fn new(status: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            status: Mutex::new(status.map(str::to_string)),
            upcoming: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Statuses the next probes will observe, in order (`None` = gone)
    pub fn schedule(&self, transitions: &[Option<&str>]) {
        let mut upcoming = self.upcoming.lock().unwrap();
        upcoming.extend(transitions.iter().map(|s| s.map(str::to_string)));
    }

    /// Mutation that records its name and schedules `transitions`
    pub fn mutation(self: &Arc<Self>, name: &str, transitions: &[Option<&str>]) -> FakeMutation {
        FakeMutation {
            plane: self.clone(),
            name: name.to_string(),
            transitions: transitions.iter().map(|s| s.map(str::to_string)).collect(),
            failures: Mutex::new(VecDeque::new()),
        }
    }
}

#[async_trait]
impl StatusProbe for FakeControlPlane {
    type Error = TestError;

    async fn probe(&self, _handle: &ResourceHandle) -> PollResult<TestError> {
        let mut status = self.status.lock().unwrap();
        if let Some(next) = self.upcoming.lock().unwrap().pop_front() {
            *status = next;
        }
        match status.as_deref() {
            Some(s) => PollResult::Found(StatusSnapshot::with_status(s)),
            None => PollResult::NotFound,
        }
    }

    fn classify(&self, error: &TestError) -> ErrorKind {
        error.kind
    }
}

pub struct FakeMutation {
    plane: Arc<FakeControlPlane>,
    name: String,
    transitions: Vec<Option<String>>,
    failures: Mutex<VecDeque<TestError>>,
}

impl FakeMutation {
    /// Fail the first calls with these errors before succeeding
    pub fn failing_first(self, errors: Vec<TestError>) -> Self {
        *self.failures.lock().unwrap() = errors.into();
        self
    }
}

#[async_trait]
impl Mutation for FakeMutation {
    type Error = TestError;

    async fn apply(&self, _handle: &ResourceHandle) -> Result<(), TestError> {
        self.plane.calls.lock().unwrap().push(self.name.clone());
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        self.plane
            .upcoming
            .lock()
            .unwrap()
            .extend(self.transitions.iter().cloned());
        Ok(())
    }
}
