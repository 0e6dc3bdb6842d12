//! Wait and reconcile error types

use crate::status::StatusSnapshot;
use std::time::Duration;
use thiserror::Error;

/// Boxed remote error preserved for diagnostics
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Terminal failure of a wait or reconcile run
///
/// Transient errors and "not found, keep polling" results never show up here;
/// the poller absorbs them until the timeout.
#[derive(Error, Debug)]
pub enum WaitError {
    #[error("Invalid wait for {handle}: {reason}")]
    InvalidSpec { handle: String, reason: String },

    #[error("{handle} not found (after {elapsed:?})")]
    NotFoundTerminal { handle: String, elapsed: Duration },

    #[error(
        "{handle} reached unexpected state '{status}' after {elapsed:?} (expected one of: {})",
        .expected.join(", ")
    )]
    UnexpectedState {
        handle: String,
        status: String,
        expected: Vec<String>,
        elapsed: Duration,
    },

    #[error(
        "Timeout after {elapsed:?} waiting for {handle} to reach [{}] (last state: {}){}",
        .expected.join(", "),
        describe_last(.last.as_deref()),
        describe_last_error(.last_error.as_deref())
    )]
    TimedOut {
        handle: String,
        timeout: Duration,
        elapsed: Duration,
        expected: Vec<String>,
        last: Option<Box<StatusSnapshot>>,
        last_error: Option<String>,
    },

    #[error("Non-retryable error for {handle} after {elapsed:?}: {source}")]
    Fatal {
        handle: String,
        elapsed: Duration,
        last_status: Option<String>,
        #[source]
        source: BoxError,
    },

    #[error("Wait for {handle} cancelled after {elapsed:?}")]
    Cancelled {
        handle: String,
        elapsed: Duration,
        last_status: Option<String>,
    },

    #[error("Phase '{phase}' failed: {source}")]
    Phase {
        phase: String,
        #[source]
        source: Box<WaitError>,
    },
}

fn describe_last(last: Option<&StatusSnapshot>) -> String {
    match last {
        Some(snapshot) if snapshot.absent => "not found".to_string(),
        Some(snapshot) => snapshot.status.clone(),
        None => "never observed".to_string(),
    }
}

fn describe_last_error(last_error: Option<&str>) -> String {
    last_error
        .map(|e| format!(", last error: {}", e))
        .unwrap_or_default()
}

impl WaitError {
    /// Strip any phase wrapping
    pub fn root(&self) -> &WaitError {
        match self {
            WaitError::Phase { source, .. } => source.root(),
            other => other,
        }
    }

    /// Name of the failed phase, if this came out of a reconcile run
    pub fn phase(&self) -> Option<&str> {
        match self {
            WaitError::Phase { phase, .. } => Some(phase),
            _ => None,
        }
    }

    pub fn handle(&self) -> &str {
        match self {
            WaitError::InvalidSpec { handle, .. }
            | WaitError::NotFoundTerminal { handle, .. }
            | WaitError::UnexpectedState { handle, .. }
            | WaitError::TimedOut { handle, .. }
            | WaitError::Fatal { handle, .. }
            | WaitError::Cancelled { handle, .. } => handle,
            WaitError::Phase { source, .. } => source.handle(),
        }
    }

    /// Last observed status carried by this error, if any
    pub fn last_status(&self) -> Option<&str> {
        match self.root() {
            WaitError::UnexpectedState { status, .. } => Some(status),
            WaitError::TimedOut { last, .. } => last.as_ref().map(|s| s.status.as_str()),
            WaitError::Fatal { last_status, .. } | WaitError::Cancelled { last_status, .. } => {
                last_status.as_deref()
            }
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), WaitError::TimedOut { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), WaitError::Cancelled { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), WaitError::NotFoundTerminal { .. })
    }

    pub(crate) fn in_phase(self, phase: &str) -> Self {
        WaitError::Phase {
            phase: phase.to_string(),
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, WaitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_names_last_state() {
        let err = WaitError::TimedOut {
            handle: "server:123".to_string(),
            timeout: Duration::from_secs(2),
            elapsed: Duration::from_secs(2),
            expected: vec!["READY".to_string()],
            last: Some(Box::new(StatusSnapshot::with_status("PROVISIONING"))),
            last_error: Some("503 Service Unavailable".to_string()),
        };

        let message = err.to_string();
        assert!(message.contains("server:123"));
        assert!(message.contains("PROVISIONING"));
        assert!(message.contains("503"));
        assert_eq!(err.last_status(), Some("PROVISIONING"));
    }

    #[test]
    fn test_phase_wrapping() {
        let err = WaitError::NotFoundTerminal {
            handle: "bucket:logs".to_string(),
            elapsed: Duration::ZERO,
        }
        .in_phase("disable");

        assert_eq!(err.phase(), Some("disable"));
        assert!(err.is_not_found());
        assert_eq!(err.handle(), "bucket:logs");
        assert!(err.to_string().contains("disable"));
    }

    #[test]
    fn test_fatal_preserves_source() {
        let err = WaitError::Fatal {
            handle: "server:1".to_string(),
            elapsed: Duration::ZERO,
            last_status: Some("up".to_string()),
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "AccessDenied",
            )),
        };

        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("AccessDenied"));
    }
}
