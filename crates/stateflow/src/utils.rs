use crate::TargetArgs;
use colored::Colorize;
use stateflow_core::{CancellationToken, ResourceHandle, StatusSnapshot, WaitError};
use stateflow_http::{HttpClient, HttpFinder, HttpProbe};
use std::time::Duration;

/// Log to stderr; RUST_LOG wins over `--verbose`
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Token cancelled on the first Ctrl-C
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Interrupted, stopping...".yellow());
            trigger.cancel();
        }
    });
    token
}

/// Escape a literal path so it survives template expansion
pub fn literal_path(path: &str) -> String {
    path.replace('{', "{{").replace('}', "}}")
}

pub fn handle_for(target: &TargetArgs) -> ResourceHandle {
    ResourceHandle::new(&target.resource_type, target.path.trim_matches('/'))
}

pub fn client_for(target: &TargetArgs) -> HttpClient {
    let client = HttpClient::new(&target.base_url).with_request_timeout(Duration::from_secs(30));
    match &target.token {
        Some(token) => client.with_token(token),
        None => client,
    }
}

pub fn probe_for(target: &TargetArgs, client: HttpClient) -> HttpProbe {
    let mut finder = HttpFinder::new(client, literal_path(&target.path))
        .with_status_pointer(&target.status_pointer);
    if let Some(envelope) = &target.envelope {
        finder = finder.with_envelope(envelope);
    }
    finder.into_probe()
}

pub fn print_snapshot(handle: &ResourceHandle, snapshot: &StatusSnapshot) {
    if snapshot.absent {
        println!("{} {} is gone", "✓".green(), handle.to_string().cyan());
    } else {
        println!(
            "{} {} is {}",
            "✓".green(),
            handle.to_string().cyan(),
            snapshot.status.bold()
        );
    }
}

pub fn print_failure(error: &WaitError) {
    let headline = match error.root() {
        WaitError::TimedOut { .. } => "Timed out",
        WaitError::Cancelled { .. } => "Cancelled",
        WaitError::UnexpectedState { .. } => "Unexpected state",
        WaitError::NotFoundTerminal { .. } => "Not found",
        WaitError::InvalidSpec { .. } => "Invalid request",
        WaitError::Fatal { .. } | WaitError::Phase { .. } => "Failed",
    };
    eprintln!("{} {}", "✗".red(), headline.red().bold());
    eprintln!("  {}", error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_path() {
        assert_eq!(literal_path("/servers/1"), "/servers/1");
        assert_eq!(literal_path("/a/{b}"), "/a/{{b}}");
    }
}
