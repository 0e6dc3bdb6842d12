use crate::TargetArgs;
use crate::utils;
use anyhow::Context;
use colored::Colorize;
use stateflow_core::{NotFoundPolicy, Operation, wait_for_with_cancel};
use std::time::Duration;

pub struct WaitOptions {
    pub target: TargetArgs,
    pub targets: Vec<String>,
    pub pending: Vec<String>,
    pub unknown_as_pending: bool,
    pub not_found: String,
    pub operation: String,
}

pub async fn handle(options: WaitOptions) -> anyhow::Result<()> {
    let target = &options.target;

    let operation = Operation::from_str(&options.operation)
        .with_context(|| format!("Unknown operation '{}'", options.operation))?;
    let not_found = NotFoundPolicy::from_str(&options.not_found).with_context(|| {
        format!(
            "Unknown --not-found value '{}' (expected success, failure or continue)",
            options.not_found
        )
    })?;

    let settings = stateflow_config::load_or_default()?;
    let mut spec = settings
        .for_resource(&target.resource_type)
        .wait_spec(operation, options.targets, options.pending)
        .treat_unknown_as_pending(options.unknown_as_pending)
        .with_not_found(not_found);
    if let Some(secs) = target.timeout_secs {
        spec = spec.with_timeout(Duration::from_secs(secs));
    }

    let handle = utils::handle_for(target);
    let probe = utils::probe_for(target, utils::client_for(target));

    if !target.json {
        println!(
            "{} {} (timeout {}s)",
            "Waiting for".blue(),
            handle.to_string().cyan(),
            spec.timeout.as_secs()
        );
    }

    let cancel = utils::cancel_on_ctrl_c();
    match wait_for_with_cancel(&probe, &handle, &spec, &cancel).await {
        Ok(snapshot) => {
            if target.json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                utils::print_snapshot(&handle, &snapshot);
            }
            Ok(())
        }
        Err(e) => {
            utils::print_failure(&e);
            Err(e.into())
        }
    }
}
