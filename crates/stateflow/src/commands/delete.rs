use crate::TargetArgs;
use crate::utils;
use anyhow::Context;
use colored::Colorize;
use stateflow_core::{NotFoundPolicy, Operation, Phase, PhaseOutcome, Reconciler};
use stateflow_http::{HttpError, HttpMutation, Method};
use std::time::Duration;

pub struct DeleteOptions {
    pub target: TargetArgs,
    pub disable_path: Option<String>,
    pub disable_method: String,
    pub enabled_status: String,
    pub disabling_status: String,
    pub disabled_status: String,
    pub deleting_status: String,
}

pub async fn handle(options: DeleteOptions) -> anyhow::Result<()> {
    let target = &options.target;
    let settings = stateflow_config::load_or_default()?;
    let defaults = settings.for_resource(&target.resource_type);

    let handle = utils::handle_for(target);
    let client = utils::client_for(target);
    let probe = utils::probe_for(target, client.clone());

    let mut phases: Vec<Phase<HttpError>> = Vec::new();

    if let Some(disable_path) = &options.disable_path {
        let method = Method::from_bytes(options.disable_method.to_uppercase().as_bytes())
            .with_context(|| format!("Invalid HTTP method '{}'", options.disable_method))?;
        let mut wait = defaults.wait_spec(
            Operation::Update,
            [options.disabled_status.clone()],
            [options.disabling_status.clone()],
        );
        if let Some(secs) = target.timeout_secs {
            wait = wait.with_timeout(Duration::from_secs(secs));
        }
        phases.push(
            Phase::new("disable", wait)
                .when([options.enabled_status.clone()])
                .with_mutation(HttpMutation::new(
                    client.clone(),
                    method,
                    utils::literal_path(disable_path),
                )),
        );
    }

    let mut wait = defaults
        .wait_spec(
            Operation::Delete,
            Vec::<String>::new(),
            [options.deleting_status.clone()],
        )
        .with_not_found(NotFoundPolicy::Success);
    if let Some(secs) = target.timeout_secs {
        wait = wait.with_timeout(Duration::from_secs(secs));
    }
    let mut delete = Phase::new("delete", wait)
        .with_mutation(HttpMutation::delete(client, utils::literal_path(&target.path)));
    if options.disable_path.is_some() {
        delete = delete.when([options.disabled_status.clone()]);
    }
    phases.push(delete);

    if !target.json {
        println!("{} {}", "Deleting".yellow(), handle.to_string().cyan());
    }

    let mut reconciler =
        Reconciler::new(&probe, &handle).with_cancellation(utils::cancel_on_ctrl_c());
    for phase in phases {
        reconciler = reconciler.phase(phase);
    }

    let report = match reconciler.run_with_report().await {
        Ok(report) => report,
        Err(e) => {
            utils::print_failure(&e);
            return Err(e.into());
        }
    };

    if target.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for record in &report.phases {
        let mark = match record.outcome {
            PhaseOutcome::Applied => "✓".green(),
            PhaseOutcome::Resumed => "↻".blue(),
            PhaseOutcome::Skipped => "–".dimmed(),
        };
        println!(
            "  {} {} ({}, was {})",
            mark,
            record.name.bold(),
            record.outcome,
            record.observed.as_deref().unwrap_or("absent")
        );
    }
    utils::print_snapshot(&handle, &report.snapshot);
    println!("{}", report.to_string().dimmed());

    Ok(())
}
