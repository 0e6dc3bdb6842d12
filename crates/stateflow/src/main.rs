mod commands;
mod utils;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "stateflow")]
#[command(
    about = "Wait for remote resources to settle, and drive them through multi-step transitions",
    long_about = None
)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where the resource lives and how to read its status
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Resource path relative to the base URL (e.g. /servers/113200001)
    pub path: String,

    /// API base URL
    #[arg(long, env = "STATEFLOW_BASE_URL")]
    pub base_url: String,

    /// Bearer token
    #[arg(long, env = "STATEFLOW_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Resource type, used to pick per-type settings
    #[arg(short = 't', long = "type", default_value = "resource")]
    pub resource_type: String,

    /// JSON pointer to the status field
    #[arg(long, default_value = "/status")]
    pub status_pointer: String,

    /// JSON pointer to the resource inside the response body
    #[arg(long)]
    pub envelope: Option<String>,

    /// Overall timeout in seconds (defaults to the configured operation timeout)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll a resource until it reaches a target status
    Wait {
        #[command(flatten)]
        target: TargetArgs,

        /// Target status (repeatable)
        #[arg(long = "target", value_name = "STATUS")]
        targets: Vec<String>,

        /// Transitional status (repeatable)
        #[arg(long = "pending", value_name = "STATUS")]
        pending: Vec<String>,

        /// Treat statuses that are neither target nor pending as pending
        #[arg(long)]
        unknown_as_pending: bool,

        /// What a 404 means: success, failure or continue
        #[arg(long, default_value = "failure")]
        not_found: String,

        /// Operation whose configured timeout applies: create, read, update, delete
        #[arg(long, default_value = "create")]
        operation: String,
    },
    /// Delete a resource, disabling it first when it must be disabled before deletion
    Delete {
        #[command(flatten)]
        target: TargetArgs,

        /// Path of the disable request; enables the disable phase
        #[arg(long)]
        disable_path: Option<String>,

        /// HTTP method of the disable request
        #[arg(long, default_value = "PUT")]
        disable_method: String,

        /// Status from which the resource may be disabled
        #[arg(long, default_value = "ENABLED")]
        enabled_status: String,

        /// Status while disabling is in progress
        #[arg(long, default_value = "DISABLING")]
        disabling_status: String,

        /// Status once disabled
        #[arg(long, default_value = "DISABLED")]
        disabled_status: String,

        /// Status while deletion is in progress
        #[arg(long, default_value = "DELETING")]
        deleting_status: String,
    },
    /// Print the effective settings as YAML
    Config,
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    utils::init_logging(cli.verbose);

    match cli.command {
        Commands::Version => {
            println!("stateflow {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Config => {
            commands::config::handle()?;
        }
        Commands::Wait {
            target,
            targets,
            pending,
            unknown_as_pending,
            not_found,
            operation,
        } => {
            commands::wait::handle(commands::wait::WaitOptions {
                target,
                targets,
                pending,
                unknown_as_pending,
                not_found,
                operation,
            })
            .await?;
        }
        Commands::Delete {
            target,
            disable_path,
            disable_method,
            enabled_status,
            disabling_status,
            disabled_status,
            deleting_status,
        } => {
            commands::delete::handle(commands::delete::DeleteOptions {
                target,
                disable_path,
                disable_method,
                enabled_status,
                disabling_status,
                disabled_status,
                deleting_status,
            })
            .await?;
        }
    }

    Ok(())
}
