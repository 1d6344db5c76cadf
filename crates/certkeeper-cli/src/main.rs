//! certkeeper - install and upgrade cert-manager in a Kubernetes cluster

mod commands;
mod error;
mod exit_codes;

use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use certkeeper_kube::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::commands::Context;
use crate::error::{CliError, Result};

#[derive(Parser)]
#[command(name = "certkeeper")]
#[command(author, version, about = "Install and upgrade cert-manager in a Kubernetes cluster")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file [default: ~/.config/certkeeper/config.yaml]
    #[arg(long, global = true, env = "CERTKEEPER_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the kubeconfig file
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long, global = true)]
    context: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Install cert-manager unless a working one is already present
    Install,

    /// Upgrade a certkeeper-managed cert-manager to the configured version
    Upgrade,

    /// Show whether an upgrade is due without changing the cluster
    Plan {
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the container images an install would pull
    Images,
}

#[tokio::main]
async fn main() -> ExitCode {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(e) => {
            let code = e.exit_code();
            eprintln!("{:?}", miette::Report::new(e));
            ExitCode::from(code as u8)
        }
    }
}

/// Logs go to stderr so `plan --json` and `images` output stays parseable
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,certkeeper={level},certkeeper_core={level},certkeeper_repo={level},certkeeper_kube={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose > 0)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let token = CancellationToken::new();
    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling...");
            interrupt.cancel();
        }
    });

    let ctx = Context {
        config_path: cli.config,
        kubeconfig: cli.kubeconfig,
        kube_context: cli.context,
        token,
    };

    match cli.command {
        Commands::Install => cancellable(&ctx.token, commands::install::run(&ctx)).await,
        Commands::Upgrade => cancellable(&ctx.token, commands::upgrade::run(&ctx)).await,
        Commands::Plan { json } => cancellable(&ctx.token, commands::plan::run(&ctx, json)).await,
        Commands::Images => cancellable(&ctx.token, commands::images::run(&ctx)).await,
    }
}

/// Stop waiting on `command` as soon as the token fires
async fn cancellable(token: &CancellationToken, command: impl Future<Output = Result<()>>) -> Result<()> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(CliError::Cancelled),
        result = command => result,
    }
}
