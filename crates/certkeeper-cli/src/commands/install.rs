//! Install command - deploy cert-manager unless it is already available

use console::style;

use super::Context;
use crate::error::Result;

/// Run the install command
pub async fn run(ctx: &Context) -> Result<()> {
    let orchestrator = ctx.orchestrator().await?;
    println!(
        "{} Ensuring cert-manager {} is installed",
        style("→").blue().bold(),
        style(orchestrator.version()).yellow()
    );

    orchestrator.ensure_installed().await?;

    println!("{} cert-manager is available", style("✓").green().bold());
    Ok(())
}
