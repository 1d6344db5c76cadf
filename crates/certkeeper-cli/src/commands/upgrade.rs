//! Upgrade command - bring a certkeeper-managed cert-manager up to date

use console::style;

use super::Context;
use crate::error::Result;

/// Run the upgrade command
pub async fn run(ctx: &Context) -> Result<()> {
    let orchestrator = ctx.orchestrator().await?;
    println!(
        "{} Ensuring cert-manager is at version {}",
        style("→").blue().bold(),
        style(orchestrator.version()).yellow()
    );

    orchestrator.ensure_latest_version().await?;

    println!("{} Done", style("✓").green().bold());
    Ok(())
}
