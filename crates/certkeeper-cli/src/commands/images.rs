//! Images command - list the container images an install would pull

use super::Context;
use crate::error::Result;

/// Run the images command
pub async fn run(ctx: &Context) -> Result<()> {
    let orchestrator = ctx.orchestrator().await?;
    let images = orchestrator.images().await?;
    if images.is_empty() {
        tracing::info!("cert-manager namespace already exists, no images to pull");
    }
    for image in images {
        println!("{}", image);
    }
    Ok(())
}
