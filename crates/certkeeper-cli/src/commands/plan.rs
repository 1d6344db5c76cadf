//! Plan command - report whether an upgrade is due without touching the cluster

use certkeeper_kube::UpgradePlan;
use console::style;

use super::Context;
use crate::error::{CliError, Result};

/// Run the plan command
pub async fn run(ctx: &Context, json: bool) -> Result<()> {
    let orchestrator = ctx.orchestrator().await?;
    let plan = orchestrator.plan_upgrade().await?;

    if json {
        let output = serde_json::to_string_pretty(&plan)
            .map_err(|e| CliError::other(format!("failed to serialize plan: {}", e)))?;
        println!("{}", output);
        return Ok(());
    }

    let marker = if plan.should_upgrade {
        style("↑").yellow().bold()
    } else {
        style("✓").green().bold()
    };
    println!("{} {}", marker, summary(&plan));
    Ok(())
}

fn summary(plan: &UpgradePlan) -> String {
    if plan.externally_managed {
        return "cert-manager is not managed by certkeeper and will not be modified".to_string();
    }
    if plan.should_upgrade {
        format!(
            "cert-manager will be upgraded from {} to {}",
            plan.from_version, plan.to_version
        )
    } else {
        format!(
            "cert-manager {} is up to date (desired {})",
            plan.from_version, plan.to_version
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary() {
        assert!(summary(&UpgradePlan::externally_managed()).contains("not managed"));

        let upgrade = UpgradePlan {
            externally_managed: false,
            from_version: "v1.8.0".to_string(),
            to_version: "v1.9.0".to_string(),
            should_upgrade: true,
        };
        assert_eq!(
            summary(&upgrade),
            "cert-manager will be upgraded from v1.8.0 to v1.9.0"
        );

        let current = UpgradePlan {
            should_upgrade: false,
            from_version: "v1.9.0".to_string(),
            ..upgrade
        };
        assert_eq!(
            summary(&current),
            "cert-manager v1.9.0 is up to date (desired v1.9.0)"
        );
    }
}
