//! Upgrade decision between the installed and the desired cert-manager

use certkeeper_core::labels::{BASELINE_VERSION, recorded_version};
use certkeeper_core::{ManagedResource, VersionOrdering, VersionTag};
use serde::Serialize;

use crate::error::{KubeError, Result};

/// Kinds the API server creates on its own; they never carry our annotations
pub const SERVER_GENERATED_KINDS: &[&str] = &["Endpoints", "EndpointSlice"];

/// Outcome of comparing installed and desired cert-manager
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradePlan {
    /// No managed objects exist; cert-manager must not be touched
    pub externally_managed: bool,
    pub from_version: String,
    pub to_version: String,
    pub should_upgrade: bool,
}

impl UpgradePlan {
    /// Plan for a cert-manager this tool does not manage
    pub fn externally_managed() -> Self {
        Self {
            externally_managed: true,
            ..Default::default()
        }
    }
}

/// Decide whether the installed objects need to be replaced by `desired`
///
/// Installed objects are scanned in order and the first divergence decides:
/// - no version annotation: installed before versions were recorded, upgrade
/// - older, or same version with different build metadata: upgrade
/// - same version: upgrade only if the number of objects changed
/// - newer: keep scanning
pub fn determine_upgrade(
    desired_version: &str,
    installed: &[ManagedResource],
    desired: &[ManagedResource],
) -> Result<UpgradePlan> {
    let desired_tag = VersionTag::parse_tolerant(desired_version)?;

    let installed: Vec<&ManagedResource> = installed
        .iter()
        .filter(|obj| !SERVER_GENERATED_KINDS.contains(&obj.kind.as_str()))
        .collect();

    if installed.is_empty() {
        return Ok(UpgradePlan::externally_managed());
    }

    let mut current_version = String::new();
    let mut should_upgrade = false;

    for obj in &installed {
        let Some(version) = recorded_version(obj) else {
            current_version = BASELINE_VERSION.to_string();
            should_upgrade = true;
            break;
        };

        let tag = VersionTag::parse_tolerant(version).map_err(|e| match KubeError::from(e) {
            KubeError::InvalidVersion { value, reason } => KubeError::InvalidVersion {
                value,
                reason: format!("{} (recorded on {})", reason, obj.key()),
            },
            other => other,
        })?;
        current_version = version.to_string();

        match tag.compare(&desired_tag) {
            VersionOrdering::Less | VersionOrdering::EqualDifferentMetadata => {
                should_upgrade = true;
                break;
            }
            VersionOrdering::EqualExact => {
                if installed.len() != desired.len() {
                    should_upgrade = true;
                    break;
                }
            }
            VersionOrdering::Greater => {}
        }
    }

    Ok(UpgradePlan {
        externally_managed: false,
        from_version: current_version,
        to_version: desired_version.to_string(),
        should_upgrade,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use certkeeper_core::labels::{LEGACY_VERSION_ANNOTATION, VERSION_ANNOTATION};

    fn obj(kind: &str, name: &str) -> ManagedResource {
        ManagedResource::new("v1", kind, name).in_namespace("cert-manager")
    }

    fn at(version: &str, name: &str) -> ManagedResource {
        obj("ConfigMap", name).with_annotation(VERSION_ANNOTATION, version)
    }

    fn desired(count: usize) -> Vec<ManagedResource> {
        (0..count).map(|i| at("v1.9.0", &format!("d{i}"))).collect()
    }

    #[test]
    fn test_missing_annotation_forces_upgrade() {
        let installed = vec![at("v1.9.0", "a"), obj("Secret", "b"), at("v2.0.0", "c")];
        let plan = determine_upgrade("v1.9.0", &installed, &desired(3)).unwrap();
        assert_eq!(plan.from_version, "v0.11.0");
        assert!(plan.should_upgrade);
        assert!(!plan.externally_managed);
    }

    #[test]
    fn test_nothing_installed_is_externally_managed() {
        for version in ["v1.9.0", "v0.1.0"] {
            let plan = determine_upgrade(version, &[], &desired(2)).unwrap();
            assert_eq!(plan, UpgradePlan::externally_managed());
        }

        // only server generated objects
        let installed = vec![obj("Endpoints", "cert-manager"), obj("EndpointSlice", "cert-manager-x")];
        let plan = determine_upgrade("v1.9.0", &installed, &desired(2)).unwrap();
        assert!(plan.externally_managed);
        assert!(!plan.should_upgrade);
    }

    #[test]
    fn test_same_version_same_count_is_up_to_date() {
        let installed = vec![at("v1.9.0", "a"), at("v1.9.0", "b")];
        let plan = determine_upgrade("v1.9.0", &installed, &desired(2)).unwrap();
        assert_eq!(
            plan,
            UpgradePlan {
                externally_managed: false,
                from_version: "v1.9.0".to_string(),
                to_version: "v1.9.0".to_string(),
                should_upgrade: false,
            }
        );
    }

    #[test]
    fn test_same_version_different_count_upgrades() {
        let installed = vec![at("v1.9.0", "a"), at("v1.9.0", "b")];
        let plan = determine_upgrade("v1.9.0", &installed, &desired(3)).unwrap();
        assert!(plan.should_upgrade);
    }

    #[test]
    fn test_server_generated_kinds_are_not_counted() {
        let installed = vec![at("v1.9.0", "a"), obj("Endpoints", "cert-manager"), at("v1.9.0", "b")];
        let plan = determine_upgrade("v1.9.0", &installed, &desired(2)).unwrap();
        assert!(!plan.should_upgrade);
    }

    #[test]
    fn test_older_version_upgrades() {
        let installed = vec![at("v1.8.0", "a")];
        let plan = determine_upgrade("v1.9.0", &installed, &desired(1)).unwrap();
        assert_eq!(plan.from_version, "v1.8.0");
        assert_eq!(plan.to_version, "v1.9.0");
        assert!(plan.should_upgrade);
    }

    #[test]
    fn test_build_metadata_difference_upgrades() {
        let installed = vec![at("v1.9.0+buildX", "a")];
        let plan = determine_upgrade("v1.9.0", &installed, &desired(1)).unwrap();
        assert_eq!(plan.from_version, "v1.9.0+buildX");
        assert!(plan.should_upgrade);
    }

    #[test]
    fn test_first_divergence_wins() {
        // newer objects are skipped over, the older one decides
        let installed = vec![at("v2.0.0", "a"), at("v1.8.0", "b"), at("v1.9.0", "c")];
        let plan = determine_upgrade("v1.9.0", &installed, &desired(3)).unwrap();
        assert_eq!(plan.from_version, "v1.8.0");
        assert!(plan.should_upgrade);

        // all newer: nothing to do, the last version seen is reported
        let installed = vec![at("v2.0.0", "a"), at("v2.1.0", "b")];
        let plan = determine_upgrade("v1.9.0", &installed, &desired(5)).unwrap();
        assert_eq!(plan.from_version, "v2.1.0");
        assert!(!plan.should_upgrade);
    }

    #[test]
    fn test_legacy_annotation_is_read() {
        let installed = vec![obj("ConfigMap", "a").with_annotation(LEGACY_VERSION_ANNOTATION, "v1.8.0")];
        let plan = determine_upgrade("v1.9.0", &installed, &desired(1)).unwrap();
        assert_eq!(plan.from_version, "v1.8.0");
        assert!(plan.should_upgrade);
    }

    #[test]
    fn test_invalid_versions() {
        assert!(matches!(
            determine_upgrade("not-a-version", &[], &[]),
            Err(KubeError::InvalidVersion { .. })
        ));

        let installed = vec![at("garbage", "broken")];
        let err = determine_upgrade("v1.9.0", &installed, &desired(1)).unwrap_err();
        assert!(err.to_string().contains("ConfigMap cert-manager/broken"));
    }

    #[test]
    fn test_plan_serializes_camel_case() {
        let plan = UpgradePlan {
            externally_managed: false,
            from_version: "v1.8.0".to_string(),
            to_version: "v1.9.0".to_string(),
            should_upgrade: true,
        };
        assert_eq!(
            serde_json::to_value(&plan).unwrap(),
            serde_json::json!({
                "externallyManaged": false,
                "fromVersion": "v1.8.0",
                "toVersion": "v1.9.0",
                "shouldUpgrade": true,
            })
        );
    }
}
