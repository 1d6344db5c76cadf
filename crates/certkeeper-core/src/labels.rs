//! Provenance labels and version annotations written on managed objects
//!
//! The keys are shared with clusterctl so installs made by either tool are
//! recognised by the other.

use crate::resource::ManagedResource;

/// Marks an object as created by the lifecycle manager
pub const MANAGED_BY_LABEL: &str = "clusterctl.cluster.x-k8s.io";

/// Selects the add-on's objects in list queries
pub const CORE_LABEL: &str = "clusterctl.cluster.x-k8s.io/core";

/// Value of [`CORE_LABEL`] for cert-manager objects
pub const CORE_LABEL_CERT_MANAGER: &str = "cert-manager";

/// Version the object was installed at
pub const VERSION_ANNOTATION: &str = "cert-manager.clusterctl.cluster.x-k8s.io/version";

/// Older spelling of [`VERSION_ANNOTATION`], read but never written
pub const LEGACY_VERSION_ANNOTATION: &str = "certmanager.clusterctl.cluster.x-k8s.io/version";

/// Version assumed for objects carrying no version annotation at all
pub const BASELINE_VERSION: &str = "v0.11.0";

/// Label selector matching every managed cert-manager object
pub fn provenance_selector() -> std::collections::BTreeMap<String, String> {
    [(CORE_LABEL.to_string(), CORE_LABEL_CERT_MANAGER.to_string())]
        .into_iter()
        .collect()
}

/// Add the provenance labels to every object
pub fn add_provenance_labels(objects: &mut [ManagedResource]) {
    for obj in objects {
        obj.set_label(MANAGED_BY_LABEL, "");
        obj.set_label(CORE_LABEL, CORE_LABEL_CERT_MANAGER);
    }
}

/// Stamp every object with the version it is installed at
pub fn add_version_annotation(objects: &mut [ManagedResource], version: &str) {
    for obj in objects {
        obj.set_annotation(VERSION_ANNOTATION, version);
    }
}

/// Effective version recorded on an object, primary key first
pub fn recorded_version(obj: &ManagedResource) -> Option<&str> {
    obj.annotation(VERSION_ANNOTATION)
        .or_else(|| obj.annotation(LEGACY_VERSION_ANNOTATION))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_labels_and_annotation() {
        let mut objs = vec![
            ManagedResource::new("v1", "Namespace", "cert-manager"),
            ManagedResource::new("apps/v1", "Deployment", "cert-manager")
                .in_namespace("cert-manager")
                .with_label("app", "cert-manager"),
        ];

        add_provenance_labels(&mut objs);
        add_version_annotation(&mut objs, "v1.16.3");

        for obj in &objs {
            assert_eq!(obj.labels().get(MANAGED_BY_LABEL).map(String::as_str), Some(""));
            assert_eq!(
                obj.labels().get(CORE_LABEL).map(String::as_str),
                Some(CORE_LABEL_CERT_MANAGER)
            );
            assert_eq!(obj.annotation(VERSION_ANNOTATION), Some("v1.16.3"));
            assert_eq!(obj.annotation(LEGACY_VERSION_ANNOTATION), None);
        }
        assert_eq!(objs[1].labels().get("app").map(String::as_str), Some("cert-manager"));
    }

    #[test]
    fn test_recorded_version_prefers_primary_key() {
        let both = ManagedResource::new("v1", "Service", "webhook")
            .with_annotation(VERSION_ANNOTATION, "v1.9.0")
            .with_annotation(LEGACY_VERSION_ANNOTATION, "v0.16.1");
        assert_eq!(recorded_version(&both), Some("v1.9.0"));

        let legacy = ManagedResource::new("v1", "Service", "webhook")
            .with_annotation(LEGACY_VERSION_ANNOTATION, "v0.16.1");
        assert_eq!(recorded_version(&legacy), Some("v0.16.1"));

        let none = ManagedResource::new("v1", "Service", "webhook");
        assert_eq!(recorded_version(&none), None);
    }

    #[test]
    fn test_provenance_selector() {
        let selector = provenance_selector();
        assert_eq!(selector.len(), 1);
        assert_eq!(selector.get(CORE_LABEL).map(String::as_str), Some("cert-manager"));
    }
}
