//! Turning a raw cert-manager manifest into the objects to install

use crate::error::Result;
use crate::images::{CERT_MANAGER_COMPONENT, ImageOverrides, rewrite_images};
use crate::labels::{add_provenance_labels, add_version_annotation};
use crate::manifest::decode_manifest;
use crate::resource::ManagedResource;

/// Decode, apply image overrides, then label and annotate every object
pub fn prepare_components(
    raw: &[u8],
    version: &str,
    overrides: &ImageOverrides,
) -> Result<Vec<ManagedResource>> {
    let mut objects = decode_manifest(raw)?;
    rewrite_images(&mut objects, |image| {
        overrides.alter_image(CERT_MANAGER_COMPONENT, image)
    })?;
    add_provenance_labels(&mut objects);
    add_version_annotation(&mut objects, version);
    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::{ImageOverride, inspect_images};
    use crate::labels::{CORE_LABEL, VERSION_ANNOTATION};

    const MANIFEST: &str = r#"
apiVersion: v1
kind: Namespace
metadata:
  name: cert-manager
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: cert-manager
  namespace: cert-manager
spec:
  template:
    spec:
      containers:
        - name: controller
          image: quay.io/jetstack/cert-manager-controller:v1.16.3
"#;

    #[test]
    fn test_prepare_components() {
        let overrides = ImageOverrides::new().with(
            CERT_MANAGER_COMPONENT,
            ImageOverride {
                repository: Some("mirror.local".to_string()),
                tag: None,
            },
        );

        let objs = prepare_components(MANIFEST.as_bytes(), "v1.16.3", &overrides).unwrap();
        assert_eq!(objs.len(), 2);
        for obj in &objs {
            assert_eq!(obj.labels().get(CORE_LABEL).map(String::as_str), Some("cert-manager"));
            assert_eq!(obj.annotation(VERSION_ANNOTATION), Some("v1.16.3"));
        }
        assert_eq!(
            inspect_images(&objs),
            vec!["mirror.local/cert-manager-controller:v1.16.3"]
        );
    }

    #[test]
    fn test_prepare_components_propagates_decode_errors() {
        assert!(prepare_components(b"- a\n- b\n", "v1.16.3", &ImageOverrides::new()).is_err());
    }
}
