//! Container image overrides
//!
//! Overrides let an operator pull the add-on from a mirror registry or pin a
//! different tag. They are configured per component, with `all` as fallback.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{CoreError, Result};
use crate::resource::ManagedResource;

/// Component name matching every image
pub const ALL_COMPONENTS: &str = "all";

/// Component name used for the add-on's own images
pub const CERT_MANAGER_COMPONENT: &str = "cert-manager";

/// Paths (from the object root) at which a pod spec can live
const POD_SPEC_PATHS: &[&[&str]] = &[
    &["spec"],
    &["spec", "template", "spec"],
    &["spec", "jobTemplate", "spec", "template", "spec"],
];

const CONTAINER_LISTS: &[&str] = &["initContainers", "containers"];

/// Replacement repository and/or tag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl ImageOverride {
    pub fn is_empty(&self) -> bool {
        self.repository.is_none() && self.tag.is_none()
    }

    /// Apply this override to an image reference
    pub fn apply(&self, image: &str) -> Result<String> {
        let mut reference = ImageReference::parse(image)?;
        if let Some(repository) = &self.repository {
            reference.repository = repository.trim_end_matches('/').to_string();
        }
        if let Some(tag) = &self.tag {
            reference.tag = Some(tag.clone());
            reference.digest = None;
        }
        Ok(reference.to_string())
    }
}

/// Overrides keyed by component name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageOverrides(BTreeMap<String, ImageOverride>);

impl ImageOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an override (builder style)
    pub fn with(mut self, component: impl Into<String>, image_override: ImageOverride) -> Self {
        self.0.insert(component.into(), image_override);
        self
    }

    /// Effective override for a component; its own fields win over `all`
    pub fn for_component(&self, component: &str) -> ImageOverride {
        let all = self.0.get(ALL_COMPONENTS);
        let specific = self.0.get(component);
        ImageOverride {
            repository: specific
                .and_then(|o| o.repository.clone())
                .or_else(|| all.and_then(|o| o.repository.clone())),
            tag: specific
                .and_then(|o| o.tag.clone())
                .or_else(|| all.and_then(|o| o.tag.clone())),
        }
    }

    /// Map an image reference through the overrides for `component`
    pub fn alter_image(&self, component: &str, image: &str) -> Result<String> {
        let effective = self.for_component(component);
        if effective.is_empty() {
            return Ok(image.to_string());
        }
        effective.apply(image)
    }
}

/// `[repository/]name[:tag][@digest]`
#[derive(Debug, Clone, PartialEq, Eq)]
struct ImageReference {
    repository: String,
    name: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageReference {
    fn parse(image: &str) -> Result<Self> {
        let invalid = |reason: &str| CoreError::InvalidImage {
            image: image.to_string(),
            reason: reason.to_string(),
        };

        let image = image.trim();
        if image.is_empty() {
            return Err(invalid("empty reference"));
        }

        let (rest, digest) = match image.split_once('@') {
            Some((rest, digest)) => (rest, Some(digest.to_string())),
            None => (image, None),
        };

        let (repository, name_and_tag) = match rest.rsplit_once('/') {
            Some((repo, last)) => (repo.to_string(), last),
            None => (String::new(), rest),
        };

        let (name, tag) = match name_and_tag.split_once(':') {
            Some((name, tag)) => (name.to_string(), Some(tag.to_string())),
            None => (name_and_tag.to_string(), None),
        };

        if name.is_empty() {
            return Err(invalid("missing image name"));
        }

        Ok(Self {
            repository,
            name,
            tag,
            digest,
        })
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.repository.is_empty() {
            write!(f, "{}/", self.repository)?;
        }
        f.write_str(&self.name)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}

/// Rewrite every container image in `objects` through `alter`
pub fn rewrite_images<F>(objects: &mut [ManagedResource], mut alter: F) -> Result<()>
where
    F: FnMut(&str) -> Result<String>,
{
    for obj in objects.iter_mut() {
        for path in POD_SPEC_PATHS {
            let Some(pod_spec) = pod_spec_mut(obj, path) else {
                continue;
            };
            for list in CONTAINER_LISTS {
                let Some(containers) = pod_spec.get_mut(*list).and_then(Value::as_array_mut) else {
                    continue;
                };
                for container in containers {
                    if let Some(current) = container.get("image").and_then(Value::as_str) {
                        let altered = alter(current)?;
                        container["image"] = Value::String(altered);
                    }
                }
            }
        }
    }
    Ok(())
}

/// Sorted, de-duplicated container images referenced by `objects`
pub fn inspect_images(objects: &[ManagedResource]) -> Vec<String> {
    let mut images = BTreeSet::new();
    for obj in objects {
        for path in POD_SPEC_PATHS {
            let Some(pod_spec) = pod_spec(obj, path) else {
                continue;
            };
            for list in CONTAINER_LISTS {
                let Some(containers) = pod_spec.get(*list).and_then(Value::as_array) else {
                    continue;
                };
                images.extend(
                    containers
                        .iter()
                        .filter_map(|c| c.get("image").and_then(Value::as_str))
                        .map(str::to_string),
                );
            }
        }
    }
    images.into_iter().collect()
}

fn pod_spec<'a>(obj: &'a ManagedResource, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    rest.iter()
        .try_fold(obj.attribute(first)?, |value, key| value.get(*key))
}

fn pod_spec_mut<'a>(obj: &'a mut ManagedResource, path: &[&str]) -> Option<&'a mut Value> {
    let (first, rest) = path.split_first()?;
    rest.iter()
        .try_fold(obj.attribute_mut(first)?, |value, key| value.get_mut(*key))
}
