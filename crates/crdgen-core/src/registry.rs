//! Multi-version API registry.
//!
//! Holds the built resources of every declared API version, designates the
//! hub version, and validates the deprecation policy before any
//! cross-version comparison is made.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use crdgen_model::{GeneratorConfig, ShapeModel};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::builder::{ApiModel, Resource, ResourceBuilder};
use crate::delta::{ResourceDelta, Schema, compute_resource_delta};
use crate::error::{GenerationError, GenerationResult};

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^v(\d+)(?:(alpha|beta)(\d+))?$").expect("static regex is valid")
});

/// Declared API versions of one service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct VersionManifest {
    /// The canonical version every other version converts through.
    pub hub_version: String,
    /// Every version, keyed by version name.
    pub versions: BTreeMap<String, ApiInfo>,
}

/// What the manifest says about one version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ApiInfo {
    /// Whether the version is deprecated.
    pub deprecated: bool,
    /// Location of the API description, interpreted by the [`ApiSource`].
    pub api_description: String,
    /// Location of the generator configuration, interpreted by the [`ApiSource`].
    pub generator_config: String,
}

/// Loads the shape model and configuration of a version.
pub trait ApiSource {
    /// Resolve one manifest entry.
    fn load(
        &self,
        version: &str,
        info: &ApiInfo,
    ) -> anyhow::Result<(Arc<ShapeModel>, GeneratorConfig)>;
}

/// Everything known about one registered version.
#[derive(Debug)]
pub struct VersionedApi {
    /// Version name.
    pub version: String,
    /// Manifest entry.
    pub info: ApiInfo,
    /// The version's shape model.
    pub model: Arc<ShapeModel>,
    /// The version's generator configuration.
    pub config: GeneratorConfig,
    /// Resources, type definitions and failures derived from the model.
    pub api: ApiModel,
}

impl VersionedApi {
    /// The model and generated types used to compare this version.
    #[must_use]
    pub fn schema(&self) -> Schema<'_> {
        Schema::new(&self.model, &self.api)
    }
}

/// The delta of one resource present in both the spoke and the hub.
#[derive(Debug)]
pub struct ResourceComparison<'a> {
    /// Resource name.
    pub resource: String,
    /// The delta, or why it could not be computed.
    pub delta: GenerationResult<ResourceDelta<'a>>,
}

/// Registry of API versions with exactly one hub.
#[derive(Debug)]
pub struct VersionRegistry {
    hub_version: String,
    apis: BTreeMap<String, VersionedApi>,
}

impl VersionRegistry {
    /// Create an empty registry for the given hub version.
    #[must_use]
    pub fn new(hub_version: impl Into<String>) -> Self {
        Self {
            hub_version: hub_version.into(),
            apis: BTreeMap::new(),
        }
    }

    /// Register every manifest entry, then validate the registry.
    pub fn from_manifest(
        manifest: &VersionManifest,
        source: &dyn ApiSource,
    ) -> GenerationResult<Self> {
        if manifest.versions.is_empty() {
            return Err(GenerationError::Config(
                "version manifest declares no versions".to_owned(),
            ));
        }
        if manifest.hub_version.is_empty() {
            return Err(GenerationError::Config(
                "version manifest declares no hub version".to_owned(),
            ));
        }
        let mut registry = Self::new(manifest.hub_version.clone());
        for (version, info) in &manifest.versions {
            let (model, config) = source.load(version, info)?;
            registry.register(version.clone(), info.clone(), model, config)?;
        }
        registry.finish()
    }

    /// Build and store the resources of one version.
    pub fn register(
        &mut self,
        version: impl Into<String>,
        info: ApiInfo,
        model: Arc<ShapeModel>,
        config: GeneratorConfig,
    ) -> GenerationResult<()> {
        let version = version.into();
        if self.apis.contains_key(&version) {
            return Err(GenerationError::Config(format!(
                "version {version} is registered twice"
            )));
        }
        let api = ResourceBuilder::new(&model, &config).build()?;
        info!(
            version = %version,
            hub = version == self.hub_version,
            deprecated = info.deprecated,
            resources = api.resources.len(),
            failures = api.failures.len(),
            "registered api version"
        );
        self.apis.insert(
            version.clone(),
            VersionedApi {
                version,
                info,
                model,
                config,
                api,
            },
        );
        Ok(())
    }

    /// Check that the hub is registered and the deprecation policy holds.
    pub fn finish(self) -> GenerationResult<Self> {
        if self.apis.is_empty() {
            return Err(GenerationError::Config("no api version registered".to_owned()));
        }
        if !self.apis.contains_key(&self.hub_version) {
            return Err(GenerationError::Config(format!(
                "hub version {} is not registered",
                self.hub_version
            )));
        }
        self.audit_deprecations()?;
        Ok(self)
    }

    /// The hub version name.
    #[must_use]
    pub fn hub_version(&self) -> &str {
        &self.hub_version
    }

    /// Every version except the hub, sorted.
    pub fn spoke_versions(&self) -> impl Iterator<Item = &str> {
        self.apis
            .keys()
            .map(String::as_str)
            .filter(move |v| *v != self.hub_version)
    }

    /// Deprecated versions, sorted.
    pub fn deprecated_versions(&self) -> impl Iterator<Item = &str> {
        self.apis
            .values()
            .filter(|api| api.info.deprecated)
            .map(|api| api.version.as_str())
    }

    /// Whether a version is deprecated.
    #[must_use]
    pub fn is_deprecated(&self, version: &str) -> bool {
        self.apis.get(version).is_some_and(|api| api.info.deprecated)
    }

    /// The registered data of a non-deprecated version.
    pub fn api(&self, version: &str) -> GenerationResult<&VersionedApi> {
        let api = self
            .apis
            .get(version)
            .ok_or_else(|| GenerationError::VersionNotFound(version.to_owned()))?;
        if api.info.deprecated {
            return Err(GenerationError::VersionDeprecated(version.to_owned()));
        }
        Ok(api)
    }

    /// The resources of a non-deprecated version.
    pub fn resources(&self, version: &str) -> GenerationResult<&[Resource]> {
        Ok(&self.api(version)?.api.resources)
    }

    /// Validate the deprecation policy.
    ///
    /// The hub may not be deprecated. Spoke versions are grouped by major
    /// version and alpha/beta track; inside each group, sorted by minor
    /// version, deprecated versions must form a prefix. The hub takes no part
    /// in the grouping.
    pub fn audit_deprecations(&self) -> GenerationResult<()> {
        if self.is_deprecated(&self.hub_version) {
            return Err(GenerationError::DeprecationPolicy(format!(
                "hub version {} cannot be deprecated",
                self.hub_version
            )));
        }

        let mut groups: BTreeMap<(u64, String), Vec<(u64, &VersionedApi)>> = BTreeMap::new();
        for api in self.apis.values().filter(|api| api.version != self.hub_version) {
            let parsed = parse_version(&api.version)?;
            groups
                .entry((parsed.major, parsed.track))
                .or_default()
                .push((parsed.minor, api));
        }

        for ((major, track), mut members) in groups {
            members.sort_by_key(|(minor, _)| *minor);
            let mut seen_active: Option<&str> = None;
            for (_, api) in members {
                match (api.info.deprecated, seen_active) {
                    (true, Some(active)) => {
                        return Err(GenerationError::DeprecationPolicy(format!(
                            "version {} is deprecated but older version {active} of v{major}{track} is not",
                            api.version
                        )));
                    }
                    (false, None) => seen_active = Some(api.version.as_str()),
                    _ => {}
                }
            }
        }
        debug!(versions = self.apis.len(), "deprecation audit passed");
        Ok(())
    }

    /// Compute the delta of every resource shared by `spoke` and the hub.
    ///
    /// Resources present on one side only are skipped.
    pub fn compare_hub_with(&self, spoke: &str) -> GenerationResult<Vec<ResourceComparison<'_>>> {
        if spoke == self.hub_version {
            return Err(GenerationError::Config(format!(
                "cannot compare hub version {spoke} with itself"
            )));
        }
        let spoke_api = self.api(spoke)?;
        let hub_api = self.api(&self.hub_version)?;

        let hub_resources: BTreeMap<&str, &Resource> = hub_api
            .api
            .resources
            .iter()
            .map(|r| (r.names.original.as_str(), r))
            .collect();

        let mut comparisons = Vec::new();
        for spoke_resource in &spoke_api.api.resources {
            let name = spoke_resource.names.original.as_str();
            let Some(hub_resource) = hub_resources.get(name) else {
                warn!(resource = %name, spoke = %spoke, "resource missing in hub, skipping");
                continue;
            };
            comparisons.push(ResourceComparison {
                resource: name.to_owned(),
                delta: compute_resource_delta(
                    spoke_resource,
                    spoke_api.schema(),
                    hub_resource,
                    hub_api.schema(),
                ),
            });
        }
        for name in hub_resources.keys() {
            if spoke_api.api.resource(name).is_none() {
                warn!(resource = %name, spoke = %spoke, "resource missing in spoke, skipping");
            }
        }
        Ok(comparisons)
    }
}

#[derive(Debug, PartialEq, Eq)]
struct ParsedVersion {
    major: u64,
    track: String,
    minor: u64,
}

fn parse_version(version: &str) -> GenerationResult<ParsedVersion> {
    let invalid = || GenerationError::Config(format!("invalid api version {version}"));
    let captures = VERSION_PATTERN.captures(version).ok_or_else(invalid)?;
    let major = captures[1].parse().map_err(|_| invalid())?;
    let track = captures.get(2).map_or("", |m| m.as_str()).to_owned();
    let minor = match captures.get(3) {
        Some(m) => m.as_str().parse().map_err(|_| invalid())?,
        None => 0,
    };
    Ok(ParsedVersion {
        major,
        track,
        minor,
    })
}

#[cfg(test)]
mod tests {
    use crdgen_model::ScalarKind;

    use super::*;

    fn model() -> Arc<ShapeModel> {
        Arc::new(
            ShapeModel::builder()
                .scalar("String", ScalarKind::String)
                .structure("CreateBucketRequest", [("Name", "String")])
                .operation("CreateBucket", Some("CreateBucketRequest"), None)
                .build(),
        )
    }

    fn registry(hub: &str, versions: &[(&str, bool)]) -> GenerationResult<VersionRegistry> {
        let mut registry = VersionRegistry::new(hub);
        for (version, deprecated) in versions {
            registry.register(
                *version,
                ApiInfo {
                    deprecated: *deprecated,
                    ..ApiInfo::default()
                },
                model(),
                GeneratorConfig::default(),
            )?;
        }
        registry.finish()
    }

    #[test]
    fn test_should_parse_versions() {
        assert_eq!(
            parse_version("v1alpha2").unwrap(),
            ParsedVersion {
                major: 1,
                track: "alpha".into(),
                minor: 2
            }
        );
        assert_eq!(parse_version("v2").unwrap().major, 2);
        assert!(matches!(parse_version("1.0"), Err(GenerationError::Config(_))));
        assert!(matches!(parse_version("v1gamma1"), Err(GenerationError::Config(_))));
    }

    #[test]
    fn test_should_accept_deprecated_prefix() {
        let registry = registry(
            "v1",
            &[("v1alpha1", true), ("v1alpha2", true), ("v1alpha3", false), ("v1", false)],
        )
        .unwrap();
        assert_eq!(
            registry.spoke_versions().collect::<Vec<_>>(),
            vec!["v1alpha1", "v1alpha2", "v1alpha3"]
        );
        assert_eq!(registry.deprecated_versions().count(), 2);
    }

    #[test]
    fn test_should_reject_deprecation_gap() {
        let err = registry("v1", &[("v1alpha1", false), ("v1alpha2", true), ("v1", false)])
            .unwrap_err();
        assert!(matches!(err, GenerationError::DeprecationPolicy(_)));
    }

    #[test]
    fn test_should_audit_tracks_independently() {
        registry(
            "v2",
            &[("v1alpha1", false), ("v1beta1", true), ("v1beta2", false), ("v2", false)],
        )
        .unwrap();
    }

    #[test]
    fn test_should_leave_hub_out_of_its_track() {
        let reg = registry(
            "v1alpha2",
            &[("v1alpha1", true), ("v1alpha2", false), ("v1alpha3", true)],
        )
        .unwrap();
        assert_eq!(
            reg.deprecated_versions().collect::<Vec<_>>(),
            vec!["v1alpha1", "v1alpha3"]
        );

        let err = registry(
            "v1alpha2",
            &[("v1alpha1", false), ("v1alpha2", false), ("v1alpha3", true)],
        )
        .unwrap_err();
        assert!(matches!(err, GenerationError::DeprecationPolicy(_)));
    }

    #[test]
    fn test_should_reject_deprecated_hub() {
        let err = registry("v1", &[("v1", true)]).unwrap_err();
        assert!(matches!(err, GenerationError::DeprecationPolicy(_)));
    }

    #[test]
    fn test_should_reject_duplicate_and_missing_hub() {
        let mut reg = VersionRegistry::new("v1");
        reg.register("v1", ApiInfo::default(), model(), GeneratorConfig::default())
            .unwrap();
        let err = reg
            .register("v1", ApiInfo::default(), model(), GeneratorConfig::default())
            .unwrap_err();
        assert!(matches!(err, GenerationError::Config(_)));

        let err = registry("v2", &[("v1", false)]).unwrap_err();
        assert!(matches!(err, GenerationError::Config(_)));
        let err = registry("v1", &[]).unwrap_err();
        assert!(matches!(err, GenerationError::Config(_)));
    }

    #[test]
    fn test_should_guard_version_lookup() {
        let registry = registry("v1", &[("v1alpha1", true), ("v1", false)]).unwrap();
        assert!(registry.resources("v1").unwrap().len() == 1);
        assert!(matches!(
            registry.resources("v1alpha1"),
            Err(GenerationError::VersionDeprecated(_))
        ));
        assert!(matches!(
            registry.resources("v9"),
            Err(GenerationError::VersionNotFound(_))
        ));
    }

    #[test]
    fn test_should_compare_spoke_with_hub() {
        let registry = registry("v1", &[("v1alpha1", false), ("v1", false)]).unwrap();
        let comparisons = registry.compare_hub_with("v1alpha1").unwrap();
        assert_eq!(comparisons.len(), 1);
        let delta = comparisons[0].delta.as_ref().unwrap();
        assert_eq!(delta.spec.len(), 1);
        assert!(matches!(
            registry.compare_hub_with("v1"),
            Err(GenerationError::Config(_))
        ));
    }

    struct StaticSource;

    impl ApiSource for StaticSource {
        fn load(
            &self,
            version: &str,
            _info: &ApiInfo,
        ) -> anyhow::Result<(Arc<ShapeModel>, GeneratorConfig)> {
            if version == "v0" {
                anyhow::bail!("no model for {version}");
            }
            Ok((model(), GeneratorConfig::default()))
        }
    }

    #[test]
    fn test_should_build_from_manifest() {
        let manifest = VersionManifest {
            hub_version: "v1".into(),
            versions: BTreeMap::from([
                ("v1".to_owned(), ApiInfo::default()),
                ("v1alpha1".to_owned(), ApiInfo::default()),
            ]),
        };
        let registry = VersionRegistry::from_manifest(&manifest, &StaticSource).unwrap();
        assert_eq!(registry.hub_version(), "v1");

        let empty = VersionManifest::default();
        assert!(matches!(
            VersionRegistry::from_manifest(&empty, &StaticSource),
            Err(GenerationError::Config(_))
        ));

        let broken = VersionManifest {
            hub_version: "v0".into(),
            versions: BTreeMap::from([("v0".to_owned(), ApiInfo::default())]),
        };
        assert!(matches!(
            VersionRegistry::from_manifest(&broken, &StaticSource),
            Err(GenerationError::Internal(_))
        ));
    }
}
