//! End-to-end tests for crdgen.
//!
//! The fixtures describe three versions of a small storage service:
//!
//! | Version    | Bucket spec                        | User spec                        |
//! |------------|------------------------------------|----------------------------------|
//! | `v1alpha1` | Name, Size                         | UserName, Password               |
//! | `v1beta1`  | Name, Size, Tags, Rules, Acl       | Name (renamed), Password (secret) |
//! | `v1` (hub) | Name, Size, Tags, Rules            | Name (renamed), Password (secret) |
//!
//! Run them with:
//! ```text
//! cargo test -p crdgen-integration
//! ```

use std::sync::{Arc, Once};

use anyhow::bail;
use crdgen_core::{ApiInfo, ApiSource, GenerationResult, VersionManifest, VersionRegistry};
use crdgen_model::{GeneratorConfig, ShapeModel};

static INIT: Once = Once::new();

/// Initialize tracing (once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Resolves manifest entries to the bundled fixtures by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureSource;

impl FixtureSource {
    fn model(name: &str) -> anyhow::Result<&'static str> {
        Ok(match name {
            "v1alpha1" => include_str!("../fixtures/v1alpha1.json"),
            "v1beta1" => include_str!("../fixtures/v1beta1.json"),
            "v1" => include_str!("../fixtures/v1.json"),
            other => bail!("no model fixture named {other}"),
        })
    }

    fn config(name: &str) -> anyhow::Result<&'static str> {
        Ok(match name {
            "v1alpha1" => include_str!("../fixtures/v1alpha1.generator.json"),
            "v1beta1" => include_str!("../fixtures/v1beta1.generator.json"),
            "v1" => include_str!("../fixtures/v1.generator.json"),
            other => bail!("no generator config fixture named {other}"),
        })
    }
}

impl ApiSource for FixtureSource {
    fn load(
        &self,
        version: &str,
        info: &ApiInfo,
    ) -> anyhow::Result<(Arc<ShapeModel>, GeneratorConfig)> {
        tracing::debug!(
            version,
            model = %info.api_description,
            config = %info.generator_config,
            "loading fixture"
        );
        let model = ShapeModel::from_smithy_json(Self::model(&info.api_description)?)?;
        let config = GeneratorConfig::from_json(Self::config(&info.generator_config)?)?;
        Ok((Arc::new(model), config))
    }
}

/// A manifest over `(version, fixture, deprecated)` entries.
#[must_use]
pub fn manifest(hub: &str, entries: &[(&str, &str, bool)]) -> VersionManifest {
    VersionManifest {
        hub_version: hub.to_owned(),
        versions: entries
            .iter()
            .map(|(version, fixture, deprecated)| {
                let info = ApiInfo {
                    deprecated: *deprecated,
                    api_description: (*fixture).to_owned(),
                    generator_config: (*fixture).to_owned(),
                };
                ((*version).to_owned(), info)
            })
            .collect(),
    }
}

/// The three fixture versions with `v1` as hub and nothing deprecated.
#[must_use]
pub fn storage_manifest() -> VersionManifest {
    manifest(
        "v1",
        &[
            ("v1alpha1", "v1alpha1", false),
            ("v1beta1", "v1beta1", false),
            ("v1", "v1", false),
        ],
    )
}

/// Build a registry from a manifest over the fixtures.
pub fn registry(manifest: &VersionManifest) -> GenerationResult<VersionRegistry> {
    init_tracing();
    VersionRegistry::from_manifest(manifest, &FixtureSource)
}

mod test_codegen;
mod test_delta;
mod test_registry;
mod test_roundtrip;
