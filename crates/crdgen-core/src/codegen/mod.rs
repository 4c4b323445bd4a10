//! Conversion code generation.
//!
//! ```text
//! ResourceDelta ──► ConversionGenerator ──► ConversionFunction (IR)
//!                                               │
//!                        ┌──────────────────────┴───────────┐
//!                        ▼                                  ▼
//!                  Backend (Go)                        evaluate()
//!                  source files                 serde_json round trips
//! ```

pub mod annotation;
pub mod eval;
pub mod generator;
pub mod go;
pub mod ir;

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

pub use self::annotation::{AnnotationError, AnnotationTag, Section, annotation_key};
pub use self::eval::{EvalError, evaluate};
pub use self::generator::ConversionGenerator;
pub use self::go::{Backend, ConversionFile, GoBackend};
pub use self::ir::{ConversionFunction, Direction, Place, Stmt, TypeExpr};
use crate::error::{GenerationError, GenerationResult};
use crate::registry::VersionRegistry;
use crate::settings::GeneratorSettings;

/// A resource whose conversion could not be generated.
#[derive(Debug)]
pub struct ConversionFailure {
    /// Version the failure belongs to.
    pub version: String,
    /// Resource name.
    pub resource: String,
    /// Why generation failed.
    pub error: GenerationError,
}

/// Outcome of a batch generation run.
#[derive(Debug, Default)]
pub struct GenerationReport {
    /// Rendered files keyed by relative path.
    pub files: BTreeMap<String, String>,
    /// Resources skipped because of an error.
    pub failures: Vec<ConversionFailure>,
}

/// Generate Go conversion files for every spoke version of the registry.
pub fn generate_conversions(
    registry: &VersionRegistry,
    settings: &GeneratorSettings,
) -> GenerationResult<GenerationReport> {
    generate_conversions_with(registry, settings, &GoBackend::new(settings.clone()))
}

/// Generate conversion files with a specific backend.
///
/// Run-level errors (see [`GenerationError::is_run_level`]) abort the run and
/// produce no files. Other conversion errors only skip the affected resource
/// and are collected in the report; resources that failed to build are
/// listed on their version's [`ApiModel`](crate::builder::ApiModel) instead.
pub fn generate_conversions_with(
    registry: &VersionRegistry,
    settings: &GeneratorSettings,
    backend: &dyn Backend,
) -> GenerationResult<GenerationReport> {
    registry.audit_deprecations()?;

    let hub_version = registry.hub_version();
    let hub = registry.api(hub_version)?;
    let ext = backend.file_extension();
    let mut report = GenerationReport::default();

    let spokes: Vec<&str> = registry.spoke_versions().collect();
    for spoke_version in spokes {
        if registry.is_deprecated(spoke_version) {
            debug!(spoke = %spoke_version, "skipping deprecated version");
            continue;
        }
        let spoke = registry.api(spoke_version)?;
        let generator = ConversionGenerator::new(settings, spoke, hub);

        for comparison in registry.compare_hub_with(spoke_version)? {
            let rendered = comparison.delta.and_then(|delta| {
                let functions = vec![
                    generator.generate(&delta, Direction::ToHub)?,
                    generator.generate(&delta, Direction::FromHub)?,
                ];
                let file = ConversionFile {
                    package: spoke_version.to_owned(),
                    hub_package: hub_version.to_owned(),
                    resource: functions[0].resource.clone(),
                    functions,
                };
                let content = backend.render_conversion_file(&file)?;
                Ok((file.resource.snake, content))
            });
            match rendered {
                Ok((snake, content)) => {
                    report
                        .files
                        .insert(format!("apis/{spoke_version}/{snake}_conversion.{ext}"), content);
                }
                Err(error) if error.is_run_level() => return Err(error),
                Err(error) => {
                    warn!(
                        spoke = %spoke_version,
                        resource = %comparison.resource,
                        %error,
                        "conversion skipped"
                    );
                    report.failures.push(ConversionFailure {
                        version: spoke_version.to_owned(),
                        resource: comparison.resource,
                        error,
                    });
                }
            }
        }
    }

    for resource in &hub.api.resources {
        let content = backend.render_hub_file(hub_version, &resource.names)?;
        report.files.insert(
            format!("apis/{hub_version}/{}_conversion.{ext}", resource.names.snake),
            content,
        );
    }

    info!(
        hub = %hub_version,
        files = report.files.len(),
        failures = report.failures.len(),
        "conversion generation finished"
    );
    Ok(report)
}
