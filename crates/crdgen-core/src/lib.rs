//! Multi-version CRD conversion generator.
//!
//! Given the shape models of several API versions of one service, crdgen
//! builds the Kubernetes resources of every version, compares each spoke
//! version with the hub version field by field, and emits conversion
//! functions that move objects between them without losing data.
//!
//! # Architecture
//!
//! ```text
//! VersionManifest ──► VersionRegistry ──► ResourceBuilder (per version)
//!                          │
//!                          ▼
//!                   compare_hub_with ──► ResourceDelta
//!                                            │
//!                                            ▼
//!                                  ConversionGenerator ──► Backend ──► files
//! ```

pub mod builder;
pub mod codegen;
pub mod delta;
pub mod error;
pub mod registry;
pub mod settings;

pub use builder::{ApiModel, Field, Resource, ResourceBuilder, TypeDef};
pub use codegen::{GenerationReport, generate_conversions, generate_conversions_with};
pub use delta::{
    ChangeType, FieldDelta, RenameMap, ResourceDelta, Schema, compute_resource_delta,
};
pub use error::{GenerationError, GenerationResult};
pub use registry::{ApiInfo, ApiSource, VersionManifest, VersionRegistry, VersionedApi};
pub use settings::GeneratorSettings;
