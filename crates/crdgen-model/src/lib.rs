//! Shape model and generator configuration for crdgen.
//!
//! This crate holds the inputs of the generator: an immutable arena of typed
//! shapes describing a cloud service API, the operations that reference them,
//! and the declarative configuration that tells the generator how to turn
//! those operations into Kubernetes resources.
//!
//! # Architecture
//!
//! ```text
//! Smithy JSON AST ──> smithy::SmithyModel ──> ShapeModelBuilder ──> ShapeModel
//!                                                                     │
//!                          GeneratorConfig ───────────────────────────┤
//!                                                                     v
//!                                                           crdgen-core builder
//! ```

pub mod config;
pub mod error;
pub mod names;
pub mod operation;
pub mod shape;
pub mod smithy;

pub use config::{
    FieldConfig, GeneratorConfig, IgnoreSpec, OperationRenames, RenamesConfig, ResourceConfig,
    SourceFieldConfig,
};
pub use error::{ModelError, ModelResult};
pub use names::Names;
pub use operation::OpType;
pub use shape::{
    Operation, ScalarKind, Shape, ShapeId, ShapeKind, ShapeModel, ShapeModelBuilder, ShapeRef,
};
