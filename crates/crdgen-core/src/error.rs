//! Error types for resource building, version management and code generation.

use crdgen_model::ModelError;

/// Errors raised by the generator.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Malformed or missing configuration or manifest data.
    #[error("configuration error: {0}")]
    Config(String),

    /// The API description is inconsistent with what the generator needs.
    #[error("schema error: {0}")]
    Schema(String),

    /// A rename mapping is not consistent with the compared field sets.
    #[error("rename inconsistency: {0}")]
    RenameInconsistency(String),

    /// The deprecation policy of the version manifest is violated.
    #[error("deprecation policy violated: {0}")]
    DeprecationPolicy(String),

    /// A field changed in a way no conversion can express.
    #[error("unsupported change for field {field}: {reason}")]
    UnsupportedChange {
        /// The affected field name.
        field: String,
        /// What kind of change was found.
        reason: String,
    },

    /// The requested version was never registered.
    #[error("version not found: {0}")]
    VersionNotFound(String),

    /// The requested version is deprecated.
    #[error("version is deprecated: {0}")]
    VersionDeprecated(String),

    /// The shape model could not be loaded or navigated.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Writing generated code into a buffer failed.
    #[error("render error: {0}")]
    Render(#[from] std::fmt::Error),

    /// Failure reported by an external collaborator.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl GenerationError {
    /// Whether the error aborts the whole run rather than one resource.
    #[must_use]
    pub fn is_run_level(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::DeprecationPolicy(_)
                | Self::VersionNotFound(_)
                | Self::VersionDeprecated(_)
                | Self::Model(_)
                | Self::Internal(_)
        )
    }
}

/// Convenience result type for generator operations.
pub type GenerationResult<T> = Result<T, GenerationError>;
