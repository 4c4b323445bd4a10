//! Error types for the shape model.

/// Errors raised while ingesting or navigating a shape model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The Smithy JSON document could not be deserialized.
    #[error("failed to parse Smithy JSON model: {0}")]
    Parse(#[from] serde_json::Error),

    /// A shape reference points at a shape that does not exist in the model.
    #[error("found nil shape pointer for shape {shape}")]
    NilShape {
        /// The name of the referenced shape.
        shape: String,
    },

    /// A shape definition is not usable by the generator.
    #[error("invalid shape {shape}: {message}")]
    InvalidShape {
        /// The offending shape name.
        shape: String,
        /// Explanation.
        message: String,
    },
}

/// Convenience result type for shape model operations.
pub type ModelResult<T> = Result<T, ModelError>;
