//! Read-only view over a shape model with ignore rules applied.

use crdgen_model::{GeneratorConfig, Operation, Shape, ShapeModel, ShapeRef};

use crate::error::{GenerationError, GenerationResult};

/// Hides ignored shapes, members and operations without touching the model.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ModelView<'a> {
    pub(crate) model: &'a ShapeModel,
    pub(crate) config: &'a GeneratorConfig,
}

impl<'a> ModelView<'a> {
    pub(crate) fn new(model: &'a ShapeModel, config: &'a GeneratorConfig) -> Self {
        Self { model, config }
    }

    /// Operations that survive the ignore rules.
    pub(crate) fn operations(&self) -> impl Iterator<Item = &'a Operation> + use<'a> {
        let config = self.config;
        self.model
            .operations()
            .filter(move |op| !config.is_ignored_operation(&op.name))
    }

    /// Resolve a reference, treating ignored shapes as absent.
    pub(crate) fn resolve(&self, shape_ref: &ShapeRef) -> GenerationResult<&'a Shape> {
        if self.config.is_ignored_shape(&shape_ref.shape_name) {
            return Err(GenerationError::Schema(format!(
                "shape {} is ignored",
                shape_ref.shape_name
            )));
        }
        self.model
            .resolve(shape_ref)
            .map_err(|e| GenerationError::Schema(e.to_string()))
    }

    /// Visible members of a structure shape, sorted by name.
    pub(crate) fn members(
        &self,
        shape: &'a Shape,
    ) -> impl Iterator<Item = (&'a str, &'a ShapeRef)> + use<'a> {
        let name = shape.name.as_str();
        let config = self.config;
        shape
            .members()
            .into_iter()
            .flatten()
            .filter(move |(member, target)| {
                !config.is_ignored_member(name, member)
                    && !config.is_ignored_shape(&target.shape_name)
            })
            .map(|(member, target)| (member.as_str(), target))
    }
}
