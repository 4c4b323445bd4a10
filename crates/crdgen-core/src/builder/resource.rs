//! Spec/Status field construction for each resource.

use std::collections::{BTreeMap, HashSet};

use crdgen_model::{
    FieldConfig, GeneratorConfig, Names, OpType, Operation, Shape, ShapeId, ShapeKind,
    ShapeModel, ShapeRef,
};
use tracing::{debug, warn};

use super::view::ModelView;
use super::{
    ApiModel, ELEMENT_SEPARATOR, Field, MEMBER_SEPARATOR, Resource, ResourceFailure,
    build_enum_defs, build_type_defs,
};
use crate::error::{GenerationError, GenerationResult};

/// Member holding the key-value attribute map of attribute-based APIs.
const ATTRIBUTES_MEMBER: &str = "Attributes";

/// Builds the resources of one API version.
#[derive(Debug, Clone, Copy)]
pub struct ResourceBuilder<'a> {
    view: ModelView<'a>,
}

impl<'a> ResourceBuilder<'a> {
    /// Create a builder over a shape model and its configuration.
    #[must_use]
    pub fn new(model: &'a ShapeModel, config: &'a GeneratorConfig) -> Self {
        Self {
            view: ModelView::new(model, config),
        }
    }

    /// Build every resource, then derive type and enum definitions.
    ///
    /// Per-resource failures are collected in [`ApiModel::failures`]; only
    /// type definition conflicts fail the whole version.
    pub fn build(&self) -> GenerationResult<ApiModel> {
        let mut resources = Vec::new();
        let mut failures = Vec::new();

        for (name, ops) in self.group_operations() {
            if self.view.config.is_ignored_resource(&name) {
                debug!(resource = %name, "skipping ignored resource");
                continue;
            }
            let Some(create) = ops
                .get(&OpType::Create)
                .and_then(|op| self.view.model.operation(op))
            else {
                continue;
            };
            match self.build_resource(&name, create, &ops) {
                Ok(resource) => {
                    debug!(
                        resource = %name,
                        spec = resource.spec_fields.len(),
                        status = resource.status_fields.len(),
                        "built resource"
                    );
                    resources.push(resource);
                }
                Err(error) => {
                    warn!(resource = %name, %error, "failed to build resource");
                    failures.push(ResourceFailure {
                        resource: name,
                        error,
                    });
                }
            }
        }

        let (type_defs, type_renames) = build_type_defs(self.view, &resources)?;
        let enum_defs = build_enum_defs(self.view);

        Ok(ApiModel {
            resources,
            type_defs,
            enum_defs,
            type_renames,
            failures,
        })
    }

    /// Group operation names by resource, keeping the first name per role.
    fn group_operations(&self) -> BTreeMap<String, BTreeMap<OpType, String>> {
        let mut grouped: BTreeMap<String, BTreeMap<OpType, String>> = BTreeMap::new();
        for op in self.view.operations() {
            if let Some((op_type, resource)) = OpType::classify(&op.name) {
                grouped
                    .entry(resource)
                    .or_default()
                    .entry(op_type)
                    .or_insert_with(|| op.name.clone());
            }
        }
        grouped
    }

    fn build_resource(
        &self,
        name: &str,
        create: &Operation,
        ops: &BTreeMap<OpType, String>,
    ) -> GenerationResult<Resource> {
        let config = self.view.config;
        let names = Names::new(name);
        let renames = config.input_field_renames(name, &create.name);
        let unpack = config.unpacks_attributes_map(name);

        let mut spec_fields = BTreeMap::new();
        let mut status_fields = BTreeMap::new();

        if let Some(input) = &create.input {
            let shape = self.view.resolve(input)?;
            for (member, target) in self.view.members(shape) {
                if unpack && member == ATTRIBUTES_MEMBER {
                    continue;
                }
                let field_name = renames.get(member).map_or(member, String::as_str);
                if let Some(field) = self.top_level_field(name, field_name, target) {
                    spec_fields.insert(field_name.to_owned(), field);
                }
            }
        }

        if unpack {
            for (field_name, field_config) in config.resource_fields(name) {
                if !field_config.is_attribute {
                    continue;
                }
                let field = Field {
                    names: Names::new(field_name.as_str()),
                    path: Names::new(field_name.as_str()).camel,
                    shape_ref: None,
                    config: Some(field_config.clone()),
                };
                if field_config.is_read_only {
                    status_fields.insert(field_name.clone(), field);
                } else {
                    spec_fields.insert(field_name.clone(), field);
                }
            }
        }

        for (field_name, source, field_config) in sourced_fields(config, name, false) {
            let target = self.sourced_member(&source.operation, &source.path, false)?;
            spec_fields.insert(
                field_name.clone(),
                sourced_field(field_name, target.clone(), field_config),
            );
        }

        let mut primary_identifier = None;
        if let Some(output) = &create.output {
            let shape = self.unwrap_output(self.view.resolve(output)?)?;
            let configured = config.resource(name).and_then(|r| r.primary_identifier.as_deref());
            for (member, target) in self.view.members(shape) {
                let field_name = renames.get(member).map_or(member, String::as_str);
                if spec_fields.contains_key(field_name) || (unpack && member == ATTRIBUTES_MEMBER) {
                    continue;
                }
                if primary_identifier.is_none() && is_primary_identifier(name, member, configured) {
                    primary_identifier = Some(member.to_owned());
                    continue;
                }
                if let Some(field) = self.top_level_field(name, field_name, target) {
                    status_fields.insert(field_name.to_owned(), field);
                }
            }
        }

        for (field_name, source, field_config) in sourced_fields(config, name, true) {
            let target = self.sourced_member(&source.operation, &source.path, true)?;
            status_fields.insert(
                field_name.clone(),
                sourced_field(field_name, target.clone(), field_config),
            );
        }

        let mut fields = BTreeMap::new();
        for field in spec_fields.values().chain(status_fields.values()) {
            fields.insert(field.path.clone(), field.clone());
            if let Some(shape_ref) = &field.shape_ref {
                let mut visited = HashSet::new();
                self.materialize(name, &field.path, shape_ref, &mut visited, &mut fields)?;
            }
        }

        Ok(Resource {
            names,
            spec_fields,
            status_fields,
            fields,
            ops: ops.clone(),
            primary_identifier,
            input_renames: renames,
        })
    }

    /// A top-level field, or `None` when the member points nowhere.
    fn top_level_field(
        &self,
        resource: &str,
        field_name: &str,
        target: &ShapeRef,
    ) -> Option<Field> {
        if target.target.is_none() {
            warn!(
                resource = %resource,
                field = %field_name,
                shape = %target.shape_name,
                "skipping field with neither a shape nor an attribute marker"
            );
            return None;
        }
        let names = Names::new(field_name);
        Some(Field {
            path: names.camel.clone(),
            names,
            shape_ref: Some(target.clone()),
            config: self.view.config.field(resource, field_name).cloned(),
        })
    }

    /// Resolve the member a sourced field points at.
    fn sourced_member(
        &self,
        operation: &str,
        path: &str,
        from_output: bool,
    ) -> GenerationResult<&'a ShapeRef> {
        let op = self.view.model.operation(operation).ok_or_else(|| {
            GenerationError::Schema(format!("unknown source operation {operation}"))
        })?;
        let root = if from_output { &op.output } else { &op.input };
        let root = root.as_ref().ok_or_else(|| {
            GenerationError::Schema(format!("source operation {operation} has no payload"))
        })?;
        self.view
            .model
            .member_at_path(root, path)
            .ok_or_else(|| {
                GenerationError::Schema(format!(
                    "cannot resolve path {path} in payload of operation {operation}"
                ))
            })
    }

    /// Unwrap an output whose only member wraps the real structure.
    fn unwrap_output(&self, shape: &'a Shape) -> GenerationResult<&'a Shape> {
        if !shape.used_as_output {
            return Ok(shape);
        }
        let mut members = self.view.members(shape);
        let (Some((_, only)), None) = (members.next(), members.next()) else {
            return Ok(shape);
        };
        match self.view.resolve(only) {
            Ok(inner) if inner.is_structure() => Ok(inner),
            _ => Ok(shape),
        }
    }

    /// Recursively add nested fields under `parent_path`.
    fn materialize(
        &self,
        resource: &str,
        parent_path: &str,
        shape_ref: &ShapeRef,
        visited: &mut HashSet<ShapeId>,
        fields: &mut BTreeMap<String, Field>,
    ) -> GenerationResult<()> {
        let shape = self.view.resolve(shape_ref)?;
        match &shape.kind {
            ShapeKind::Structure { .. } => self.materialize_members(
                resource,
                parent_path,
                MEMBER_SEPARATOR,
                shape_ref,
                shape,
                visited,
                fields,
            ),
            ShapeKind::List { member: element } | ShapeKind::Map { value: element, .. } => {
                let element_shape = self.view.resolve(element)?;
                if element_shape.is_structure() {
                    self.materialize_members(
                        resource,
                        parent_path,
                        ELEMENT_SEPARATOR,
                        element,
                        element_shape,
                        visited,
                        fields,
                    )
                } else {
                    Ok(())
                }
            }
            ShapeKind::Scalar { .. } => Ok(()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn materialize_members(
        &self,
        resource: &str,
        parent_path: &str,
        separator: &str,
        shape_ref: &ShapeRef,
        shape: &'a Shape,
        visited: &mut HashSet<ShapeId>,
        fields: &mut BTreeMap<String, Field>,
    ) -> GenerationResult<()> {
        let Some(id) = shape_ref.target else {
            return Ok(());
        };
        if !visited.insert(id) {
            return Ok(());
        }
        for (member, target) in self.view.members(shape) {
            let names = Names::new(member);
            let path = format!("{parent_path}{separator}{}", names.camel);
            let field = Field {
                names,
                path: path.clone(),
                shape_ref: Some(target.clone()),
                config: self.view.config.field(resource, &path).cloned(),
            };
            fields.insert(path.clone(), field);
            self.materialize(resource, &path, target, visited, fields)?;
        }
        visited.remove(&id);
        Ok(())
    }
}

/// Configured fields sourced from another operation, Spec or Status side.
fn sourced_fields<'c>(
    config: &'c GeneratorConfig,
    resource: &str,
    read_only: bool,
) -> Vec<(&'c String, &'c crdgen_model::SourceFieldConfig, &'c FieldConfig)> {
    config
        .resource_fields(resource)
        .filter(|(_, fc)| fc.is_read_only == read_only && !fc.is_attribute)
        .filter_map(|(name, fc)| fc.from.as_ref().map(|source| (name, source, fc)))
        .collect()
}

fn sourced_field(name: &str, target: ShapeRef, config: &FieldConfig) -> Field {
    let names = Names::new(name);
    Field {
        path: names.camel.clone(),
        names,
        shape_ref: Some(target),
        config: Some(config.clone()),
    }
}

/// Whether an output member holds the resource's primary identifier.
fn is_primary_identifier(resource: &str, member: &str, configured: Option<&str>) -> bool {
    if let Some(configured) = configured {
        return member == configured;
    }
    let member = member.to_ascii_lowercase();
    member == "arn" || member == format!("{}arn", resource.to_ascii_lowercase())
}
