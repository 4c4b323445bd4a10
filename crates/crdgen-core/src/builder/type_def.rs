//! TypeDef and EnumDef derivation.

use std::collections::{BTreeMap, BTreeSet};

use crdgen_model::{Names, Shape, ShapeKind, ShapeRef};
use tracing::debug;

use super::view::ModelView;
use super::{
    Attr, AttrType, ELEMENT_SEPARATOR, EnumDef, EnumValue, MEMBER_SEPARATOR, Resource, TypeDef,
};
use crate::error::{GenerationError, GenerationResult};

/// Suffix appended to shapes whose type name collides with a generated type.
pub const CONFLICTING_NAME_SUFFIX: &str = "_SDK";

/// Maximum number of nested lists and maps looked through.
const MAX_CONTAINER_DEPTH: usize = 15;

/// Derive one [`TypeDef`] per reusable structure reachable from `resources`.
///
/// Returns the definitions sorted by shape name together with the shape
/// name to type name renames applied to resolve collisions.
pub(crate) fn build_type_defs(
    view: ModelView<'_>,
    resources: &[Resource],
) -> GenerationResult<(Vec<TypeDef>, BTreeMap<String, String>)> {
    let mut secret_overrides = collect_secret_overrides(view, resources)?;

    let payloads = view.model.payload_names();
    let mut candidates: BTreeMap<&str, &Shape> = BTreeMap::new();
    for field in resources.iter().flat_map(|r| r.fields.values()) {
        let Some(shape_ref) = &field.shape_ref else {
            continue;
        };
        if let Some(shape) = innermost_structure(view, shape_ref) {
            if !shape.is_exception && !payloads.contains(shape.name.as_str()) {
                candidates.insert(shape.name.as_str(), shape);
            }
        }
    }

    let generated: BTreeSet<String> = resources
        .iter()
        .flat_map(|r| [r.spec_type_name(), r.status_type_name()])
        .collect();

    let mut type_defs = Vec::with_capacity(candidates.len());
    let mut type_renames = BTreeMap::new();
    let mut taken: BTreeMap<String, String> = BTreeMap::new();

    for (shape_name, shape) in candidates {
        let names = Names::new(shape_name);
        let mut type_name = names.camel.clone();
        if generated.contains(&type_name) {
            type_name.push_str(CONFLICTING_NAME_SUFFIX);
            type_renames.insert(shape_name.to_owned(), type_name.clone());
        }
        if let Some(existing) = taken.insert(type_name.clone(), shape_name.to_owned()) {
            return Err(GenerationError::Schema(format!(
                "shapes {existing} and {shape_name} both map to type {type_name}"
            )));
        }

        let secrets = secret_overrides.remove(shape_name).unwrap_or_default();
        let attrs: BTreeMap<String, Attr> = view
            .members(shape)
            .map(|(member, target)| {
                let names = Names::new(member);
                let attr_type = if secrets.contains(&names.camel) {
                    AttrType::SecretKeyReference
                } else {
                    AttrType::Shape
                };
                (
                    member.to_owned(),
                    Attr {
                        names,
                        attr_type,
                        shape_ref: target.clone(),
                    },
                )
            })
            .collect();

        let matched = attrs
            .values()
            .filter(|a| a.attr_type == AttrType::SecretKeyReference)
            .count();
        if matched != secrets.len() {
            return Err(GenerationError::Schema(format!(
                "secret override on {shape_name} names an unknown attribute"
            )));
        }

        type_defs.push(TypeDef {
            names,
            type_name,
            shape_name: shape_name.to_owned(),
            attrs,
        });
    }

    if let Some((shape_name, _)) = secret_overrides.into_iter().next() {
        return Err(GenerationError::Schema(format!(
            "secret override targets shape {shape_name} which has no type definition"
        )));
    }

    debug!(
        type_defs = type_defs.len(),
        renames = type_renames.len(),
        "derived type definitions"
    );
    Ok((type_defs, type_renames))
}

/// Derive one [`EnumDef`] per visible enum shape.
pub(crate) fn build_enum_defs(view: ModelView<'_>) -> Vec<EnumDef> {
    view.model
        .shapes()
        .map(|(_, shape)| shape)
        .filter(|shape| shape.is_enum && !view.config.is_ignored_shape(&shape.name))
        .map(|shape| EnumDef {
            names: Names::new(shape.name.as_str()),
            values: shape
                .enum_values
                .iter()
                .map(|value| EnumValue {
                    original: value.clone(),
                    clean: clean_enum_value(value),
                })
                .collect(),
        })
        .collect()
}

/// Replace every non-alphanumeric character with `_`.
fn clean_enum_value(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Secret overrides on nested paths, as container shape name to attribute
/// names (UpperCamel).
fn collect_secret_overrides(
    view: ModelView<'_>,
    resources: &[Resource],
) -> GenerationResult<BTreeMap<String, BTreeSet<String>>> {
    let mut overrides: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for resource in resources {
        let resource_name = resource.names.original.as_str();
        for (path, field_config) in view.config.resource_fields(resource_name) {
            if !field_config.is_secret {
                continue;
            }
            let Some((parent, attr)) = split_parent(path) else {
                continue;
            };
            let parent_field = resource.fields.get(parent).ok_or_else(|| {
                GenerationError::Schema(format!(
                    "secret override {path} of {resource_name}: parent field {parent} not found"
                ))
            })?;
            let container = parent_field
                .shape_ref
                .as_ref()
                .and_then(|r| innermost_structure(view, r))
                .ok_or_else(|| {
                    GenerationError::Schema(format!(
                        "secret override {path} of {resource_name}: parent {parent} is not a structure"
                    ))
                })?;
            overrides
                .entry(container.name.clone())
                .or_default()
                .insert(Names::new(attr).camel);
        }
    }
    Ok(overrides)
}

/// Split `A.B..C` into `("A.B", "C")`; top-level paths yield `None`.
fn split_parent(path: &str) -> Option<(&str, &str)> {
    if let Some((parent, attr)) = path.rsplit_once(ELEMENT_SEPARATOR) {
        if !attr.contains(MEMBER_SEPARATOR) {
            return Some((parent, attr));
        }
    }
    path.rsplit_once(MEMBER_SEPARATOR)
}

/// The structure reached by looking through lists and maps, if any.
fn innermost_structure<'a>(view: ModelView<'a>, shape_ref: &ShapeRef) -> Option<&'a Shape> {
    let mut shape = view.resolve(shape_ref).ok()?;
    let mut depth = 0;
    loop {
        match &shape.kind {
            ShapeKind::Structure { .. } => return Some(shape),
            ShapeKind::List { member: element } | ShapeKind::Map { value: element, .. } => {
                depth += 1;
                if depth > MAX_CONTAINER_DEPTH {
                    return None;
                }
                shape = view.resolve(element).ok()?;
            }
            ShapeKind::Scalar { .. } => return None,
        }
    }
}
