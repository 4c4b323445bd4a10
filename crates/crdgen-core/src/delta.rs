//! Cross-version field delta computation.
//!
//! Compares the Spec (or Status) fields of one resource in a spoke version
//! with the same resource in the hub version and classifies every field
//! name found on either side exactly once.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use crdgen_model::{Shape, ShapeId, ShapeKind, ShapeModel, ShapeRef};
use serde::Serialize;
use tracing::debug;

use crate::builder::{ApiModel, AttrType, Field, Resource};
use crate::error::{GenerationError, GenerationResult};

/// How a field changed between two versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeType {
    /// Same name, same shape.
    Intact,
    /// Renamed, same shape expected.
    Renamed,
    /// Only present in the hub.
    Added,
    /// Only present in the spoke.
    Removed,
    /// Same name, different shape.
    ShapeChanged,
    /// Same name, became a secret in the hub.
    ShapeChangedToSecret,
    /// Could not be classified.
    Unknown,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Intact => "intact",
            Self::Renamed => "renamed",
            Self::Added => "added",
            Self::Removed => "removed",
            Self::ShapeChanged => "shape-changed",
            Self::ShapeChangedToSecret => "shape-changed-to-secret",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// The classified difference of one field.
#[derive(Debug, Clone, Copy)]
pub struct FieldDelta<'a> {
    /// The kind of change.
    pub change_type: ChangeType,
    /// The field in the spoke version, absent for added fields.
    pub spoke: Option<&'a Field>,
    /// The field in the hub version, absent for removed fields.
    pub hub: Option<&'a Field>,
}

impl FieldDelta<'_> {
    /// The field's name, preferring the hub spelling.
    #[must_use]
    pub fn name(&self) -> &str {
        self.hub
            .or(self.spoke)
            .map_or("", |f| f.names.original.as_str())
    }
}

/// Spec and status deltas of one resource pair.
#[derive(Debug, Clone)]
pub struct ResourceDelta<'a> {
    /// Resource name.
    pub resource: String,
    /// Spec field deltas.
    pub spec: Vec<FieldDelta<'a>>,
    /// Status field deltas.
    pub status: Vec<FieldDelta<'a>>,
}

/// An injective field rename mapping, old name to new name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameMap {
    old_to_new: BTreeMap<String, String>,
    new_to_old: BTreeMap<String, String>,
}

impl RenameMap {
    /// Build the mapping, rejecting two old names sharing one new name.
    pub fn new(old_to_new: BTreeMap<String, String>) -> GenerationResult<Self> {
        let mut new_to_old = BTreeMap::new();
        for (old, new) in &old_to_new {
            if let Some(previous) = new_to_old.insert(new.clone(), old.clone()) {
                return Err(GenerationError::RenameInconsistency(format!(
                    "fields {previous} and {old} are both renamed to {new}"
                )));
            }
        }
        Ok(Self {
            old_to_new,
            new_to_old,
        })
    }

    /// The new name of a renamed field.
    #[must_use]
    pub fn new_name(&self, old: &str) -> Option<&str> {
        self.old_to_new.get(old).map(String::as_str)
    }

    /// The old name of a renamed field.
    #[must_use]
    pub fn old_name(&self, new: &str) -> Option<&str> {
        self.new_to_old.get(new).map(String::as_str)
    }
}

/// The shape model of one version together with the types generated from it.
#[derive(Debug, Clone, Copy)]
pub struct Schema<'a> {
    /// The version's shape model.
    pub model: &'a ShapeModel,
    /// Resources and type definitions built from the model.
    pub api: &'a ApiModel,
}

impl<'a> Schema<'a> {
    /// Pair a model with the types built from it.
    #[must_use]
    pub fn new(model: &'a ShapeModel, api: &'a ApiModel) -> Self {
        Self { model, api }
    }

    /// Compare a shape of this version with a shape of `hub` as generated
    /// types.
    ///
    /// Structures are compared through their type definitions, so ignored
    /// members are left out and nested secret overrides count. Returns
    /// [`ChangeType::Intact`], [`ChangeType::ShapeChangedToSecret`] when the
    /// only difference is a member becoming a secret in the hub, or
    /// [`ChangeType::ShapeChanged`]. Pairs already under comparison are
    /// assumed intact, so cyclic shapes terminate.
    #[must_use]
    pub fn compare(&self, a: &ShapeRef, hub: &Schema<'_>, b: &ShapeRef) -> ChangeType {
        let mut assumed = HashSet::new();
        self.compare_inner(a, hub, b, &mut assumed)
    }

    fn compare_inner(
        &self,
        a: &ShapeRef,
        hub: &Schema<'_>,
        b: &ShapeRef,
        assumed: &mut HashSet<(ShapeId, ShapeId)>,
    ) -> ChangeType {
        let (left, right) = match (a.target, b.target) {
            (None, None) if a.shape_name == b.shape_name => return ChangeType::Intact,
            (Some(left), Some(right)) => (left, right),
            _ => return ChangeType::ShapeChanged,
        };
        if !assumed.insert((left, right)) {
            return ChangeType::Intact;
        }
        let (Some(sa), Some(sb)) = (self.model.get(left), hub.model.get(right)) else {
            return ChangeType::ShapeChanged;
        };
        if sa.is_enum != sb.is_enum || sa.enum_values != sb.enum_values {
            return ChangeType::ShapeChanged;
        }
        match (&sa.kind, &sb.kind) {
            (ShapeKind::Scalar { scalar: x }, ShapeKind::Scalar { scalar: y }) if x == y => {
                ChangeType::Intact
            }
            (ShapeKind::List { member: ea }, ShapeKind::List { member: eb }) => {
                self.compare_inner(ea, hub, eb, assumed)
            }
            (
                ShapeKind::Map { key: ka, value: va },
                ShapeKind::Map { key: kb, value: vb },
            ) => {
                let keys = self.compare_inner(ka, hub, kb, assumed);
                worse(keys, self.compare_inner(va, hub, vb, assumed))
            }
            (ShapeKind::Structure { .. }, ShapeKind::Structure { .. }) if sa.name == sb.name => {
                let ma = self.members(sa);
                let mb = hub.members(sb);
                if !ma.keys().eq(mb.keys()) {
                    return ChangeType::ShapeChanged;
                }
                ma.values()
                    .zip(mb.values())
                    .map(|(&(ra, secret_a), &(rb, secret_b))| match (secret_a, secret_b) {
                        (false, true) => ChangeType::ShapeChangedToSecret,
                        (true, false) => ChangeType::ShapeChanged,
                        (true, true) => ChangeType::Intact,
                        (false, false) => self.compare_inner(ra, hub, rb, assumed),
                    })
                    .fold(ChangeType::Intact, worse)
            }
            _ => ChangeType::ShapeChanged,
        }
    }

    /// Generated members of a structure, with whether each one is a secret
    /// reference. Structures without a type definition use their raw members.
    pub(crate) fn members(&self, shape: &'a Shape) -> BTreeMap<&'a str, (&'a ShapeRef, bool)> {
        match self.api.type_def(&shape.name) {
            Some(type_def) => type_def
                .attrs
                .iter()
                .map(|(name, attr)| {
                    let secret = attr.attr_type == AttrType::SecretKeyReference;
                    (name.as_str(), (&attr.shape_ref, secret))
                })
                .collect(),
            None => shape
                .members()
                .into_iter()
                .flatten()
                .map(|(name, target)| (name.as_str(), (target, false)))
                .collect(),
        }
    }
}

/// The more severe of two comparison outcomes.
fn worse(a: ChangeType, b: ChangeType) -> ChangeType {
    match (a, b) {
        (ChangeType::Intact, other) | (other, ChangeType::Intact) => other,
        (ChangeType::ShapeChangedToSecret, ChangeType::ShapeChangedToSecret) => {
            ChangeType::ShapeChangedToSecret
        }
        _ => ChangeType::ShapeChanged,
    }
}

/// One side of a comparison: a field map and the schema its shapes live in.
#[derive(Debug, Clone, Copy)]
pub struct FieldSet<'a> {
    /// Fields keyed by name.
    pub fields: &'a BTreeMap<String, Field>,
    /// The model and generated types of the fields' version.
    pub schema: Schema<'a>,
}

impl<'a> FieldSet<'a> {
    /// Pair a field map with its schema.
    #[must_use]
    pub fn new(fields: &'a BTreeMap<String, Field>, schema: Schema<'a>) -> Self {
        Self { fields, schema }
    }
}

/// Compute the deltas between spoke and hub fields.
///
/// Spoke names are visited in sorted order first, then every hub name not
/// matched so far is reported as added.
pub fn compute_fields_delta<'a>(
    spoke: FieldSet<'a>,
    hub: FieldSet<'a>,
    renames: &RenameMap,
) -> GenerationResult<Vec<FieldDelta<'a>>> {
    let mut deltas = Vec::with_capacity(spoke.fields.len().max(hub.fields.len()));
    let mut visited: BTreeSet<&str> = BTreeSet::new();

    for (name, spoke_field) in spoke.fields {
        if visited.contains(name.as_str()) {
            continue;
        }
        if let Some(hub_field) = hub.fields.get(name) {
            visited.insert(name);
            let change_type = classify_same_name(spoke, spoke_field, hub, hub_field);
            deltas.push(FieldDelta {
                change_type,
                spoke: Some(spoke_field),
                hub: Some(hub_field),
            });
            continue;
        }

        if let Some(new_name) = renames.new_name(name) {
            let Some((hub_name, hub_field)) = hub.fields.get_key_value(new_name) else {
                return Err(GenerationError::RenameInconsistency(format!(
                    "field {name} is renamed to {new_name} which is missing in the hub"
                )));
            };
            if spoke.fields.contains_key(new_name) {
                return Err(GenerationError::RenameInconsistency(format!(
                    "field {name} is renamed to {new_name} which also exists in the spoke"
                )));
            }
            visited.insert(name);
            visited.insert(hub_name);
            deltas.push(FieldDelta {
                change_type: ChangeType::Renamed,
                spoke: Some(spoke_field),
                hub: Some(hub_field),
            });
            continue;
        }

        deltas.push(FieldDelta {
            change_type: ChangeType::Removed,
            spoke: Some(spoke_field),
            hub: None,
        });
    }

    for (name, hub_field) in hub.fields {
        if visited.contains(name.as_str()) {
            continue;
        }
        deltas.push(FieldDelta {
            change_type: ChangeType::Added,
            spoke: None,
            hub: Some(hub_field),
        });
    }

    Ok(deltas)
}

fn classify_same_name(
    spoke: FieldSet<'_>,
    spoke_field: &Field,
    hub: FieldSet<'_>,
    hub_field: &Field,
) -> ChangeType {
    if !spoke_field.is_secret() && hub_field.is_secret() {
        return ChangeType::ShapeChangedToSecret;
    }
    if spoke_field.is_secret() != hub_field.is_secret() {
        return ChangeType::ShapeChanged;
    }
    match (&spoke_field.shape_ref, &hub_field.shape_ref) {
        (None, None) => ChangeType::Intact,
        (Some(a), Some(b)) => spoke.schema.compare(a, &hub.schema, b),
        _ => ChangeType::ShapeChanged,
    }
}

/// Compute Spec and Status deltas between a spoke resource and its hub
/// counterpart, using the hub's create input renames.
pub fn compute_resource_delta<'a>(
    spoke: &'a Resource,
    spoke_schema: Schema<'a>,
    hub: &'a Resource,
    hub_schema: Schema<'a>,
) -> GenerationResult<ResourceDelta<'a>> {
    let renames = RenameMap::new(hub.input_renames.clone())?;
    let spec = compute_fields_delta(
        FieldSet::new(&spoke.spec_fields, spoke_schema),
        FieldSet::new(&hub.spec_fields, hub_schema),
        &renames,
    )?;
    let status = compute_fields_delta(
        FieldSet::new(&spoke.status_fields, spoke_schema),
        FieldSet::new(&hub.status_fields, hub_schema),
        &renames,
    )?;
    debug!(
        resource = %hub.names.original,
        spec = spec.len(),
        status = status.len(),
        "computed resource delta"
    );
    Ok(ResourceDelta {
        resource: hub.names.original.clone(),
        spec,
        status,
    })
}
