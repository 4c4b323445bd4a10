//! Declarative generator configuration.
//!
//! These types are deserialized by an external loader (YAML, TOML or JSON);
//! keys are snake_case and every section is optional.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Generator configuration for one API version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct GeneratorConfig {
    /// Things the generator must pretend do not exist.
    pub ignore: IgnoreSpec,
    /// Per-resource configuration, keyed by resource name.
    pub resources: BTreeMap<String, ResourceConfig>,
}

/// Ignore rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct IgnoreSpec {
    /// Resource names to skip.
    pub resource_names: BTreeSet<String>,
    /// Operation names to drop.
    pub operations: BTreeSet<String>,
    /// Shape names to hide.
    pub shape_names: BTreeSet<String>,
    /// `Shape.Member` paths to hide.
    pub field_paths: BTreeSet<String>,
}

/// Per-resource configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ResourceConfig {
    /// Field renames per operation.
    pub renames: Option<RenamesConfig>,
    /// Per-field overrides, keyed by field path.
    pub fields: BTreeMap<String, FieldConfig>,
    /// Flatten the `Attributes` map into named fields.
    pub unpack_attributes_map: bool,
    /// Output member holding the resource's primary identifier.
    pub primary_identifier: Option<String>,
}

/// Rename rules keyed by operation name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct RenamesConfig {
    /// Renames per operation.
    pub operations: BTreeMap<String, OperationRenames>,
}

/// Renames of one operation's fields, old name to new name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct OperationRenames {
    /// Input member renames.
    pub input_fields: BTreeMap<String, String>,
    /// Output member renames.
    pub output_fields: BTreeMap<String, String>,
}

/// Per-field overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct FieldConfig {
    /// The field holds a secret and is rendered as a secret-key reference.
    pub is_secret: bool,
    /// The field is observed, never set by the user.
    pub is_read_only: bool,
    /// The field comes from the unpacked attribute map.
    pub is_attribute: bool,
    /// The field is sourced from another operation.
    pub from: Option<SourceFieldConfig>,
}

/// Where a sourced field comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SourceFieldConfig {
    /// Operation whose input (spec) or output (status) holds the field.
    pub operation: String,
    /// Dotted member path inside that shape.
    pub path: String,
}

impl GeneratorConfig {
    /// Parse a JSON configuration document.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Whether a resource is ignored.
    #[must_use]
    pub fn is_ignored_resource(&self, name: &str) -> bool {
        self.ignore.resource_names.contains(name)
    }

    /// Whether an operation is ignored.
    #[must_use]
    pub fn is_ignored_operation(&self, name: &str) -> bool {
        self.ignore.operations.contains(name)
    }

    /// Whether a shape is ignored.
    #[must_use]
    pub fn is_ignored_shape(&self, name: &str) -> bool {
        self.ignore.shape_names.contains(name)
    }

    /// Whether `Shape.Member` is ignored.
    #[must_use]
    pub fn is_ignored_member(&self, shape: &str, member: &str) -> bool {
        self.ignore.field_paths.contains(&format!("{shape}.{member}"))
    }

    /// The configuration of a resource, if any.
    #[must_use]
    pub fn resource(&self, name: &str) -> Option<&ResourceConfig> {
        self.resources.get(name)
    }

    /// Field overrides of a resource.
    pub fn resource_fields(&self, name: &str) -> impl Iterator<Item = (&String, &FieldConfig)> {
        self.resource(name).into_iter().flat_map(|r| r.fields.iter())
    }

    /// The override for one field path of a resource.
    #[must_use]
    pub fn field(&self, resource: &str, path: &str) -> Option<&FieldConfig> {
        self.resource(resource).and_then(|r| r.fields.get(path))
    }

    /// Whether a resource flattens its attribute map.
    #[must_use]
    pub fn unpacks_attributes_map(&self, resource: &str) -> bool {
        self.resource(resource)
            .is_some_and(|r| r.unpack_attributes_map)
    }

    /// Input renames configured for an operation of a resource.
    #[must_use]
    pub fn input_field_renames(&self, resource: &str, operation: &str) -> BTreeMap<String, String> {
        self.resource(resource)
            .and_then(|r| r.renames.as_ref())
            .and_then(|r| r.operations.get(operation))
            .map(|o| o.input_fields.clone())
            .unwrap_or_default()
    }
}
