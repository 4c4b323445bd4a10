//! Resource model construction.
//!
//! Turns the operations of one API version into Kubernetes resources: every
//! non-ignored `Create*` operation anchors one resource whose Spec comes from
//! the operation input and whose Status comes from the operation output.
//! Nested fields are materialized recursively, and the reusable structure
//! types reachable from those fields become [`TypeDef`]s.

mod resource;
mod type_def;
mod view;

use std::collections::BTreeMap;

use crdgen_model::{FieldConfig, Names, OpType, ShapeRef};
use serde::Serialize;

use crate::error::GenerationError;

pub use resource::ResourceBuilder;
use type_def::{build_enum_defs, build_type_defs};

pub use type_def::CONFLICTING_NAME_SUFFIX;

/// Separator between structure members in a field path.
pub const MEMBER_SEPARATOR: &str = ".";
/// Separator between a collection and the members of its element.
pub const ELEMENT_SEPARATOR: &str = "..";

/// One field of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Field name spellings.
    pub names: Names,
    /// Dotted path from the resource root.
    pub path: String,
    /// The field's shape; absent only for unpacked attributes.
    pub shape_ref: Option<ShapeRef>,
    /// Per-field overrides.
    pub config: Option<FieldConfig>,
}

impl Field {
    /// Whether the field holds a secret.
    #[must_use]
    pub fn is_secret(&self) -> bool {
        self.config.as_ref().is_some_and(|c| c.is_secret)
    }

    /// Whether the field is read only.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.config.as_ref().is_some_and(|c| c.is_read_only)
    }

    /// Whether the field comes from the unpacked attribute map.
    #[must_use]
    pub fn is_attribute(&self) -> bool {
        self.config.as_ref().is_some_and(|c| c.is_attribute)
    }
}

/// A custom resource derived from one create operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Resource name spellings.
    pub names: Names,
    /// Spec fields keyed by field name.
    pub spec_fields: BTreeMap<String, Field>,
    /// Status fields keyed by field name.
    pub status_fields: BTreeMap<String, Field>,
    /// Every top-level and nested field keyed by path.
    pub fields: BTreeMap<String, Field>,
    /// Operation name per lifecycle role.
    pub ops: BTreeMap<OpType, String>,
    /// Output member stored in the reserved metadata slot.
    pub primary_identifier: Option<String>,
    /// Create input renames, old name to new name.
    pub input_renames: BTreeMap<String, String>,
}

impl Resource {
    /// Name of the generated Spec type.
    #[must_use]
    pub fn spec_type_name(&self) -> String {
        format!("{}Spec", self.names.camel)
    }

    /// Name of the generated Status type.
    #[must_use]
    pub fn status_type_name(&self) -> String {
        format!("{}Status", self.names.camel)
    }
}

/// How an attribute of a [`TypeDef`] is typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum AttrType {
    /// The type of the attribute's own shape.
    Shape,
    /// A reference to a key inside a Kubernetes secret.
    SecretKeyReference,
}

/// One attribute of a [`TypeDef`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attr {
    /// Attribute name spellings.
    pub names: Names,
    /// How the attribute is typed.
    pub attr_type: AttrType,
    /// The attribute's shape.
    pub shape_ref: ShapeRef,
}

/// A reusable named structure type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDef {
    /// Names of the originating shape.
    pub names: Names,
    /// Generated type name, after conflict renames.
    pub type_name: String,
    /// Name of the originating shape.
    pub shape_name: String,
    /// Attributes keyed by member name.
    pub attrs: BTreeMap<String, Attr>,
}

/// One value of an [`EnumDef`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumValue {
    /// The value as it appears on the wire.
    pub original: String,
    /// A valid identifier derived from the value.
    pub clean: String,
}

/// An enumeration type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumDef {
    /// Names of the originating shape.
    pub names: Names,
    /// Values in declaration order.
    pub values: Vec<EnumValue>,
}

/// A resource that could not be built.
#[derive(Debug)]
pub struct ResourceFailure {
    /// The resource name.
    pub resource: String,
    /// Why it failed.
    pub error: GenerationError,
}

/// Everything derived from one API version.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiModel {
    /// Successfully built resources, sorted by name.
    pub resources: Vec<Resource>,
    /// Reusable structure types, sorted by type name.
    pub type_defs: Vec<TypeDef>,
    /// Enumeration types, sorted by name.
    pub enum_defs: Vec<EnumDef>,
    /// Shape name to generated type name, for renamed shapes only.
    pub type_renames: BTreeMap<String, String>,
    /// Resources that failed to build.
    #[serde(skip)]
    pub failures: Vec<ResourceFailure>,
}

impl ApiModel {
    /// Look up a resource by name.
    #[must_use]
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.names.original == name)
    }

    /// Look up a type definition by originating shape name.
    #[must_use]
    pub fn type_def(&self, shape_name: &str) -> Option<&TypeDef> {
        self.type_defs.iter().find(|t| t.shape_name == shape_name)
    }
}
