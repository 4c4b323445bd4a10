//! The shape arena.
//!
//! A [`ShapeModel`] owns every shape of one API version in a flat vector and
//! hands out [`ShapeId`] indices. Members reference other shapes through a
//! [`ShapeRef`], which keeps the referenced name next to the resolved id so a
//! dangling reference can still be reported by name.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use crate::error::{ModelError, ModelResult};

/// Index of a shape inside its owning [`ShapeModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ShapeId(pub usize);

/// The scalar subkinds a shape can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScalarKind {
    /// `true` / `false`.
    Boolean,
    /// UTF-8 text.
    String,
    /// A single character, carried as text.
    Character,
    /// 8-bit integer.
    Byte,
    /// 16-bit integer.
    Short,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    Long,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// Point in time.
    Timestamp,
    /// Opaque bytes.
    Blob,
}

impl ScalarKind {
    /// The lowercase name of the subkind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Character => "character",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Timestamp => "timestamp",
            Self::Blob => "blob",
        }
    }

    /// Whether values of this subkind are whole numbers.
    #[must_use]
    pub fn is_integral(self) -> bool {
        matches!(self, Self::Byte | Self::Short | Self::Integer | Self::Long)
    }

    /// Whether values of this subkind are floating point numbers.
    #[must_use]
    pub fn is_floating(self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }
}

/// A reference from one shape (or operation) to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeRef {
    /// Name of the referenced shape.
    pub shape_name: String,
    /// Resolved target, `None` when the name did not resolve.
    pub target: Option<ShapeId>,
}

impl ShapeRef {
    /// A reference that points nowhere.
    #[must_use]
    pub fn dangling(shape_name: impl Into<String>) -> Self {
        Self {
            shape_name: shape_name.into(),
            target: None,
        }
    }
}

/// The structural kind of a shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ShapeKind {
    /// A leaf value.
    Scalar {
        /// The scalar subkind.
        scalar: ScalarKind,
    },
    /// Named members, each referencing another shape.
    Structure {
        /// Members sorted by name.
        members: BTreeMap<String, ShapeRef>,
    },
    /// A homogeneous list.
    List {
        /// The element shape.
        member: ShapeRef,
    },
    /// A homogeneous map.
    Map {
        /// The key shape.
        key: ShapeRef,
        /// The value shape.
        value: ShapeRef,
    },
}

/// A typed node in the API type graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    /// Short shape name.
    pub name: String,
    /// Structural kind.
    pub kind: ShapeKind,
    /// Whether the shape is an enumeration of string values.
    pub is_enum: bool,
    /// Enumeration values in declaration order.
    pub enum_values: Vec<String>,
    /// Whether the shape describes an error.
    pub is_exception: bool,
    /// Whether the shape is used as an operation output.
    pub used_as_output: bool,
}

impl Shape {
    /// The structure members, or `None` for other kinds.
    #[must_use]
    pub fn members(&self) -> Option<&BTreeMap<String, ShapeRef>> {
        match &self.kind {
            ShapeKind::Structure { members } => Some(members),
            _ => None,
        }
    }

    /// The scalar subkind, or `None` for composite kinds.
    #[must_use]
    pub fn scalar(&self) -> Option<ScalarKind> {
        match self.kind {
            ShapeKind::Scalar { scalar } => Some(scalar),
            _ => None,
        }
    }

    /// Whether this is a structure shape.
    #[must_use]
    pub fn is_structure(&self) -> bool {
        matches!(self.kind, ShapeKind::Structure { .. })
    }
}

/// An API operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Operation name, e.g. `CreateBucket`.
    pub name: String,
    /// Input shape, if any.
    pub input: Option<ShapeRef>,
    /// Output shape, if any.
    pub output: Option<ShapeRef>,
}

/// An immutable arena of shapes plus the operations referencing them.
#[derive(Debug, Clone, Default)]
pub struct ShapeModel {
    shapes: Vec<Shape>,
    by_name: BTreeMap<String, ShapeId>,
    operations: BTreeMap<String, Operation>,
}

impl ShapeModel {
    /// Start building a model programmatically.
    #[must_use]
    pub fn builder() -> ShapeModelBuilder {
        ShapeModelBuilder::default()
    }

    /// Look up a shape by id.
    #[must_use]
    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(id.0)
    }

    /// Follow a reference, failing with [`ModelError::NilShape`] when it dangles.
    pub fn resolve(&self, shape_ref: &ShapeRef) -> ModelResult<&Shape> {
        shape_ref
            .target
            .and_then(|id| self.get(id))
            .ok_or_else(|| ModelError::NilShape {
                shape: shape_ref.shape_name.clone(),
            })
    }

    /// Look up a shape by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Shape> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }

    /// The id assigned to a shape name.
    #[must_use]
    pub fn shape_id(&self, name: &str) -> Option<ShapeId> {
        self.by_name.get(name).copied()
    }

    /// A resolved reference to a named shape.
    #[must_use]
    pub fn shape_ref(&self, name: &str) -> ShapeRef {
        ShapeRef {
            shape_name: name.to_owned(),
            target: self.shape_id(name),
        }
    }

    /// All shapes, in id order.
    pub fn shapes(&self) -> impl Iterator<Item = (ShapeId, &Shape)> {
        self.shapes
            .iter()
            .enumerate()
            .map(|(idx, shape)| (ShapeId(idx), shape))
    }

    /// All operations, sorted by name.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.values()
    }

    /// Look up an operation by name.
    #[must_use]
    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.get(name)
    }

    /// Names of every shape used as an operation input or output.
    #[must_use]
    pub fn payload_names(&self) -> BTreeSet<&str> {
        self.operations
            .values()
            .flat_map(|op| op.input.iter().chain(op.output.iter()))
            .map(|r| r.shape_name.as_str())
            .collect()
    }

    /// Walk a dotted member path starting at a structure.
    ///
    /// Lists and maps crossed on the way are entered through their element or
    /// value shape. Returns `None` when any segment does not resolve.
    #[must_use]
    pub fn member_at_path<'a>(&'a self, root: &'a ShapeRef, path: &str) -> Option<&'a ShapeRef> {
        let mut current = root;
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            let mut shape = self.resolve(current).ok()?;
            loop {
                match &shape.kind {
                    ShapeKind::List { member } => shape = self.resolve(member).ok()?,
                    ShapeKind::Map { value, .. } => shape = self.resolve(value).ok()?,
                    _ => break,
                }
            }
            current = shape.members()?.get(segment)?;
        }
        Some(current)
    }

    /// Whether a shape is built only from scalars, looking through lists and maps.
    #[must_use]
    pub fn is_scalar_only(&self, shape_ref: &ShapeRef) -> bool {
        let mut visited = HashSet::new();
        self.is_scalar_only_inner(shape_ref, &mut visited)
    }

    fn is_scalar_only_inner(&self, shape_ref: &ShapeRef, visited: &mut HashSet<ShapeId>) -> bool {
        let Some(id) = shape_ref.target else {
            return false;
        };
        if !visited.insert(id) {
            return false;
        }
        let result = match self.get(id).map(|s| &s.kind) {
            Some(ShapeKind::Scalar { .. }) => true,
            Some(ShapeKind::List { member }) => self.is_scalar_only_inner(member, visited),
            Some(ShapeKind::Map { key, value }) => {
                self.is_scalar_only_inner(key, visited) && self.is_scalar_only_inner(value, visited)
            }
            Some(ShapeKind::Structure { .. }) | None => false,
        };
        visited.remove(&id);
        result
    }
}

#[derive(Debug, Clone)]
enum PendingKind {
    Scalar(ScalarKind),
    Structure(BTreeMap<String, String>),
    List(String),
    Map(String, String),
}

#[derive(Debug, Clone)]
struct PendingShape {
    kind: PendingKind,
    enum_values: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
struct PendingOperation {
    input: Option<String>,
    output: Option<String>,
}

/// Programmatic front end for [`ShapeModel`].
///
/// Shapes may reference names that are declared later or never; unresolved
/// names become dangling [`ShapeRef`]s in the built model.
#[derive(Debug, Clone, Default)]
pub struct ShapeModelBuilder {
    shapes: BTreeMap<String, PendingShape>,
    operations: BTreeMap<String, PendingOperation>,
    exceptions: BTreeSet<String>,
    outputs: BTreeSet<String>,
}

impl ShapeModelBuilder {
    /// Declare a scalar shape.
    #[must_use]
    pub fn scalar(mut self, name: impl Into<String>, kind: ScalarKind) -> Self {
        self.shapes.insert(
            name.into(),
            PendingShape {
                kind: PendingKind::Scalar(kind),
                enum_values: None,
            },
        );
        self
    }

    /// Declare a string enumeration.
    #[must_use]
    pub fn enumeration<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.shapes.insert(
            name.into(),
            PendingShape {
                kind: PendingKind::Scalar(ScalarKind::String),
                enum_values: Some(values.into_iter().map(Into::into).collect()),
            },
        );
        self
    }

    /// Declare a structure from `(member name, target shape name)` pairs.
    #[must_use]
    pub fn structure<I, K, V>(mut self, name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let members = members
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.shapes.insert(
            name.into(),
            PendingShape {
                kind: PendingKind::Structure(members),
                enum_values: None,
            },
        );
        self
    }

    /// Declare a list of `member`.
    #[must_use]
    pub fn list(mut self, name: impl Into<String>, member: impl Into<String>) -> Self {
        self.shapes.insert(
            name.into(),
            PendingShape {
                kind: PendingKind::List(member.into()),
                enum_values: None,
            },
        );
        self
    }

    /// Declare a map from `key` to `value`.
    #[must_use]
    pub fn map(
        mut self,
        name: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.shapes.insert(
            name.into(),
            PendingShape {
                kind: PendingKind::Map(key.into(), value.into()),
                enum_values: None,
            },
        );
        self
    }

    /// Mark a shape as an error shape.
    #[must_use]
    pub fn exception(mut self, name: impl Into<String>) -> Self {
        self.exceptions.insert(name.into());
        self
    }

    /// Mark a shape as used as an operation output.
    #[must_use]
    pub fn output(mut self, name: impl Into<String>) -> Self {
        self.outputs.insert(name.into());
        self
    }

    /// Declare an operation.
    #[must_use]
    pub fn operation(
        mut self,
        name: impl Into<String>,
        input: Option<&str>,
        output: Option<&str>,
    ) -> Self {
        self.operations.insert(
            name.into(),
            PendingOperation {
                input: input.map(str::to_owned),
                output: output.map(str::to_owned),
            },
        );
        self
    }

    /// Whether a shape with this name has been declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.shapes.contains_key(name)
    }

    /// Resolve every name and freeze the model.
    #[must_use]
    pub fn build(self) -> ShapeModel {
        let by_name: BTreeMap<String, ShapeId> = self
            .shapes
            .keys()
            .enumerate()
            .map(|(idx, name)| (name.clone(), ShapeId(idx)))
            .collect();
        let make_ref = |name: &str| ShapeRef {
            shape_name: name.to_owned(),
            target: by_name.get(name).copied(),
        };

        let output_names: BTreeSet<&str> = self
            .operations
            .values()
            .filter_map(|op| op.output.as_deref())
            .chain(self.outputs.iter().map(String::as_str))
            .collect();

        let shapes = self
            .shapes
            .iter()
            .map(|(name, pending)| {
                let kind = match &pending.kind {
                    PendingKind::Scalar(scalar) => ShapeKind::Scalar { scalar: *scalar },
                    PendingKind::Structure(members) => ShapeKind::Structure {
                        members: members
                            .iter()
                            .map(|(member, target)| (member.clone(), make_ref(target)))
                            .collect(),
                    },
                    PendingKind::List(member) => ShapeKind::List {
                        member: make_ref(member),
                    },
                    PendingKind::Map(key, value) => ShapeKind::Map {
                        key: make_ref(key),
                        value: make_ref(value),
                    },
                };
                Shape {
                    name: name.clone(),
                    kind,
                    is_enum: pending.enum_values.is_some(),
                    enum_values: pending.enum_values.clone().unwrap_or_default(),
                    is_exception: self.exceptions.contains(name),
                    used_as_output: output_names.contains(name.as_str()),
                }
            })
            .collect();

        let operations = self
            .operations
            .iter()
            .map(|(name, op)| {
                (
                    name.clone(),
                    Operation {
                        name: name.clone(),
                        input: op.input.as_deref().map(make_ref),
                        output: op.output.as_deref().map(make_ref),
                    },
                )
            })
            .collect();

        ShapeModel {
            shapes,
            by_name,
            operations,
        }
    }
}
