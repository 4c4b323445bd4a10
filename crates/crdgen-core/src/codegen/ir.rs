//! Target-independent statements of a conversion function.

use std::fmt;

use crdgen_model::{Names, ScalarKind};

use super::annotation::AnnotationTag;

/// Name of the source object inside a conversion function.
pub const SRC: &str = "src";
/// Name of the destination object inside a conversion function.
pub const DST: &str = "dst";
/// Member holding object metadata.
pub const OBJECT_META: &str = "ObjectMeta";
/// Member of the metadata holding annotations.
pub const ANNOTATIONS: &str = "Annotations";

/// Which way a conversion goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Spoke version to hub version.
    ToHub,
    /// Hub version to spoke version.
    FromHub,
}

/// A storage location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Place {
    /// A local variable or function parameter.
    Var(String),
    /// A named member of another place.
    Member(Box<Place>, String),
}

impl Place {
    /// A variable.
    #[must_use]
    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(name.into())
    }

    /// A member of this place.
    #[must_use]
    pub fn member(&self, name: impl Into<String>) -> Self {
        Self::Member(Box::new(self.clone()), name.into())
    }

    /// The variable at the root of the place and the member path below it.
    #[must_use]
    pub fn split(&self) -> (&str, Vec<&str>) {
        match self {
            Self::Var(name) => (name.as_str(), Vec::new()),
            Self::Member(parent, member) => {
                let (root, mut path) = parent.split();
                path.push(member.as_str());
                (root, path)
            }
        }
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Var(name) => f.write_str(name),
            Self::Member(parent, member) => write!(f, "{parent}.{member}"),
        }
    }
}

/// The type of an allocated or declared value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// A scalar.
    Scalar(ScalarKind),
    /// A generated structure type, qualified by package alias when foreign.
    Named {
        /// Package alias, `None` for the current package.
        package: Option<String>,
        /// Type name.
        name: String,
    },
    /// A list of elements.
    List(Box<TypeExpr>),
    /// A map from keys to values.
    Map(Box<TypeExpr>, Box<TypeExpr>),
}

/// One statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// A comment line.
    Comment(String),
    /// `dst = src`.
    Assign {
        /// Target.
        dst: Place,
        /// Source.
        src: Place,
    },
    /// Bind `var` to a fresh empty value of `ty`, pre-sized after `len_of`.
    Allocate {
        /// Variable name.
        var: String,
        /// Allocated type.
        ty: TypeExpr,
        /// Collection whose length sizes the allocation.
        len_of: Option<Place>,
    },
    /// Bind `var` to the zero value of `ty`.
    Declare {
        /// Variable name.
        var: String,
        /// Declared type.
        ty: TypeExpr,
    },
    /// Run `body` only when `cond` is set.
    Guard {
        /// The checked place.
        cond: Place,
        /// Guarded statements.
        body: Vec<Stmt>,
    },
    /// Iterate over list elements.
    ForEachList {
        /// Element variable.
        elem: String,
        /// Iterated list.
        list: Place,
        /// Loop body.
        body: Vec<Stmt>,
    },
    /// Iterate over map entries.
    ForEachMap {
        /// Key variable.
        key: String,
        /// Value variable.
        val: String,
        /// Iterated map.
        map: Place,
        /// Loop body.
        body: Vec<Stmt>,
    },
    /// Append `value` to the list variable `list`.
    Append {
        /// List variable.
        list: String,
        /// Appended value.
        value: Place,
    },
    /// Insert `value` under `key` into the map variable `map`.
    Insert {
        /// Map variable.
        map: String,
        /// Key.
        key: Place,
        /// Value.
        value: Place,
    },
    /// Store `value` in a destination annotation.
    EncodeAnnotation {
        /// Annotation key.
        key: String,
        /// Payload encoding.
        tag: AnnotationTag,
        /// Encoded value.
        value: Place,
    },
    /// Move a destination annotation, if present, into `target`.
    DecodeAnnotation {
        /// Annotation key.
        key: String,
        /// Payload encoding.
        tag: AnnotationTag,
        /// Decoded target.
        target: Place,
    },
}

impl Stmt {
    /// Whether this statement or any nested one touches annotations.
    #[must_use]
    pub fn uses_annotations(&self) -> bool {
        match self {
            Self::EncodeAnnotation { .. } | Self::DecodeAnnotation { .. } => true,
            Self::Guard { body, .. }
            | Self::ForEachList { body, .. }
            | Self::ForEachMap { body, .. } => body.iter().any(Self::uses_annotations),
            _ => false,
        }
    }
}

/// A complete conversion function for one resource and direction.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionFunction {
    /// Direction of the conversion.
    pub direction: Direction,
    /// The converted resource.
    pub resource: Names,
    /// Function body.
    pub body: Vec<Stmt>,
}

impl ConversionFunction {
    /// Whether any statement touches annotations.
    #[must_use]
    pub fn uses_annotations(&self) -> bool {
        self.body.iter().any(Stmt::uses_annotations)
    }
}
