//! Smithy JSON AST ingestion.
//!
//! Deserializes the Smithy 2.0 JSON AST used by AWS service models and lowers
//! it into a [`ShapeModel`]. Service and resource shapes carry no data and
//! are skipped; shape names are shortened to the part after `#`.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::debug;

use crate::error::ModelResult;
use crate::shape::{ScalarKind, ShapeModel, ShapeModelBuilder};

const PRELUDE_NAMESPACE: &str = "smithy.api#";
const UNIT: &str = "smithy.api#Unit";
const ENUM_VALUE_TRAIT: &str = "smithy.api#enumValue";
const LEGACY_ENUM_TRAIT: &str = "smithy.api#enum";
const ERROR_TRAIT: &str = "smithy.api#error";
const OUTPUT_TRAIT: &str = "smithy.api#output";

type Traits = BTreeMap<String, serde_json::Value>;

/// Top-level Smithy model document.
#[derive(Debug, Deserialize)]
pub struct SmithyModel {
    /// Smithy version (e.g., "2.0").
    pub smithy: String,
    /// All shapes defined in the model, keyed by their full shape ID.
    #[serde(default)]
    pub shapes: BTreeMap<String, SmithyShape>,
}

/// A single Smithy shape.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SmithyShape {
    /// A structure shape.
    Structure(AggregateShape),
    /// A union shape, lowered like a structure.
    Union(AggregateShape),
    /// An operation shape.
    Operation(OperationShape),
    /// A string shape, possibly carrying a legacy enum trait.
    String(SimpleShape),
    /// A boolean shape.
    Boolean(SimpleShape),
    /// An 8-bit integer shape.
    Byte(SimpleShape),
    /// A 16-bit integer shape.
    Short(SimpleShape),
    /// A 32-bit integer shape.
    Integer(SimpleShape),
    /// A 64-bit integer shape.
    Long(SimpleShape),
    /// A 32-bit float shape.
    Float(SimpleShape),
    /// A 64-bit float shape.
    Double(SimpleShape),
    /// A timestamp shape.
    Timestamp(SimpleShape),
    /// A blob shape.
    Blob(SimpleShape),
    /// A string enum shape.
    Enum(AggregateShape),
    /// An integer enum shape, lowered to an integer.
    IntEnum(AggregateShape),
    /// A list shape.
    List(ListShape),
    /// A set shape, lowered to a list.
    Set(ListShape),
    /// A map shape.
    Map(MapShape),
    /// A service shape (ignored).
    Service(SimpleShape),
    /// A resource shape (ignored).
    Resource(SimpleShape),
    /// Any other shape type (document, bigInteger, ...), ignored.
    #[serde(other)]
    Unsupported,
}

/// A shape with traits only.
#[derive(Debug, Default, Deserialize)]
pub struct SimpleShape {
    /// Traits applied to this shape.
    #[serde(default)]
    pub traits: Traits,
}

/// A shape with named members: structures, unions and enums.
#[derive(Debug, Default, Deserialize)]
pub struct AggregateShape {
    /// Members by name.
    #[serde(default)]
    pub members: BTreeMap<String, MemberShape>,
    /// Traits applied to this shape.
    #[serde(default)]
    pub traits: Traits,
}

/// A member within an aggregate shape.
#[derive(Debug, Deserialize)]
pub struct MemberShape {
    /// Target shape ID this member points to.
    pub target: String,
    /// Traits applied to this member.
    #[serde(default)]
    pub traits: Traits,
}

/// An operation shape.
#[derive(Debug, Deserialize)]
pub struct OperationShape {
    /// Input shape reference.
    pub input: Option<TargetRef>,
    /// Output shape reference.
    pub output: Option<TargetRef>,
    /// Traits applied to this shape.
    #[serde(default)]
    pub traits: Traits,
}

/// A reference to another shape.
#[derive(Debug, Deserialize)]
pub struct TargetRef {
    /// The full shape ID being referenced.
    pub target: String,
}

/// A list or set shape.
#[derive(Debug, Deserialize)]
pub struct ListShape {
    /// The shape of the elements.
    pub member: TargetRef,
    /// Traits applied to this shape.
    #[serde(default)]
    pub traits: Traits,
}

/// A map shape.
#[derive(Debug, Deserialize)]
pub struct MapShape {
    /// The shape of the keys.
    pub key: TargetRef,
    /// The shape of the values.
    pub value: TargetRef,
    /// Traits applied to this shape.
    #[serde(default)]
    pub traits: Traits,
}

impl SmithyModel {
    /// Parse a Smithy JSON AST document.
    pub fn parse(json: &str) -> ModelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Get the short name from a fully qualified shape ID.
    ///
    /// For example, `com.amazonaws.s3#BucketName` returns `BucketName`.
    #[must_use]
    pub fn short_name(shape_id: &str) -> &str {
        shape_id.rsplit_once('#').map_or(shape_id, |(_, name)| name)
    }

    /// Lower the document into a shape arena.
    #[must_use]
    pub fn into_shape_model(self) -> ShapeModel {
        let mut builder = ShapeModel::builder();
        let mut prelude = BTreeMap::new();

        for (id, shape) in &self.shapes {
            let name = Self::short_name(id);
            builder = lower_shape(builder, name, shape, &mut prelude);
        }

        // Prelude shapes are only declared when the model itself did not
        // define a shape with the same short name.
        for (name, kind) in prelude {
            if !builder.contains(&name) {
                builder = builder.scalar(name, kind);
            }
        }

        let model = builder.build();
        debug!(
            shapes = model.shapes().count(),
            operations = model.operations().count(),
            "lowered smithy model"
        );
        model
    }
}

impl ShapeModel {
    /// Parse a Smithy JSON AST document and lower it into a shape arena.
    pub fn from_smithy_json(json: &str) -> ModelResult<Self> {
        Ok(SmithyModel::parse(json)?.into_shape_model())
    }
}

fn lower_shape(
    builder: ShapeModelBuilder,
    name: &str,
    shape: &SmithyShape,
    prelude: &mut BTreeMap<String, ScalarKind>,
) -> ShapeModelBuilder {
    let mut target = |id: &str| -> String {
        if let Some(short) = id.strip_prefix(PRELUDE_NAMESPACE) {
            if let Some(kind) = prelude_scalar(short) {
                prelude.insert(short.to_owned(), kind);
            }
        }
        SmithyModel::short_name(id).to_owned()
    };

    let (builder, traits) = match shape {
        SmithyShape::Structure(s) | SmithyShape::Union(s) => {
            let members: Vec<(String, String)> = s
                .members
                .iter()
                .map(|(member, m)| (member.clone(), target(&m.target)))
                .collect();
            (builder.structure(name, members), Some(&s.traits))
        }
        SmithyShape::Operation(op) => {
            let input = op
                .input
                .as_ref()
                .filter(|r| r.target != UNIT)
                .map(|r| target(&r.target));
            let output = op
                .output
                .as_ref()
                .filter(|r| r.target != UNIT)
                .map(|r| target(&r.target));
            (
                builder.operation(name, input.as_deref(), output.as_deref()),
                None,
            )
        }
        SmithyShape::String(s) => match legacy_enum_values(&s.traits) {
            Some(values) => (builder.enumeration(name, values), Some(&s.traits)),
            None => (builder.scalar(name, ScalarKind::String), Some(&s.traits)),
        },
        SmithyShape::Boolean(s) => (builder.scalar(name, ScalarKind::Boolean), Some(&s.traits)),
        SmithyShape::Byte(s) => (builder.scalar(name, ScalarKind::Byte), Some(&s.traits)),
        SmithyShape::Short(s) => (builder.scalar(name, ScalarKind::Short), Some(&s.traits)),
        SmithyShape::Integer(s) => (builder.scalar(name, ScalarKind::Integer), Some(&s.traits)),
        SmithyShape::Long(s) => (builder.scalar(name, ScalarKind::Long), Some(&s.traits)),
        SmithyShape::Float(s) => (builder.scalar(name, ScalarKind::Float), Some(&s.traits)),
        SmithyShape::Double(s) => (builder.scalar(name, ScalarKind::Double), Some(&s.traits)),
        SmithyShape::Timestamp(s) => {
            (builder.scalar(name, ScalarKind::Timestamp), Some(&s.traits))
        }
        SmithyShape::Blob(s) => (builder.scalar(name, ScalarKind::Blob), Some(&s.traits)),
        SmithyShape::Enum(e) => {
            let values: Vec<String> = e
                .members
                .iter()
                .map(|(member, m)| {
                    m.traits
                        .get(ENUM_VALUE_TRAIT)
                        .and_then(serde_json::Value::as_str)
                        .map_or_else(|| member.clone(), str::to_owned)
                })
                .collect();
            (builder.enumeration(name, values), Some(&e.traits))
        }
        SmithyShape::IntEnum(e) => (builder.scalar(name, ScalarKind::Integer), Some(&e.traits)),
        SmithyShape::List(l) | SmithyShape::Set(l) => {
            let member = target(&l.member.target);
            (builder.list(name, member), Some(&l.traits))
        }
        SmithyShape::Map(m) => {
            let key = target(&m.key.target);
            let value = target(&m.value.target);
            (builder.map(name, key, value), Some(&m.traits))
        }
        SmithyShape::Service(_) | SmithyShape::Resource(_) | SmithyShape::Unsupported => {
            (builder, None)
        }
    };

    let Some(traits) = traits else {
        return builder;
    };
    let mut builder = builder;
    if traits.contains_key(ERROR_TRAIT) {
        builder = builder.exception(name);
    }
    if traits.contains_key(OUTPUT_TRAIT) {
        builder = builder.output(name);
    }
    builder
}

fn prelude_scalar(short: &str) -> Option<ScalarKind> {
    let kind = match short {
        "String" => ScalarKind::String,
        "Boolean" | "PrimitiveBoolean" => ScalarKind::Boolean,
        "Byte" | "PrimitiveByte" => ScalarKind::Byte,
        "Short" | "PrimitiveShort" => ScalarKind::Short,
        "Integer" | "PrimitiveInteger" => ScalarKind::Integer,
        "Long" | "PrimitiveLong" => ScalarKind::Long,
        "Float" | "PrimitiveFloat" => ScalarKind::Float,
        "Double" | "PrimitiveDouble" => ScalarKind::Double,
        "Timestamp" => ScalarKind::Timestamp,
        "Blob" => ScalarKind::Blob,
        _ => return None,
    };
    Some(kind)
}

/// Values of a Smithy 1.0 `smithy.api#enum` trait.
fn legacy_enum_values(traits: &Traits) -> Option<Vec<String>> {
    let entries = traits.get(LEGACY_ENUM_TRAIT)?.as_array()?;
    Some(
        entries
            .iter()
            .filter_map(|entry| entry.get("value").and_then(serde_json::Value::as_str))
            .map(str::to_owned)
            .collect(),
    )
}
